use anyhow::Context;
use assembly_neighbor::config::CONFIG_ENV_VAR;
use assembly_neighbor::prelude::*;
use assembly_neighbor::server::{self, AppState, ServerConfig};
use assembly_neighbor::visualize::{build_figure, render_html};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Map lawmakers by how similarly they vote
#[derive(Parser, Debug)]
#[command(name = "assembly-neighbor")]
#[command(about = "Embed roll-call voting records in 2D and plot them")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Roll-call table (.xlsx, .xls, .ods or .csv)
    votes: PathBuf,

    /// YAML config file (default: $ASSEMBLY_NEIGHBOR_CONFIG if set)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ReduceArgs {
    /// Reduction method: pca or tsne
    #[arg(long, value_parser = ["pca", "tsne"])]
    method: Option<String>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// t-SNE perplexity
    #[arg(long)]
    perplexity: Option<f64>,

    /// Roster CSV (name,url) used to link members to their pages
    #[arg(long)]
    roster: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the 2D embedding as CSV (Dim1, Dim2, name, party)
    Embed {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        reduce: ReduceArgs,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the scatter plot as a standalone HTML page
    Plot {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        reduce: ReduceArgs,
        /// Output HTML file
        #[arg(short, long, default_value = "plot.html")]
        output: PathBuf,
        /// Highlight members whose name contains this text
        #[arg(long)]
        search: Option<String>,
        /// Hide member names next to markers
        #[arg(long)]
        no_labels: bool,
    },

    /// Serve the interactive dashboard
    Serve {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        reduce: ReduceArgs,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8050)]
        port: u16,
    },

    /// Write the agenda × member pivot table as CSV
    Matrix {
        #[command(flatten)]
        input: InputArgs,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List members with their party, one JSON object per line
    Members {
        #[command(flatten)]
        input: InputArgs,
    },

    /// List agendas with vote tallies, one JSON object per line
    Agendas {
        #[command(flatten)]
        input: InputArgs,
    },
}

fn print_available_commands() {
    println!("Available commands:");
    println!("  embed     Write the 2D embedding as CSV");
    println!("  plot      Export the scatter plot as a standalone HTML page");
    println!("  serve     Serve the interactive dashboard");
    println!("  matrix    Write the agenda x member pivot table as CSV");
    println!("  members   List members with their party");
    println!("  agendas   List agendas with vote tallies");
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "assembly_neighbor=debug"
    } else {
        "assembly_neighbor=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Flag first, then environment variable, then built-in defaults
fn load_config(input: &InputArgs, reduce: Option<&ReduceArgs>) -> anyhow::Result<Config> {
    let path = input
        .config
        .clone()
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

    let base = match path {
        Some(path) => Config::from_yaml_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    let mut builder = ConfigBuilder::from_config(base);
    if let Some(reduce) = reduce {
        if let Some(method) = &reduce.method {
            builder = builder.method_str(method)?;
        }
        if let Some(seed) = reduce.seed {
            builder = builder.seed(seed);
        }
        if let Some(perplexity) = reduce.perplexity {
            builder = builder.perplexity(perplexity);
        }
    }
    Ok(builder.build()?)
}

/// Run the blocking pipeline off the async runtime
async fn run_pipeline(config: Config, votes: PathBuf, roster: Option<PathBuf>) -> anyhow::Result<Embedding> {
    let embedding = tokio::task::spawn_blocking(move || {
        Pipeline::new(config).run(&votes, roster.as_deref())
    })
    .await
    .context("Pipeline task failed")??;
    Ok(embedding)
}

fn open_output(output: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

async fn run_embed(input: InputArgs, reduce: ReduceArgs, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(&input, Some(&reduce))?;
    let embedding = run_pipeline(config, input.votes, reduce.roster).await?;

    embedding.write_csv(open_output(output.as_deref())?)?;
    if let Some(path) = output {
        info!(path = %path.display(), members = embedding.points.len(), "Wrote embedding");
    }
    Ok(())
}

async fn run_plot(
    input: InputArgs,
    reduce: ReduceArgs,
    output: PathBuf,
    search: Option<String>,
    no_labels: bool,
) -> anyhow::Result<()> {
    let config = load_config(&input, Some(&reduce))?;
    let palette = PartyPalette::with_overrides(&config.party_colors);
    let title = config.title.clone();
    let method = config.reduction.method;
    let embedding = run_pipeline(config, input.votes, reduce.roster).await?;

    let options = PlotOptions {
        search,
        show_labels: !no_labels,
    };
    let figure = build_figure(&embedding, &palette, &options, &title);
    let footer = format!(
        "{} members · {} · generated {}",
        embedding.points.len(),
        method.as_str(),
        chrono::Utc::now().to_rfc3339()
    );
    let html = render_html(&figure, &title, &footer)?;

    std::fs::write(&output, html)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(path = %output.display(), highlighted = figure.highlighted(), "Wrote plot");
    Ok(())
}

async fn run_serve(input: InputArgs, reduce: ReduceArgs, host: String, port: u16) -> anyhow::Result<()> {
    let config = load_config(&input, Some(&reduce))?;
    let palette = PartyPalette::with_overrides(&config.party_colors);
    let title = config.title.clone();
    let embedding = run_pipeline(config, input.votes, reduce.roster).await?;

    let state = AppState {
        embedding,
        palette,
        title,
    };
    server::serve(state, ServerConfig { host, port }).await?;
    Ok(())
}

fn run_matrix(input: InputArgs, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(&input, None)?;
    let matrix = Pipeline::new(config).load_matrix(&input.votes)?;
    matrix.write_pivot_csv(open_output(output.as_deref())?)?;
    Ok(())
}

fn run_members(input: InputArgs) -> anyhow::Result<()> {
    let config = load_config(&input, None)?;
    let matrix = Pipeline::new(config).load_matrix(&input.votes)?;

    let mut out = io::stdout().lock();
    for member in matrix.members() {
        writeln!(out, "{}", serde_json::to_string(member)?)?;
    }
    Ok(())
}

fn run_agendas(input: InputArgs) -> anyhow::Result<()> {
    let config = load_config(&input, None)?;
    let matrix = Pipeline::new(config).load_matrix(&input.votes)?;

    let mut out = io::stdout().lock();
    for tally in matrix.tallies() {
        writeln!(out, "{}", serde_json::to_string(&tally)?)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Command::Embed {
            input,
            reduce,
            output,
        }) => run_embed(input, reduce, output).await,
        Some(Command::Plot {
            input,
            reduce,
            output,
            search,
            no_labels,
        }) => run_plot(input, reduce, output, search, no_labels).await,
        Some(Command::Serve {
            input,
            reduce,
            host,
            port,
        }) => run_serve(input, reduce, host, port).await,
        Some(Command::Matrix { input, output }) => run_matrix(input, output),
        Some(Command::Members { input }) => run_members(input),
        Some(Command::Agendas { input }) => run_agendas(input),
        None => {
            print_available_commands();
            Ok(())
        }
    }
}
