use crate::error::{Error, Result};
use crate::types::VoteChoice;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Environment variable consulted when no `--config` flag is given
pub const CONFIG_ENV_VAR: &str = "ASSEMBLY_NEIGHBOR_CONFIG";

/// Dimensionality reduction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionMethod {
    Pca,
    Tsne,
}

impl FromStr for ReductionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pca" => Ok(ReductionMethod::Pca),
            "tsne" | "t-sne" => Ok(ReductionMethod::Tsne),
            other => Err(Error::Config(format!(
                "Invalid reduction method '{}'. Allowed values are: pca, tsne",
                other
            ))),
        }
    }
}

impl ReductionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReductionMethod::Pca => "pca",
            ReductionMethod::Tsne => "tsne",
        }
    }
}

/// Header names of the roll-call table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub agenda_id: String,
    pub member: String,
    pub party: String,
    pub result: String,
    pub agenda_name: String,
    pub agenda_url: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            agenda_id: "의안번호".to_string(),
            member: "의원".to_string(),
            party: "정당".to_string(),
            result: "표결결과".to_string(),
            agenda_name: "의안명".to_string(),
            agenda_url: "의안URL".to_string(),
        }
    }
}

/// Result labels recognised for each vote choice.
/// Anything unmatched is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VoteLabels {
    pub approve: Vec<String>,
    pub oppose: Vec<String>,
    pub abstain: Vec<String>,
}

impl Default for VoteLabels {
    fn default() -> Self {
        let labels = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
        Self {
            approve: labels(&["찬성", "yes", "yea", "aye", "approve"]),
            oppose: labels(&["반대", "no", "nay", "oppose"]),
            abstain: labels(&["기권", "abstain"]),
        }
    }
}

impl VoteLabels {
    /// Map a raw result cell to a vote choice
    pub fn classify(&self, raw: &str) -> VoteChoice {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return VoteChoice::Absent;
        }
        let matches = |set: &[String]| set.iter().any(|l| l.trim().to_lowercase() == needle);
        if matches(&self.approve) {
            VoteChoice::Approve
        } else if matches(&self.oppose) {
            VoteChoice::Oppose
        } else if matches(&self.abstain) {
            VoteChoice::Abstain
        } else {
            VoteChoice::Absent
        }
    }
}

/// A party and the color it is drawn with
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartyColor {
    pub party: String,
    pub color: String,
}

/// Parameters handed to the reduction library
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub method: ReductionMethod,
    pub seed: u64,
    /// t-SNE perplexity; clamped to what the member count allows
    pub perplexity: f64,
    /// t-SNE iterations
    pub max_iter: usize,
    /// Barnes-Hut angle for t-SNE (0.0 runs the exact algorithm)
    pub approx_threshold: f64,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            method: ReductionMethod::Tsne,
            seed: 42,
            perplexity: 20.0,
            max_iter: 1000,
            approx_threshold: 0.5,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub title: String,
    pub columns: ColumnNames,
    pub vote_labels: VoteLabels,
    /// Party assigned when the party cell is empty
    pub default_party: String,
    /// Palette overrides, applied on top of the built-in party colors
    pub party_colors: Vec<PartyColor>,
    pub reduction: ReductionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Visualization of Lawmakers Voting Embeddings".to_string(),
            columns: ColumnNames::default(),
            vote_labels: VoteLabels::default(),
            default_party: "무소속".to_string(),
            party_colors: Vec::new(),
            reduction: ReductionConfig::default(),
        }
    }
}

/// On-disk shape of the YAML config; every field optional
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    title: Option<String>,
    columns: Option<ColumnNames>,
    vote_labels: Option<VoteLabels>,
    default_party: Option<String>,
    #[serde(default)]
    party_colors: Vec<PartyColor>,
    reduction: Option<ReductionConfig>,
}

impl Config {
    /// Load a YAML config file, filling unspecified fields with defaults
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig = if contents.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let defaults = Config::default();
        let config = Config {
            title: raw.title.unwrap_or(defaults.title),
            columns: raw.columns.unwrap_or(defaults.columns),
            vote_labels: raw.vote_labels.unwrap_or(defaults.vote_labels),
            default_party: raw.default_party.unwrap_or(defaults.default_party),
            party_colors: raw.party_colors,
            reduction: raw.reduction.unwrap_or(defaults.reduction),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("agenda_id", &self.columns.agenda_id),
            ("member", &self.columns.member),
            ("party", &self.columns.party),
            ("result", &self.columns.result),
        ];
        for (key, name) in required {
            if name.trim().is_empty() {
                return Err(Error::Config(format!("Column name for '{}' is empty", key)));
            }
        }

        if self.default_party.trim().is_empty() {
            return Err(Error::Config("default_party must not be empty".to_string()));
        }

        let r = &self.reduction;
        if !(r.perplexity > 0.0) {
            return Err(Error::Config(format!(
                "perplexity must be positive, got {}",
                r.perplexity
            )));
        }
        if r.max_iter == 0 {
            return Err(Error::Config("max_iter must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&r.approx_threshold) {
            return Err(Error::Config(format!(
                "approx_threshold must be within [0, 1], got {}",
                r.approx_threshold
            )));
        }

        for pc in &self.party_colors {
            if pc.color.trim().is_empty() {
                return Err(Error::Config(format!("Empty color for party '{}'", pc.party)));
            }
        }

        Ok(())
    }
}

/// Builder for creating configurations
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration (e.g. one loaded from YAML)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the plot title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Set the header names
    pub fn columns(mut self, columns: ColumnNames) -> Self {
        self.config.columns = columns;
        self
    }

    /// Set the reduction method
    pub fn method(mut self, method: ReductionMethod) -> Self {
        self.config.reduction.method = method;
        self
    }

    /// Set the reduction method from string
    pub fn method_str(mut self, method: &str) -> Result<Self> {
        self.config.reduction.method = method.parse()?;
        Ok(self)
    }

    /// Set the random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.reduction.seed = seed;
        self
    }

    /// Set the t-SNE perplexity
    pub fn perplexity(mut self, perplexity: f64) -> Self {
        self.config.reduction.perplexity = perplexity;
        self
    }

    /// Set the t-SNE iteration count
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.reduction.max_iter = max_iter;
        self
    }

    /// Add or override a party color
    pub fn add_party_color(mut self, party: impl Into<String>, color: impl Into<String>) -> Self {
        let party = party.into();
        self.config.party_colors.retain(|pc| pc.party != party);
        self.config.party_colors.push(PartyColor {
            party,
            color: color.into(),
        });
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
