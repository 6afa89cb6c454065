use std::path::PathBuf;
use std::process::Command;

use insta;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Run the binary and return (stdout, stderr, exit code)
fn run(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_assembly-neighbor"))
        .args(args)
        .env_remove("ASSEMBLY_NEIGHBOR_CONFIG")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute command");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn members_lists_one_party_per_member() {
    let votes = fixture("votes.csv");
    let (stdout, stderr, code) = run(&["members", votes.to_str().unwrap()]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    insta::assert_snapshot!(stdout, @r###"
    {"name":"강하은","party":"국민의힘","votes_cast":5}
    {"name":"김민준","party":"더불어민주당","votes_cast":6}
    {"name":"박지훈","party":"더불어민주당","votes_cast":5}
    {"name":"윤재원","party":"정의당","votes_cast":6}
    {"name":"이서연","party":"더불어민주당","votes_cast":6}
    {"name":"정도윤","party":"국민의힘","votes_cast":6}
    {"name":"최수아","party":"국민의힘","votes_cast":6}
    {"name":"한지우","party":"무소속","votes_cast":5}
    "###);
}

#[test]
fn matrix_fills_missing_votes_with_absent() {
    let votes = fixture("votes.csv");
    let (stdout, stderr, code) = run(&["matrix", votes.to_str().unwrap()]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    insta::assert_snapshot!(stdout, @r###"
    agenda_id,강하은,김민준,박지훈,윤재원,이서연,정도윤,최수아,한지우
    2200101,-1,1,1,1,1,-1,-1,-2
    2200102,1,-1,-1,-1,-1,1,1,1
    2200103,1,-1,-2,0,-1,1,1,1
    2200104,-1,1,1,1,0,-1,-1,1
    2200105,-2,1,1,1,1,-1,-1,-1
    2200106,1,1,1,1,1,-1,1,1
    "###);
}

#[test]
fn agendas_report_tallies() {
    let votes = fixture("votes.csv");
    let (stdout, stderr, code) = run(&["agendas", votes.to_str().unwrap()]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let tallies: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(tallies.len(), 6);
    assert_eq!(tallies[0]["id"], "2200101");
    assert_eq!(tallies[0]["name"], "예산안");
    assert_eq!(tallies[0]["approve"], 4);
    assert_eq!(tallies[0]["oppose"], 3);
    assert_eq!(tallies[0]["absent"], 1);
    assert_eq!(tallies[5]["approve"], 7);
    assert_eq!(tallies[5]["opposed_by"][0], "정도윤");
}

#[test]
fn embed_writes_pca_csv_with_roster_urls() {
    let votes = fixture("votes.csv");
    let roster = fixture("roster.csv");
    let (stdout, stderr, code) = run(&[
        "embed",
        votes.to_str().unwrap(),
        "--method",
        "pca",
        "--roster",
        roster.to_str().unwrap(),
    ]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], ",Dim1,Dim2,name,party,url");
    assert_eq!(lines.len(), 9);
    assert!(lines[2].ends_with(",김민준,더불어민주당,https://assembly101.kr/member/101"));
    assert!(lines[1].ends_with(",강하은,국민의힘,"));
}

#[test]
fn plot_writes_html_page() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("plot.html");
    let votes = fixture("votes.csv");
    let (_, stderr, code) = run(&[
        "plot",
        votes.to_str().unwrap(),
        "--method",
        "tsne",
        "--search",
        "김",
        "--no-labels",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let html = std::fs::read_to_string(&out).unwrap();
    assert!(html.contains("Visualization of Lawmakers Voting Embeddings"));
    assert!(html.contains("\"mode\":\"markers\""));
    assert!(html.contains("더불어민주당"));
}

#[test]
fn unknown_method_is_rejected() {
    let votes = fixture("votes.csv");
    let (_, _, code) = run(&["embed", votes.to_str().unwrap(), "--method", "umap"]);
    assert_ne!(code, 0);
}

#[test]
fn missing_column_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "bill,member,vote\n1,a,yes\n").unwrap();

    let (_, stderr, code) = run(&["members", path.to_str().unwrap()]);
    assert_ne!(code, 0);
    assert!(stderr.contains("의안번호"));
}

#[test]
fn config_file_remaps_columns() {
    let dir = tempfile::tempdir().unwrap();
    let votes = dir.path().join("votes.csv");
    std::fs::write(
        &votes,
        "bill,legislator,caucus,vote\nHB1,Alice,Green,yes\nHB1,Bob,Blue,no\nHB2,Alice,Green,abstain\n",
    )
    .unwrap();
    let config = dir.path().join("config.yml");
    std::fs::write(
        &config,
        "columns:\n  agenda_id: bill\n  member: legislator\n  party: caucus\n  result: vote\n",
    )
    .unwrap();

    let (stdout, stderr, code) = run(&[
        "matrix",
        votes.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_eq!(stdout, "agenda_id,Alice,Bob\nHB1,1,-1\nHB2,0,-2\n");
}
