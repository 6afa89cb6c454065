use crate::config::Config;
use crate::error::Result;
use crate::loader;
use crate::matrix::VoteMatrix;
use crate::reduction::{DimensionReducer, Embedding};
use crate::roster;
use crate::visualize::PartyPalette;
use std::path::Path;
use tracing::{info, warn};

/// End-to-end processor: votes file → matrix → embedding
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the votes file and pivot it
    pub fn load_matrix<P: AsRef<Path>>(&self, votes: P) -> Result<VoteMatrix> {
        let records = loader::load_votes(votes, &self.config)?;
        VoteMatrix::from_records(&records)
    }

    /// Reduce an already built matrix, optionally joining a roster for member URLs
    pub fn embed_matrix(&self, matrix: &VoteMatrix, roster: Option<&Path>) -> Result<Embedding> {
        let reducer = DimensionReducer::new(self.config.reduction.clone());
        let mut embedding = reducer.fit_transform(matrix)?;

        if let Some(path) = roster {
            let roster = roster::load_roster(path)?;
            let matched = embedding.attach_roster(&roster);
            if matched == 0 && !roster.is_empty() {
                warn!(path = %path.display(), "No roster names matched any member");
            } else {
                info!(matched, "Attached member URLs");
            }
        }

        Ok(embedding)
    }

    /// Run the whole pipeline
    pub fn run<P: AsRef<Path>>(&self, votes: P, roster: Option<&Path>) -> Result<Embedding> {
        let matrix = self.load_matrix(votes)?;
        self.embed_matrix(&matrix, roster)
    }

    /// Palette with this configuration's overrides applied
    pub fn palette(&self) -> PartyPalette {
        PartyPalette::with_overrides(&self.config.party_colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, ReductionMethod};
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    fn pca_pipeline() -> Pipeline {
        let config = ConfigBuilder::new()
            .method(ReductionMethod::Pca)
            .add_party_color("무소속", "#000000")
            .build()
            .unwrap();
        Pipeline::new(config)
    }

    #[test]
    fn test_run_aligns_members_and_roster() {
        let embedding = pca_pipeline()
            .run(fixture("votes.csv"), Some(fixture("roster.csv").as_path()))
            .unwrap();

        assert_eq!(embedding.points.len(), 8);
        let kim = embedding.point("김민준").unwrap();
        assert_eq!(kim.party, "더불어민주당");
        assert_eq!(kim.url.as_deref(), Some("https://assembly101.kr/member/101"));
        assert!(embedding.point("강하은").unwrap().url.is_none());
    }

    #[test]
    fn test_party_blocs_cluster() {
        let embedding = pca_pipeline().run(fixture("votes.csv"), None).unwrap();
        let p = |n: &str| {
            let m = embedding.point(n).unwrap();
            (m.x, m.y)
        };
        let dist = |a: (f64, f64), b: (f64, f64)| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();

        // Two ruling-party members vote nearly alike; the opposition does not
        assert!(dist(p("김민준"), p("이서연")) < dist(p("김민준"), p("최수아")));
    }

    #[test]
    fn test_palette_applies_overrides() {
        let palette = pca_pipeline().palette();
        assert_eq!(palette.color_of("무소속"), Some("#000000"));
        assert_eq!(palette.color_of("국민의힘"), Some("#E61E2B"));
    }

    #[test]
    fn test_missing_file() {
        let err = pca_pipeline().run(fixture("nope.csv"), None).unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
