//! Dimensionality reduction of the vote matrix.
//!
//! PCA and t-SNE are both delegated to linfa; this module only prepares
//! the input, picks parameters the member count allows, and aligns the
//! output with member names.

use crate::config::{ReductionConfig, ReductionMethod};
use crate::error::{Error, Result};
use crate::matrix::VoteMatrix;
use crate::roster::Roster;
use linfa::traits::{Fit, Predict, Transformer};
use linfa::{DatasetBase, ParamGuard};
use linfa_reduction::Pca;
use linfa_tsne::TSneParams;
use ndarray::Array2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info, warn};

/// Fewest members t-SNE is run on; below this the neighbourhood is empty
pub const TSNE_MIN_MEMBERS: usize = 4;

/// A member placed in the plane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedMember {
    pub name: String,
    pub party: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// Two-dimensional embedding of every member
#[derive(Debug, Clone, Serialize)]
pub struct Embedding {
    pub method: ReductionMethod,
    pub points: Vec<EmbeddedMember>,
    /// Share of variance captured per component (PCA only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explained_variance_ratio: Option<Vec<f64>>,
}

impl Embedding {
    pub fn point(&self, name: &str) -> Option<&EmbeddedMember> {
        self.points.iter().find(|p| p.name == name)
    }

    /// Distinct parties, sorted
    pub fn parties(&self) -> Vec<&str> {
        let mut parties: Vec<&str> = self.points.iter().map(|p| p.party.as_str()).collect();
        parties.sort_unstable();
        parties.dedup();
        parties
    }

    /// Attach member page URLs by name. Returns how many members matched.
    pub fn attach_roster(&mut self, roster: &Roster) -> usize {
        let mut matched = 0;
        for point in &mut self.points {
            if let Some(url) = roster.url_of(&point.name) {
                point.url = Some(url.to_string());
                matched += 1;
            }
        }
        if matched < self.points.len() {
            debug!(
                matched,
                total = self.points.len(),
                "Some members have no roster entry"
            );
        }
        matched
    }

    /// Write `,Dim1,Dim2,name,party` rows with a running index;
    /// a `url` column is appended when any member has one.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let with_url = self.points.iter().any(|p| p.url.is_some());
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["", "Dim1", "Dim2", "name", "party"];
        if with_url {
            header.push("url");
        }
        wtr.write_record(&header)?;

        for (i, p) in self.points.iter().enumerate() {
            let mut row = vec![
                i.to_string(),
                p.x.to_string(),
                p.y.to_string(),
                p.name.clone(),
                p.party.clone(),
            ];
            if with_url {
                row.push(p.url.clone().unwrap_or_default());
            }
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

/// Projects members of a [`VoteMatrix`] onto two dimensions
#[derive(Debug, Clone)]
pub struct DimensionReducer {
    config: ReductionConfig,
}

impl DimensionReducer {
    pub fn new(config: ReductionConfig) -> Self {
        Self { config }
    }

    pub fn method(&self) -> ReductionMethod {
        self.config.method
    }

    /// Reduce the matrix and pair each row with its member
    pub fn fit_transform(&self, matrix: &VoteMatrix) -> Result<Embedding> {
        let (coords, ratio) = self.reduce(matrix.values())?;

        let points = matrix
            .members()
            .iter()
            .zip(coords.outer_iter())
            .map(|(member, row)| EmbeddedMember {
                name: member.name.clone(),
                party: member.party.clone(),
                url: None,
                x: row[0],
                y: row[1],
            })
            .collect();

        Ok(Embedding {
            method: self.config.method,
            points,
            explained_variance_ratio: ratio,
        })
    }

    /// Reduce raw samples (rows) to an `n × 2` array
    pub fn reduce(&self, data: &Array2<f64>) -> Result<(Array2<f64>, Option<Vec<f64>>)> {
        let (n, d) = data.dim();
        if n < 2 {
            return Err(Error::Reduction(format!(
                "need at least 2 members, got {}",
                n
            )));
        }
        if d == 0 {
            return Err(Error::Reduction("no agendas to compare on".to_string()));
        }

        info!(method = self.config.method.as_str(), members = n, agendas = d, "Reducing vote matrix");

        match self.config.method {
            ReductionMethod::Pca => {
                let (coords, ratio) = self.run_pca(data)?;
                Ok((coords, Some(ratio)))
            }
            ReductionMethod::Tsne => Ok((self.run_tsne(data)?, None)),
        }
    }

    fn run_pca(&self, data: &Array2<f64>) -> Result<(Array2<f64>, Vec<f64>)> {
        let dims = 2.min(data.ncols()).min(data.nrows());
        let dataset = DatasetBase::from(data.clone());
        let pca: Pca<f64> = Pca::params(dims).fit(&dataset)?;
        let projected: Array2<f64> = pca.predict(data);

        // One entry per output axis, matching the padded coordinates
        let mut ratio = pca.explained_variance_ratio().to_vec();
        ratio.resize(2, 0.0);
        info!(explained_variance_ratio = ?ratio, "PCA finished");

        Ok((pad_to_two(projected), ratio))
    }

    fn run_tsne(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        let n = data.nrows();
        if n < TSNE_MIN_MEMBERS {
            return Err(Error::Reduction(format!(
                "t-SNE needs at least {} members, got {}; use PCA instead",
                TSNE_MIN_MEMBERS, n
            )));
        }

        let perplexity = effective_perplexity(self.config.perplexity, n);
        if perplexity < self.config.perplexity {
            warn!(
                requested = self.config.perplexity,
                used = perplexity,
                members = n,
                "Perplexity too large for member count, clamped"
            );
        }

        // linfa-tsne rejects inputs narrower than the embedding; a zero
        // column leaves pairwise distances unchanged
        let input = pad_to_two(data.to_owned());

        let rng = Xoshiro256Plus::seed_from_u64(self.config.seed);
        let embedded = TSneParams::embedding_size_with_rng(2, rng)
            .perplexity(perplexity)
            .approx_threshold(self.config.approx_threshold)
            .max_iter(self.config.max_iter)
            .check()?
            .transform(input)?;

        info!(perplexity, iterations = self.config.max_iter, "t-SNE finished");
        Ok(embedded)
    }
}

impl Default for DimensionReducer {
    fn default() -> Self {
        Self::new(ReductionConfig::default())
    }
}

/// t-SNE requires `n - 1 >= 3 * perplexity`
pub fn effective_perplexity(requested: f64, members: usize) -> f64 {
    // Slightly under the bound so float rounding cannot trip the check
    let max = (members as f64 - 1.0) / 3.0 * (1.0 - 1e-9);
    requested.min(max)
}

/// Append zero columns until the array is at least two wide
fn pad_to_two(coords: Array2<f64>) -> Array2<f64> {
    if coords.ncols() >= 2 {
        return coords;
    }
    let mut padded = Array2::zeros((coords.nrows(), 2));
    for (i, row) in coords.outer_iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            padded[[i, j]] = *v;
        }
    }
    padded
}
