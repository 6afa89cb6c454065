//! Lawmaker voting maps.
//!
//! Reads roll-call voting records, pivots them into a member × agenda matrix
//! (approve = 1, abstain = 0, oppose = -1, absent = -2), reduces each member's
//! row to two dimensions with PCA or t-SNE, and plots the result so that
//! members who vote alike sit close together.

pub mod config;
pub mod error;
pub mod loader;
pub mod matrix;
pub mod pipeline;
pub mod reduction;
pub mod roster;
pub mod server;
pub mod types;
pub mod visualize;

pub use config::{Config, ConfigBuilder, ReductionConfig, ReductionMethod};
pub use error::{Error, Result};
pub use matrix::VoteMatrix;
pub use pipeline::Pipeline;
pub use reduction::{DimensionReducer, EmbeddedMember, Embedding};
pub use types::{Agenda, AgendaTally, Member, VoteChoice, VoteRecord};
pub use visualize::{build_figure, Figure, PartyPalette, PlotOptions};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder, ReductionMethod};
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::Pipeline;
    pub use crate::reduction::Embedding;
    pub use crate::visualize::{PartyPalette, PlotOptions};
}
