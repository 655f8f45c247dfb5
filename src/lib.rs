// src/lib.rs

//! Continuously mines a Git repository's history, computes pluggable metrics
//! over the commits and charts the results, re-running whenever the remote
//! branch advances.
//!
//! Three stages run on their own threads and hand data forward through
//! single-slot [`Handoff`]s:
//!
//! ```text
//! Extractor -> Handoff<CommitSet> -> MetricRunner -> Handoff<ResultSet> -> VisualizationRunner
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod handoff;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod renderer;
pub mod repo;
pub mod sar;
pub mod store;
pub mod visualization;

pub use error::{ConfigError, ExtractError, SetupError, StoreError};
pub use extractor::Extractor;
pub use handoff::Handoff;
pub use metrics::{Metric, MetricRegistry, MetricRunner};
pub use model::{Commit, CommitSet, MetricResult, ResultSet};
pub use pipeline::{PipelineHandle, PipelineSupervisor};
pub use repo::{Mirror, RepoSettings, RepoSetup};
pub use store::{CommitStore, JsonLinesStore};
pub use visualization::{Visualization, VisualizationRunner};
