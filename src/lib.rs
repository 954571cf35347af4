//! talentrank - Candidate Ranking Engine
//!
//! Scores candidate profiles against a job requirement with:
//! - Pluggable per-field scorers (semantic, exact, ordinal, set-overlap)
//! - Weighted aggregation with a deterministic tie-break
//! - Injected embedding provider with bounded concurrency and per-call timeouts
//! - Fault containment and a run summary for every batch

pub mod types;
pub mod error;
pub mod normalize;
pub mod embedding;
pub mod http_embedding;
pub mod scoring;
pub mod aggregate;
pub mod records;
pub mod config;
pub mod cancel;
pub mod ranking_engine;
pub mod server;

pub use types::*;
pub use error::{EmbedError, RankError};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider, MockEmbeddingProvider, SharedEmbeddingProvider};
pub use http_embedding::HttpEmbeddingProvider;
pub use config::{EngineConfig, ServerConfig};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use ranking_engine::{RankingEngine, RunOptions, SharedRankingEngine};
