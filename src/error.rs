//! Typed errors raised by the engine.
//!
//! Glue code (configuration, database, CLI) uses `anyhow`; these variants
//! are the ones callers branch on.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Training payload rejected before touching the dataset.
    #[error("invalid training data: {0}")]
    InvalidTraining(String),

    #[error("failed to load corpus {}: {source}", .path.display())]
    CorpusLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("retrain exceeded {0:?}")]
    RetrainTimeout(Duration),

    #[error("retrain task failed: {0}")]
    RetrainTask(String),
}
