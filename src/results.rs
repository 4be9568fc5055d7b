use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why a collection run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The configured number of consecutive rounds produced no new page
    NoNewPages,
    /// The page image selector stopped matching anything
    NoPageImages,
}

/// Outcome of a collection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// Number of unique pages written to disk
    pub total_saved: usize,

    /// Rounds executed, including the one that ended the run
    pub rounds: usize,

    pub stop_reason: StopReason,

    /// Directory the pages were written to
    pub output_dir: PathBuf,
}
