//! Teaching sessions
//!
//! Folds per-turn analysis into a session summary and records the summary
//! against the knowledge graph, the review schedule and the user's
//! session history.

mod models;
mod recorder;

use thiserror::Error;

use crate::knowledge::KnowledgeError;
use crate::progress::ProgressError;
use crate::review::ReviewError;

pub use models::{SessionOutcome, SessionSummary, TurnAnalysis};
pub use recorder::SessionRecorder;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    Progress(#[from] ProgressError),
}
