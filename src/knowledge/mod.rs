//! Knowledge graph for taught topics
//!
//! This module provides:
//! - Per-topic nodes with running confidence and clarity averages
//! - Deduplicated gap, jargon, and related-concept lists
//! - Weighted links between topics

pub mod aggregate;
pub mod models;
pub mod tracker;

pub use models::*;
pub use tracker::{KnowledgeError, KnowledgeTracker};
