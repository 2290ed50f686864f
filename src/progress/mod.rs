//! Session history and learning progress
//!
//! This module provides:
//! - A stored record of every completed teaching session and its turns
//! - One progress row per user per day, with a consecutive-day streak
//! - Lifetime totals across all of a user's sessions

pub mod metrics;
pub mod models;
pub mod tracker;

pub use models::*;
pub use tracker::{ProgressError, ProgressTracker};
