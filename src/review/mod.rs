//! Spaced repetition review scheduling (SM-2)
//!
//! This module provides:
//! - SM-2 interval and easiness factor arithmetic
//! - Mapping teaching performance onto review quality
//! - Due, upcoming, schedule and statistics queries

pub mod algorithm;
pub mod error;
pub mod models;
pub mod scheduler;

pub use algorithm::{
    derive_quality_from_performance, format_interval, preview_intervals, MAX_INTERVAL_DAYS,
};
pub use error::{Result, ReviewError};
pub use models::*;
pub use scheduler::ReviewScheduler;
