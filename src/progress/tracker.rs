//! Session history and daily progress for each user

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use thiserror::Error;
use uuid::Uuid;

use super::metrics::{summarize_day, summarize_history};
use super::models::*;
use crate::clock::Clock;
use crate::session::{SessionSummary, TurnAnalysis};
use crate::storage::{ProgressStore, StorageError};
use crate::validate;

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ProgressError>;

/// Keeps the history of completed sessions and the per-day progress rows
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn ProgressStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Store a completed session and its turns
    pub fn record_session(
        &self,
        user_id: &str,
        topic: &str,
        summary: &SessionSummary,
    ) -> Result<SessionRecord> {
        validate::non_empty("user_id", user_id).map_err(ProgressError::InvalidArgument)?;
        validate::non_empty("topic", topic).map_err(ProgressError::InvalidArgument)?;
        validate::unit_score("confidence", summary.confidence)
            .map_err(ProgressError::InvalidArgument)?;
        validate::unit_score("clarity", summary.clarity).map_err(ProgressError::InvalidArgument)?;
        if summary.turn_count == 0 {
            return Err(ProgressError::InvalidArgument(
                "a session needs at least one turn".to_string(),
            ));
        }

        let record = SessionRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            topic: topic.to_string(),
            turn_count: u32::try_from(summary.turn_count).unwrap_or(u32::MAX),
            average_confidence: summary.confidence,
            average_clarity: summary.clarity,
            knowledge_gaps: summary.knowledge_gaps.clone(),
            completed_at: self.clock.now(),
        };
        self.store.insert_session(&record, &summary.turns)?;

        log::debug!(
            "Stored session {} on '{}' for {} ({} turns)",
            record.id,
            topic,
            user_id,
            record.turn_count
        );
        Ok(record)
    }

    /// Recompute today's progress row, extending yesterday's streak
    pub fn update_progress_metrics(&self, user_id: &str) -> Result<DailyProgress> {
        validate::non_empty("user_id", user_id).map_err(ProgressError::InvalidArgument)?;

        let today = self.today();
        let progress = self
            .store
            .refresh_daily_progress(user_id, today, &mut |sessions, previous_day| {
                summarize_day(user_id, today, sessions, previous_day)
            })?;

        log::info!(
            "Progress for {} on {}: {} sessions, {} day streak",
            user_id,
            today,
            progress.sessions_completed,
            progress.consecutive_days
        );
        Ok(progress)
    }

    /// Daily rows for the last `days` calendar days, today included, oldest first
    pub fn get_progress_history(&self, user_id: &str, days: u32) -> Result<Vec<DailyProgress>> {
        validate::non_empty("user_id", user_id).map_err(ProgressError::InvalidArgument)?;
        if days == 0 {
            return Err(ProgressError::InvalidArgument(
                "days must be at least 1".to_string(),
            ));
        }

        let since = self
            .today()
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);
        Ok(self.store.list_daily_progress(user_id, since)?)
    }

    /// Totals over every session the user has completed
    pub fn get_user_stats(&self, user_id: &str) -> Result<ProgressStats> {
        validate::non_empty("user_id", user_id).map_err(ProgressError::InvalidArgument)?;

        let sessions = self.store.list_sessions(user_id, None)?;
        let latest = self.store.latest_daily_progress(user_id)?;
        Ok(summarize_history(&sessions, latest.as_ref(), self.today()))
    }

    /// A user's sessions, most recent first
    pub fn list_sessions(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<SessionRecord>> {
        Ok(self.store.list_sessions(user_id, limit)?)
    }

    pub fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>> {
        Ok(self.store.get_session(id)?)
    }

    pub fn session_turns(&self, session_id: Uuid) -> Result<Vec<TurnAnalysis>> {
        Ok(self.store.list_session_turns(session_id)?)
    }
}
