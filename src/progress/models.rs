use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed teaching session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub topic: String,
    pub turn_count: u32,
    pub average_confidence: f64,
    pub average_clarity: f64,
    pub knowledge_gaps: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// One user's activity on one UTC calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub user_id: String,
    pub date: NaiveDate,
    pub sessions_completed: u32,
    pub total_turns: u32,
    pub average_confidence: f64,
    pub average_clarity: f64,
    pub unique_topics: u32,
    /// Days in a row, ending on `date`, with at least one session
    pub consecutive_days: u32,
}

/// Lifetime totals for a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_sessions: u32,
    pub total_turns: u32,
    pub average_confidence: f64,
    pub average_clarity: f64,
    pub unique_topics: u32,
    pub current_streak: u32,
    pub last_session: Option<DateTime<Utc>>,
}
