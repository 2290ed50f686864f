//! Data models for the review scheduler

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ReviewError;

/// Starting easiness factor for every new item
pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;

/// Lowest easiness factor SM-2 allows
pub const MIN_EASINESS_FACTOR: f64 = 1.3;

/// Quality of recall on the SM-2 scale
///
/// - 0: Complete blackout
/// - 1: Incorrect, vague memory
/// - 2: Incorrect, but familiar once seen
/// - 3: Correct with serious difficulty
/// - 4: Correct after hesitation
/// - 5: Perfect recall
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(pub(super) u8);

impl Quality {
    pub const MAX: u8 = 5;

    /// Lowest quality that counts as a successful recall
    pub const PASS_THRESHOLD: u8 = 3;

    pub fn new(value: i64) -> Result<Self, ReviewError> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ReviewError::InvalidArgument(format!(
                "quality must be between 0 and {}, got {}",
                Self::MAX,
                value
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASS_THRESHOLD
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "blackout",
            1 => "vague memory",
            2 => "familiar",
            3 => "difficult",
            4 => "hesitant",
            _ => "perfect",
        }
    }

    /// Every quality, lowest first
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=Self::MAX).map(Quality)
    }
}

impl TryFrom<i64> for Quality {
    type Error = ReviewError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a review item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewState {
    /// Never reviewed
    New,
    /// Reviewed at least once
    Scheduled,
}

/// Spaced repetition record for one topic a user has studied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub id: Uuid,
    pub user_id: String,
    pub topic: String,
    /// SM-2 easiness factor (EF)
    pub easiness_factor: f64,
    /// Consecutive passing reviews since the last reset (n)
    pub repetition_number: u32,
    /// Days until the next review (I)
    pub interval_days: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: DateTime<Utc>,
    /// Total reviews ever recorded
    pub review_count: u32,
    /// Mean of every quality ever recorded
    pub average_quality: f64,
    pub created_at: DateTime<Utc>,
}

impl ReviewItem {
    /// A fresh item, first due one day after creation
    pub fn new(user_id: String, topic: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            topic,
            easiness_factor: DEFAULT_EASINESS_FACTOR,
            repetition_number: 0,
            interval_days: 1,
            last_reviewed: None,
            next_review: now + Duration::days(1),
            review_count: 0,
            average_quality: 0.0,
            created_at: now,
        }
    }

    pub fn state(&self) -> ReviewState {
        if self.review_count == 0 {
            ReviewState::New
        } else {
            ReviewState::Scheduled
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }

    /// Whole days past the due date, negative while still upcoming
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        (now - self.next_review).num_days()
    }
}

/// Reviews grouped for display: what is overdue and what is coming up
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSchedule {
    pub overdue: Vec<ReviewItem>,
    pub upcoming: Vec<ScheduledDay>,
}

impl ReviewSchedule {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.upcoming.is_empty()
    }
}

/// Items falling due on one calendar day (UTC)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledDay {
    pub date: NaiveDate,
    pub items: Vec<ReviewItem>,
}

/// Review workload summary for a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStatistics {
    pub items_due_now: usize,
    pub items_next_7_days: usize,
    pub items_next_30_days: usize,
    pub most_urgent: Vec<OverdueTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueTopic {
    pub topic: String,
    pub days_overdue: i64,
}

/// One entry of a suggested review session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSuggestion {
    pub item: ReviewItem,
    pub is_overdue: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_quality_range() {
        for v in 0..=5 {
            assert_eq!(Quality::new(v).unwrap().value(), v as u8);
        }
        assert!(matches!(Quality::new(-1), Err(ReviewError::InvalidArgument(_))));
        assert!(matches!(Quality::new(6), Err(ReviewError::InvalidArgument(_))));
    }

    #[test]
    fn test_quality_pass_threshold() {
        assert!(!Quality::new(2).unwrap().is_pass());
        assert!(Quality::new(3).unwrap().is_pass());
        assert_eq!(Quality::all().count(), 6);
    }

    #[test]
    fn test_quality_deserialize_rejects_out_of_range() {
        let q: Quality = serde_json::from_str("4").unwrap();
        assert_eq!(q.value(), 4);
        assert!(serde_json::from_str::<Quality>("9").is_err());
    }

    #[test]
    fn test_new_item_defaults() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let item = ReviewItem::new("alice".to_string(), "Recursion".to_string(), now);

        assert_eq!(item.easiness_factor, DEFAULT_EASINESS_FACTOR);
        assert_eq!(item.repetition_number, 0);
        assert_eq!(item.interval_days, 1);
        assert_eq!(item.next_review, now + Duration::days(1));
        assert_eq!(item.review_count, 0);
        assert_eq!(item.state(), ReviewState::New);
        assert!(!item.is_due(now));
        assert!(item.is_due(now + Duration::days(1)));
    }

    #[test]
    fn test_days_overdue() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let item = ReviewItem::new("alice".to_string(), "Recursion".to_string(), now);

        assert_eq!(item.days_overdue(now + Duration::days(4)), 3);
        assert_eq!(item.days_overdue(now + Duration::days(1)), 0);
        assert_eq!(item.days_overdue(now), -1);
        assert_eq!(item.days_overdue(now - Duration::days(2)), -3);
    }
}
