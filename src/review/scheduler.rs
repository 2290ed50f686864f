//! Review scheduling over a pluggable store
//!
//! The scheduler validates input, asks the clock for the time, and hands
//! the SM-2 arithmetic in [`super::algorithm`] to the store as an atomic
//! update.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::algorithm::{apply_review, derive_quality_from_performance};
use super::error::{Result, ReviewError};
use super::models::*;
use crate::clock::Clock;
use crate::storage::ReviewStore;
use crate::validate;

/// Items listed in the statistics' most-urgent section
const MOST_URGENT_LIMIT: usize = 5;

/// How far ahead a suggested session reaches for not-yet-due items
const SUGGESTION_LOOKAHEAD_DAYS: u32 = 2;

/// Decides when each studied topic should next be reviewed
pub struct ReviewScheduler {
    store: Arc<dyn ReviewStore>,
    clock: Arc<dyn Clock>,
}

impl ReviewScheduler {
    pub fn new(store: Arc<dyn ReviewStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Get the review item for a topic, creating it on first encounter
    pub fn create_or_get_review_item(&self, user_id: &str, topic: &str) -> Result<ReviewItem> {
        validate::non_empty("user_id", user_id).map_err(ReviewError::InvalidArgument)?;
        validate::non_empty("topic", topic).map_err(ReviewError::InvalidArgument)?;

        let candidate = ReviewItem::new(user_id.to_string(), topic.to_string(), self.clock.now());
        let candidate_id = candidate.id;
        let item = self.store.insert_review_item_if_absent(candidate)?;

        if item.id == candidate_id {
            log::info!("Added '{}' to review for {}", topic, user_id);
        }
        Ok(item)
    }

    /// Record a recall attempt and reschedule the item
    pub fn record_review(&self, item_id: Uuid, quality: i64) -> Result<ReviewItem> {
        let quality = Quality::new(quality).map_err(|e| {
            log::warn!("Rejected review of {}: {}", item_id, e);
            e
        })?;
        self.record_quality(item_id, quality)
    }

    fn record_quality(&self, item_id: Uuid, quality: Quality) -> Result<ReviewItem> {
        let now = self.clock.now();
        let item = self
            .store
            .update_review_item(item_id, &mut |current| apply_review(current, quality, now))?
            .ok_or(ReviewError::NotFound(item_id))?;

        log::info!(
            "Reviewed '{}' with quality {}: next in {} days (EF {:.2}, n={})",
            item.topic,
            quality,
            item.interval_days,
            item.easiness_factor,
            item.repetition_number
        );
        Ok(item)
    }

    /// Items due now, most overdue first
    pub fn get_due_reviews(&self, user_id: &str) -> Result<Vec<ReviewItem>> {
        let items = self
            .store
            .list_review_items_due_between(user_id, None, self.clock.now())?;
        log::debug!("{} reviews due for {}", items.len(), user_id);
        Ok(items)
    }

    /// Items falling due within the next `days` days, soonest first
    pub fn get_upcoming_reviews(&self, user_id: &str, days: u32) -> Result<Vec<ReviewItem>> {
        self.upcoming_from(user_id, self.clock.now(), days)
    }

    fn upcoming_from(&self, user_id: &str, now: DateTime<Utc>, days: u32) -> Result<Vec<ReviewItem>> {
        let until = now + Duration::days(i64::from(days));
        Ok(self
            .store
            .list_review_items_due_between(user_id, Some(now), until)?)
    }

    /// Map session scores to a quality rating
    pub fn derive_quality_from_performance(confidence: f64, clarity: f64, had_gaps: bool) -> Quality {
        derive_quality_from_performance(confidence, clarity, had_gaps)
    }

    /// Schedule a topic from a finished teaching session
    ///
    /// The item is created if needed, then reviewed with a quality derived
    /// from the session's scores.
    pub fn auto_record_session(
        &self,
        user_id: &str,
        topic: &str,
        confidence: f64,
        clarity: f64,
        gaps: &[String],
    ) -> Result<ReviewItem> {
        validate::unit_score("confidence", confidence).map_err(ReviewError::InvalidArgument)?;
        validate::unit_score("clarity", clarity).map_err(ReviewError::InvalidArgument)?;

        let item = self.create_or_get_review_item(user_id, topic)?;
        let quality = derive_quality_from_performance(confidence, clarity, !gaps.is_empty());
        self.record_quality(item.id, quality)
    }

    /// Overdue items plus upcoming items grouped by the day they fall due
    pub fn get_review_schedule(&self, user_id: &str, days: u32) -> Result<ReviewSchedule> {
        let now = self.clock.now();
        let overdue = self.store.list_review_items_due_between(user_id, None, now)?;

        let mut by_date: BTreeMap<_, Vec<ReviewItem>> = BTreeMap::new();
        for item in self.upcoming_from(user_id, now, days)? {
            by_date
                .entry(item.next_review.date_naive())
                .or_default()
                .push(item);
        }

        let upcoming = by_date
            .into_iter()
            .map(|(date, items)| ScheduledDay { date, items })
            .collect();

        Ok(ReviewSchedule { overdue, upcoming })
    }

    /// Counts of due and upcoming work, with the most overdue topics
    pub fn get_review_statistics(&self, user_id: &str) -> Result<ReviewStatistics> {
        let now = self.clock.now();
        let due = self.store.list_review_items_due_between(user_id, None, now)?;

        let most_urgent = due
            .iter()
            .take(MOST_URGENT_LIMIT)
            .map(|item| OverdueTopic {
                topic: item.topic.clone(),
                days_overdue: item.days_overdue(now),
            })
            .collect();

        Ok(ReviewStatistics {
            items_due_now: due.len(),
            items_next_7_days: self.upcoming_from(user_id, now, 7)?.len(),
            items_next_30_days: self.upcoming_from(user_id, now, 30)?.len(),
            most_urgent,
        })
    }

    /// Pick what to review next: everything due, then what is due soon
    pub fn suggest_review_session(&self, user_id: &str, max_items: usize) -> Result<Vec<SessionSuggestion>> {
        let now = self.clock.now();
        let until = now + Duration::days(i64::from(SUGGESTION_LOOKAHEAD_DAYS));

        // Due and upcoming are contiguous ranges, so one ordered query covers both
        let items = self.store.list_review_items_due_between(user_id, None, until)?;

        Ok(items
            .into_iter()
            .take(max_items)
            .map(|item| SessionSuggestion {
                is_overdue: item.next_review < now,
                item,
            })
            .collect())
    }

    /// Every review item the user has, soonest first
    pub fn list_review_items(&self, user_id: &str) -> Result<Vec<ReviewItem>> {
        Ok(self.store.list_review_items(user_id)?)
    }

    pub fn get_review_item(&self, item_id: Uuid) -> Result<ReviewItem> {
        self.store
            .get_review_item(item_id)?
            .ok_or(ReviewError::NotFound(item_id))
    }

    /// Look up a user's item by topic without creating it
    pub fn find_review_item(&self, user_id: &str, topic: &str) -> Result<Option<ReviewItem>> {
        Ok(self.store.find_review_item(user_id, topic)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::review::algorithm::MAX_INTERVAL_DAYS;
    use crate::storage::{MemoryStorage, SqliteStorage};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap()
    }

    fn scheduler_with(store: Arc<dyn ReviewStore>) -> (ReviewScheduler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        (ReviewScheduler::new(store, clock.clone()), clock)
    }

    fn memory_scheduler() -> (ReviewScheduler, Arc<ManualClock>) {
        scheduler_with(Arc::new(MemoryStorage::new()))
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
    }

    fn exercise_sm2_sequence(store: Arc<dyn ReviewStore>) {
        let (scheduler, clock) = scheduler_with(store);
        let item = scheduler.create_or_get_review_item("u1", "Borrow checker").unwrap();

        let first = scheduler.record_review(item.id, 5).unwrap();
        assert_eq!((first.repetition_number, first.interval_days), (1, 1));
        assert_close(first.easiness_factor, 2.6);
        assert_eq!(first.next_review, start() + Duration::days(1));
        assert_eq!(first.state(), ReviewState::Scheduled);

        clock.advance(Duration::days(1));
        let second = scheduler.record_review(item.id, 4).unwrap();
        assert_eq!((second.repetition_number, second.interval_days), (2, 6));
        assert_close(second.easiness_factor, 2.6);

        clock.advance(Duration::days(6));
        let third = scheduler.record_review(item.id, 5).unwrap();
        assert_eq!((third.repetition_number, third.interval_days), (3, 16));
        assert_close(third.easiness_factor, 2.7);
        assert_eq!(third.last_reviewed, Some(clock.now()));
        assert_eq!(third.next_review, clock.now() + Duration::days(16));

        clock.advance(Duration::days(16));
        let fourth = scheduler.record_review(item.id, 2).unwrap();
        assert_eq!((fourth.repetition_number, fourth.interval_days), (0, 1));
        assert_close(fourth.easiness_factor, 2.38);

        assert_eq!(fourth.review_count, 4);
        assert_close(fourth.average_quality, (5.0 + 4.0 + 5.0 + 2.0) / 4.0);
        assert_eq!(scheduler.get_review_item(item.id).unwrap(), fourth);
    }

    #[test]
    fn test_sm2_sequence_memory() {
        exercise_sm2_sequence(Arc::new(MemoryStorage::new()));
    }

    #[test]
    fn test_sm2_sequence_sqlite() {
        exercise_sm2_sequence(Arc::new(SqliteStorage::open_in_memory().unwrap()));
    }

    #[test]
    fn test_create_or_get_is_idempotent() {
        let (scheduler, clock) = memory_scheduler();

        let first = scheduler.create_or_get_review_item("u1", "Lifetimes").unwrap();
        clock.advance(Duration::hours(3));
        let second = scheduler.create_or_get_review_item("u1", "Lifetimes").unwrap();

        assert_eq!(first, second);
        assert_eq!(scheduler.list_review_items("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_create_rejects_empty_arguments() {
        let (scheduler, _clock) = memory_scheduler();

        assert!(matches!(
            scheduler.create_or_get_review_item("", "Lifetimes"),
            Err(ReviewError::InvalidArgument(_))
        ));
        assert!(matches!(
            scheduler.create_or_get_review_item("u1", "  "),
            Err(ReviewError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_record_review_errors_have_no_side_effects() {
        let (scheduler, _clock) = memory_scheduler();
        let item = scheduler.create_or_get_review_item("u1", "Macros").unwrap();

        assert!(matches!(
            scheduler.record_review(item.id, 6),
            Err(ReviewError::InvalidArgument(_))
        ));
        assert!(matches!(
            scheduler.record_review(item.id, -1),
            Err(ReviewError::InvalidArgument(_))
        ));
        assert_eq!(scheduler.get_review_item(item.id).unwrap(), item);

        let missing = Uuid::new_v4();
        assert!(matches!(
            scheduler.record_review(missing, 3),
            Err(ReviewError::NotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_review_count_and_average_track_every_review() {
        let (scheduler, clock) = memory_scheduler();
        let item = scheduler.create_or_get_review_item("u1", "Generics").unwrap();

        let qualities = [3, 0, 5, 5, 1, 4, 2];
        for q in qualities {
            clock.advance(Duration::days(1));
            let reviewed = scheduler.record_review(item.id, q).unwrap();
            assert!(reviewed.easiness_factor >= MIN_EASINESS_FACTOR);
        }

        let last = scheduler.get_review_item(item.id).unwrap();

        let mean = qualities.iter().sum::<i64>() as f64 / qualities.len() as f64;
        assert_eq!(last.review_count, qualities.len() as u32);
        assert_close(last.average_quality, mean);
    }

    #[test]
    fn test_due_reviews_follow_the_clock() {
        let (scheduler, clock) = memory_scheduler();
        let item = scheduler.create_or_get_review_item("u1", "Pattern matching").unwrap();

        assert!(scheduler.get_due_reviews("u1").unwrap().is_empty());

        clock.advance(Duration::days(2));
        let due = scheduler.get_due_reviews("u1").unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, item.id);
    }

    #[test]
    fn test_due_and_upcoming_windows() {
        let (scheduler, clock) = memory_scheduler();

        // Created one day apart, so due on start + 1, 2, 3 and 4 days
        for topic in ["Ownership", "Slices", "Enums", "Modules"] {
            scheduler.create_or_get_review_item("u1", topic).unwrap();
            clock.advance(Duration::days(1));
        }
        clock.set(start() + Duration::days(2));

        let due = scheduler.get_due_reviews("u1").unwrap();
        assert_eq!(
            due.iter().map(|i| i.topic.as_str()).collect::<Vec<_>>(),
            vec!["Ownership", "Slices"]
        );
        for item in &due {
            assert!(item.next_review <= clock.now());
        }

        let upcoming = scheduler.get_upcoming_reviews("u1", 1).unwrap();
        assert_eq!(
            upcoming.iter().map(|i| i.topic.as_str()).collect::<Vec<_>>(),
            vec!["Enums"]
        );

        let upcoming = scheduler.get_upcoming_reviews("u1", 7).unwrap();
        assert_eq!(upcoming.len(), 2);
        for item in &upcoming {
            assert!(item.next_review > clock.now());
            assert!(item.next_review <= clock.now() + Duration::days(7));
        }

        assert!(scheduler.get_due_reviews("someone-else").unwrap().is_empty());
    }

    #[test]
    fn test_auto_record_session_creates_then_reviews() {
        let (scheduler, _clock) = memory_scheduler();

        let gaps = vec!["doesn't explain drop order".to_string()];
        let item = scheduler
            .auto_record_session("u1", "RAII", 0.9, 0.95, &gaps)
            .unwrap();

        // 0.925 * 0.8 = 0.74, a quality of 3
        assert_eq!(item.review_count, 1);
        assert_eq!(item.repetition_number, 1);
        assert_close(item.average_quality, 3.0);

        let again = scheduler.auto_record_session("u1", "RAII", 0.9, 0.95, &[]).unwrap();
        assert_eq!(again.id, item.id);
        assert_eq!(again.review_count, 2);
        assert_eq!(again.interval_days, 6);
        assert_close(again.average_quality, 3.5);
    }

    #[test]
    fn test_auto_record_session_validates_scores_before_writing() {
        let (scheduler, _clock) = memory_scheduler();

        assert!(matches!(
            scheduler.auto_record_session("u1", "RAII", 1.2, 0.5, &[]),
            Err(ReviewError::InvalidArgument(_))
        ));
        assert!(scheduler.find_review_item("u1", "RAII").unwrap().is_none());
    }

    #[test]
    fn test_review_schedule_groups_by_day() {
        let (scheduler, clock) = memory_scheduler();

        let overdue = scheduler.create_or_get_review_item("u1", "Traits").unwrap();
        clock.advance(Duration::days(3));
        let a = scheduler.create_or_get_review_item("u1", "Async").unwrap();
        let b = scheduler.create_or_get_review_item("u1", "Pinning").unwrap();
        let c = scheduler.create_or_get_review_item("u1", "Unsafe").unwrap();
        scheduler.record_review(c.id, 4).unwrap();
        scheduler.record_review(c.id, 4).unwrap();

        let schedule = scheduler.get_review_schedule("u1", 14).unwrap();
        assert_eq!(schedule.overdue.len(), 1);
        assert_eq!(schedule.overdue[0].id, overdue.id);

        assert_eq!(schedule.upcoming.len(), 2);
        let tomorrow = &schedule.upcoming[0];
        assert_eq!(tomorrow.date, (clock.now() + Duration::days(1)).date_naive());
        assert_eq!(
            tomorrow.items.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![a.id, b.id]
        );
        assert_eq!(schedule.upcoming[1].date, (clock.now() + Duration::days(6)).date_naive());
    }

    #[test]
    fn test_review_statistics() {
        let (scheduler, clock) = memory_scheduler();

        for topic in ["A", "B", "C", "D", "E", "F"] {
            scheduler.create_or_get_review_item("u1", topic).unwrap();
        }
        clock.advance(Duration::days(4));
        let soon = scheduler.create_or_get_review_item("u1", "G").unwrap();
        let later = scheduler.create_or_get_review_item("u1", "H").unwrap();
        for _ in 0..3 {
            scheduler.record_review(later.id, 5).unwrap();
        }
        assert_eq!(soon.next_review, clock.now() + Duration::days(1));

        let stats = scheduler.get_review_statistics("u1").unwrap();
        assert_eq!(stats.items_due_now, 6);
        assert_eq!(stats.items_next_7_days, 1);
        // H is now 16 days out
        assert_eq!(stats.items_next_30_days, 2);
        assert_eq!(stats.most_urgent.len(), 5);
        assert_eq!(stats.most_urgent[0].days_overdue, 3);
    }

    #[test]
    fn test_suggest_review_session() {
        let (scheduler, clock) = memory_scheduler();

        scheduler.create_or_get_review_item("u1", "Overdue").unwrap();
        clock.advance(Duration::days(2));
        scheduler.create_or_get_review_item("u1", "Tomorrow").unwrap();
        let far = scheduler.create_or_get_review_item("u1", "Far").unwrap();
        scheduler.record_review(far.id, 5).unwrap();
        scheduler.record_review(far.id, 5).unwrap();

        let suggestions = scheduler.suggest_review_session("u1", 10).unwrap();
        assert_eq!(
            suggestions.iter().map(|s| s.item.topic.as_str()).collect::<Vec<_>>(),
            vec!["Overdue", "Tomorrow"]
        );
        assert!(suggestions[0].is_overdue);
        assert!(!suggestions[1].is_overdue);

        assert_eq!(scheduler.suggest_review_session("u1", 1).unwrap().len(), 1);
    }

    fn exercise_long_pass_streak(store: Arc<dyn ReviewStore>) {
        let (scheduler, clock) = scheduler_with(store);
        let item = scheduler.create_or_get_review_item("u1", "Traits").unwrap();

        for _ in 0..39 {
            let reviewed = scheduler.record_review(item.id, 5).unwrap();
            assert!(reviewed.interval_days <= MAX_INTERVAL_DAYS);
        }
        let last = scheduler.record_review(item.id, 5).unwrap();
        assert_eq!(last.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(last.review_count, 40);
        assert_eq!(
            last.next_review,
            clock.now() + Duration::days(i64::from(MAX_INTERVAL_DAYS))
        );

        // The store keeps serving every user afterwards
        assert!(scheduler.get_due_reviews("u1").unwrap().is_empty());
        let other = scheduler.create_or_get_review_item("u2", "Closures").unwrap();
        assert_eq!(scheduler.record_review(other.id, 4).unwrap().review_count, 1);
    }

    #[test]
    fn test_long_pass_streak_caps_interval_memory() {
        exercise_long_pass_streak(Arc::new(MemoryStorage::new()));
    }

    #[test]
    fn test_long_pass_streak_caps_interval_sqlite() {
        exercise_long_pass_streak(Arc::new(SqliteStorage::open_in_memory().unwrap()));
    }

    fn exercise_concurrent_reviews(store: Arc<dyn ReviewStore>) {
        let (scheduler, _clock) = scheduler_with(store);
        let scheduler = Arc::new(scheduler);
        let item = scheduler.create_or_get_review_item("u1", "Atomics").unwrap();
        let id = item.id;

        let qualities: Vec<i64> = (0..24).map(|i| i % 6).collect();
        std::thread::scope(|scope| {
            for &quality in &qualities {
                let scheduler = Arc::clone(&scheduler);
                scope.spawn(move || scheduler.record_review(id, quality).unwrap());
            }
        });

        let last = scheduler.get_review_item(id).unwrap();
        let mean = qualities.iter().sum::<i64>() as f64 / qualities.len() as f64;
        assert_eq!(last.review_count, qualities.len() as u32);
        assert_close(last.average_quality, mean);
        assert!(last.easiness_factor >= MIN_EASINESS_FACTOR);
    }

    #[test]
    fn test_concurrent_reviews_are_not_lost_memory() {
        exercise_concurrent_reviews(Arc::new(MemoryStorage::new()));
    }

    #[test]
    fn test_concurrent_reviews_are_not_lost_sqlite() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = SqliteStorage::open(&dir.path().join("teachback.db")).unwrap();
        exercise_concurrent_reviews(Arc::new(storage));
    }
}
