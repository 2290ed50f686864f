//! Completing a teaching session
//!
//! A finished session touches every part of the system: the topic's
//! knowledge node absorbs the session's scores, its review item is
//! rescheduled from the same scores, and the session joins the user's
//! history and daily progress.

use std::sync::Arc;

use super::models::{SessionOutcome, SessionSummary};
use super::SessionError;
use crate::knowledge::{KnowledgeTracker, Relationship};
use crate::progress::ProgressTracker;
use crate::review::ReviewScheduler;
use crate::validate;

pub struct SessionRecorder {
    tracker: Arc<KnowledgeTracker>,
    scheduler: Arc<ReviewScheduler>,
    progress: Arc<ProgressTracker>,
}

impl SessionRecorder {
    pub fn new(
        tracker: Arc<KnowledgeTracker>,
        scheduler: Arc<ReviewScheduler>,
        progress: Arc<ProgressTracker>,
    ) -> Self {
        Self {
            tracker,
            scheduler,
            progress,
        }
    }

    /// Record a finished session against the knowledge graph, the review
    /// schedule and the session history
    ///
    /// Related concepts that already have a node are linked from `topic`;
    /// the rest are only remembered on the node.
    ///
    /// Every argument is checked before anything is written. The steps then
    /// commit one at a time, in this order: knowledge node, review item,
    /// links, session record, daily progress. A storage failure part-way
    /// through keeps the steps already committed and returns the failing
    /// step's error.
    pub fn complete_session(
        &self,
        user_id: &str,
        topic: &str,
        summary: &SessionSummary,
        related_concepts: &[String],
    ) -> Result<SessionOutcome, SessionError> {
        check_session(user_id, topic, summary)?;

        let node = self
            .tracker
            .record_teaching(user_id, topic, &summary.observation(related_concepts))?;

        let review_item = self.scheduler.auto_record_session(
            user_id,
            topic,
            summary.confidence,
            summary.clarity,
            &summary.knowledge_gaps,
        )?;

        let mut edges_touched = 0;
        for concept in &node.related_concepts {
            if concept.eq_ignore_ascii_case(topic.trim()) {
                continue;
            }
            if self
                .tracker
                .connect_topics(user_id, topic, concept, Relationship::RelatedTo)?
                .is_some()
            {
                edges_touched += 1;
            }
        }

        let session = self.progress.record_session(user_id, topic, summary)?;
        let progress = self.progress.update_progress_metrics(user_id)?;

        log::info!(
            "Completed session on '{}' for {}: quality avg {:.1}, next review {}, {} links, {} day streak",
            topic,
            user_id,
            review_item.average_quality,
            review_item.next_review.format("%Y-%m-%d"),
            edges_touched,
            progress.consecutive_days
        );

        Ok(SessionOutcome {
            node,
            review_item,
            edges_touched,
            session,
            progress,
        })
    }
}

fn check_session(user_id: &str, topic: &str, summary: &SessionSummary) -> Result<(), SessionError> {
    validate::non_empty("user_id", user_id).map_err(SessionError::InvalidArgument)?;
    validate::non_empty("topic", topic).map_err(SessionError::InvalidArgument)?;
    validate::unit_score("confidence", summary.confidence).map_err(SessionError::InvalidArgument)?;
    validate::unit_score("clarity", summary.clarity).map_err(SessionError::InvalidArgument)?;
    if summary.turn_count == 0 {
        return Err(SessionError::InvalidArgument(
            "a session needs at least one turn".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::review::{ReviewError, ReviewItem};
    use crate::session::TurnAnalysis;
    use crate::storage::{
        KnowledgeStore, MemoryStorage, ProgressStore, ReviewStore, SqliteStorage, StorageError,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::TempDir;
    use uuid::Uuid;

    struct Fixture {
        recorder: SessionRecorder,
        tracker: Arc<KnowledgeTracker>,
        scheduler: Arc<ReviewScheduler>,
        progress: Arc<ProgressTracker>,
        clock: Arc<ManualClock>,
    }

    fn fixture(
        reviews: Arc<dyn ReviewStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        history: Arc<dyn ProgressStore>,
    ) -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 20, 18, 0, 0).unwrap(),
        ));
        let tracker = Arc::new(KnowledgeTracker::new(knowledge, clock.clone()));
        let scheduler = Arc::new(ReviewScheduler::new(reviews, clock.clone()));
        let progress = Arc::new(ProgressTracker::new(history, clock.clone()));
        Fixture {
            recorder: SessionRecorder::new(tracker.clone(), scheduler.clone(), progress.clone()),
            tracker,
            scheduler,
            progress,
            clock,
        }
    }

    fn fixture_over<S>(storage: Arc<S>) -> Fixture
    where
        S: ReviewStore + KnowledgeStore + ProgressStore + 'static,
    {
        fixture(storage.clone(), storage.clone(), storage)
    }

    /// A review store whose backend has gone away
    struct UnavailableReviews;

    impl UnavailableReviews {
        fn error() -> StorageError {
            StorageError::Corrupt("review table unavailable".to_string())
        }
    }

    impl ReviewStore for UnavailableReviews {
        fn insert_review_item_if_absent(&self, _item: ReviewItem) -> crate::storage::Result<ReviewItem> {
            Err(Self::error())
        }

        fn get_review_item(&self, _id: Uuid) -> crate::storage::Result<Option<ReviewItem>> {
            Err(Self::error())
        }

        fn find_review_item(&self, _user_id: &str, _topic: &str) -> crate::storage::Result<Option<ReviewItem>> {
            Err(Self::error())
        }

        fn update_review_item(
            &self,
            _id: Uuid,
            _update: &mut dyn FnMut(&ReviewItem) -> ReviewItem,
        ) -> crate::storage::Result<Option<ReviewItem>> {
            Err(Self::error())
        }

        fn list_review_items(&self, _user_id: &str) -> crate::storage::Result<Vec<ReviewItem>> {
            Err(Self::error())
        }

        fn list_review_items_due_between(
            &self,
            _user_id: &str,
            _after: Option<DateTime<Utc>>,
            _until: DateTime<Utc>,
        ) -> crate::storage::Result<Vec<ReviewItem>> {
            Err(Self::error())
        }
    }

    fn summary(confidence: f64, clarity: f64, gaps: &[&str]) -> SessionSummary {
        SessionSummary::from_turns(&[TurnAnalysis {
            confidence,
            clarity,
            knowledge_gaps: gaps.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }])
        .unwrap()
    }

    fn concepts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_session_updates_node_and_review_item() {
        let Fixture { recorder, scheduler, progress, .. } = fixture_over(Arc::new(MemoryStorage::new()));

        let outcome = recorder
            .complete_session("u1", "Hash maps", &summary(0.9, 0.9, &[]), &[])
            .unwrap();

        assert_eq!(outcome.session.topic, "Hash maps");
        assert_eq!(outcome.session.turn_count, 1);
        assert_eq!(outcome.progress.sessions_completed, 1);
        assert_eq!(outcome.progress.consecutive_days, 1);
        assert_eq!(progress.list_sessions("u1", None).unwrap(), vec![outcome.session.clone()]);

        assert_eq!(outcome.node.times_taught, 1);
        assert_eq!(outcome.review_item.review_count, 1);
        assert_eq!(outcome.review_item.average_quality, 4.0);
        assert_eq!(outcome.edges_touched, 0);
        assert_eq!(
            scheduler.find_review_item("u1", "Hash maps").unwrap(),
            Some(outcome.review_item.clone())
        );
        let due_at = outcome.review_item.last_reviewed.unwrap() + Duration::days(1);
        assert_eq!(outcome.review_item.next_review, due_at);
    }

    #[test]
    fn test_session_links_only_known_topics() {
        let Fixture { recorder, tracker, .. } = fixture_over(Arc::new(MemoryStorage::new()));

        recorder
            .complete_session("u1", "Hashing", &summary(0.7, 0.7, &[]), &[])
            .unwrap();

        let outcome = recorder
            .complete_session(
                "u1",
                "Hash maps",
                &summary(0.8, 0.6, &["collisions"]),
                &concepts(&["Hashing", "Load factor", "hash maps"]),
            )
            .unwrap();

        assert_eq!(outcome.edges_touched, 1);
        assert_eq!(outcome.node.related_concepts, concepts(&["Hashing", "Load factor"]));
        assert_eq!(outcome.node.persistent_gaps, concepts(&["collisions"]));

        let graph = tracker.knowledge_graph("u1").unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].relationship, Relationship::RelatedTo);
        assert_eq!(graph.node(graph.edges[0].to_node).unwrap().topic, "Hashing");

        // Teaching it again strengthens the existing link
        let again = recorder
            .complete_session("u1", "Hash maps", &summary(0.9, 0.9, &[]), &[])
            .unwrap();
        assert_eq!(again.edges_touched, 1);
        let graph = tracker.knowledge_graph("u1").unwrap();
        assert!((graph.edges[0].strength - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_session_persists_in_sqlite() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("teachback.db");

        let session_id = {
            let Fixture { recorder, .. } =
                fixture_over(Arc::new(SqliteStorage::open(&db_path).unwrap()));
            recorder
                .complete_session("u1", "Tries", &summary(0.5, 0.6, &["deletion"]), &[])
                .unwrap()
                .session
                .id
        };

        let Fixture { tracker, scheduler, progress, .. } =
            fixture_over(Arc::new(SqliteStorage::open(&db_path).unwrap()));
        let node = tracker.get_node("u1", "Tries").unwrap().unwrap();
        assert_eq!(node.persistent_gaps, concepts(&["deletion"]));
        let item = scheduler.find_review_item("u1", "Tries").unwrap().unwrap();
        assert_eq!(item.review_count, 1);
        let session = progress.get_session(session_id).unwrap().unwrap();
        assert_eq!(session.knowledge_gaps, concepts(&["deletion"]));
        assert_eq!(progress.session_turns(session_id).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_session_writes_nothing() {
        let Fixture { recorder, tracker, scheduler, progress, .. } =
            fixture_over(Arc::new(MemoryStorage::new()));
        let bad = SessionSummary {
            confidence: 2.0,
            ..summary(0.5, 0.5, &[])
        };

        assert!(matches!(
            recorder.complete_session("u1", "Heaps", &bad, &[]),
            Err(SessionError::InvalidArgument(_))
        ));
        assert!(matches!(
            recorder.complete_session("u1", "", &summary(0.5, 0.5, &[]), &[]),
            Err(SessionError::InvalidArgument(_))
        ));
        let no_turns = SessionSummary {
            turn_count: 0,
            turns: Vec::new(),
            ..summary(0.5, 0.5, &[])
        };
        assert!(matches!(
            recorder.complete_session("u1", "Heaps", &no_turns, &[]),
            Err(SessionError::InvalidArgument(_))
        ));

        assert!(tracker.get_node("u1", "Heaps").unwrap().is_none());
        assert!(scheduler.find_review_item("u1", "Heaps").unwrap().is_none());
        assert!(progress.list_sessions("u1", None).unwrap().is_empty());
    }

    #[test]
    fn test_review_failure_keeps_earlier_steps_only() {
        let storage = Arc::new(MemoryStorage::new());
        let Fixture { recorder, tracker, progress, .. } =
            fixture(Arc::new(UnavailableReviews), storage.clone(), storage);

        let result = recorder.complete_session("u1", "Graphs", &summary(0.8, 0.8, &[]), &[]);
        assert!(matches!(
            result,
            Err(SessionError::Review(ReviewError::Storage(_)))
        ));

        // The knowledge node had already committed; nothing after the review did
        assert_eq!(tracker.get_node("u1", "Graphs").unwrap().unwrap().times_taught, 1);
        assert!(progress.list_sessions("u1", None).unwrap().is_empty());
        assert_eq!(progress.get_user_stats("u1").unwrap().current_streak, 0);
    }

    #[test]
    fn test_sessions_on_consecutive_days_build_a_streak() {
        let Fixture { recorder, progress, clock, .. } = fixture_over(Arc::new(MemoryStorage::new()));

        for topic in ["Queues", "Stacks", "Deques"] {
            let outcome = recorder
                .complete_session("u1", topic, &summary(0.7, 0.7, &[]), &[])
                .unwrap();
            assert_eq!(outcome.progress.date, clock.now().date_naive());
            clock.advance(Duration::days(1));
        }

        let stats = progress.get_user_stats("u1").unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.unique_topics, 3);
        assert_eq!(stats.current_streak, 3);
    }
}
