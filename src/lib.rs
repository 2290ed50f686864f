use std::path::Path;
use std::sync::Arc;

pub mod clock;
pub mod config;
pub mod knowledge;
pub mod progress;
pub mod review;
pub mod session;
pub mod storage;
mod validate;

use clock::{Clock, SystemClock};
use knowledge::KnowledgeTracker;
use progress::ProgressTracker;
use review::ReviewScheduler;
use session::SessionRecorder;
use storage::{KnowledgeStore, ProgressStore, ReviewStore, SqliteStorage};

/// Every service sharing one store and one clock
pub struct TeachBack {
    pub scheduler: Arc<ReviewScheduler>,
    pub tracker: Arc<KnowledgeTracker>,
    pub progress: Arc<ProgressTracker>,
    pub recorder: SessionRecorder,
    /// The clock the services schedule against
    pub clock: Arc<dyn Clock>,
}

impl TeachBack {
    /// Wire every service to the same storage backend
    pub fn new<S>(storage: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: ReviewStore + KnowledgeStore + ProgressStore + 'static,
    {
        let scheduler = Arc::new(ReviewScheduler::new(storage.clone(), clock.clone()));
        let tracker = Arc::new(KnowledgeTracker::new(storage.clone(), clock.clone()));
        let progress = Arc::new(ProgressTracker::new(storage, clock.clone()));
        let recorder = SessionRecorder::new(tracker.clone(), scheduler.clone(), progress.clone());

        Self {
            scheduler,
            tracker,
            progress,
            recorder,
            clock,
        }
    }

    /// Open (or create) a SQLite database and use the system clock
    pub fn open(db_path: &Path) -> storage::Result<Self> {
        let storage = Arc::new(SqliteStorage::open(db_path)?);
        log::info!("Opened TeachBack database at {}", db_path.display());
        Ok(Self::new(storage, Arc::new(SystemClock)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_services_share_storage() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap(),
        ));
        let app = TeachBack::new(Arc::new(MemoryStorage::new()), clock.clone());

        let summary = session::SessionSummary::from_turns(&[session::TurnAnalysis {
            confidence: 0.6,
            clarity: 0.6,
            ..Default::default()
        }])
        .unwrap();
        app.recorder
            .complete_session("u1", "Sorting", &summary, &[])
            .unwrap();

        assert!(app.tracker.get_node("u1", "Sorting").unwrap().is_some());
        assert!(app.scheduler.get_due_reviews("u1").unwrap().is_empty());
        assert_eq!(app.progress.get_user_stats("u1").unwrap().total_sessions, 1);

        clock.advance(Duration::days(1));
        assert_eq!(app.scheduler.get_due_reviews("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_exposes_the_injected_clock() {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let app = TeachBack::new(Arc::new(MemoryStorage::new()), clock.clone());

        assert_eq!(app.clock.now(), start);
        clock.advance(Duration::hours(5));
        assert_eq!(app.clock.now(), start + Duration::hours(5));
    }
}
