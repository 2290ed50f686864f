//! Persistence for review items, the knowledge graph and session history
//!
//! Two backends implement the same traits:
//! - [`MemoryStorage`] keeps everything in mutex-guarded maps
//! - [`SqliteStorage`] keeps everything in a single SQLite file
//!
//! Every mutating call is atomic for the record it touches: the updater
//! closure runs while the backend holds its lock (or open transaction), so
//! two callers reviewing the same item cannot lose each other's update.

mod memory;
mod sqlite;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::knowledge::{KnowledgeEdge, KnowledgeNode};
use crate::progress::{DailyProgress, SessionRecord};
use crate::review::ReviewItem;
use crate::session::TurnAnalysis;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage for spaced repetition items, keyed by id and by (user, topic)
pub trait ReviewStore: Send + Sync {
    /// Insert `item` unless its (user, topic) pair already exists.
    /// Returns whichever item is stored afterwards.
    fn insert_review_item_if_absent(&self, item: ReviewItem) -> Result<ReviewItem>;

    fn get_review_item(&self, id: Uuid) -> Result<Option<ReviewItem>>;

    fn find_review_item(&self, user_id: &str, topic: &str) -> Result<Option<ReviewItem>>;

    /// Atomically replace an item with `update(current)`.
    /// Returns `None` without writing when the item does not exist.
    fn update_review_item(
        &self,
        id: Uuid,
        update: &mut dyn FnMut(&ReviewItem) -> ReviewItem,
    ) -> Result<Option<ReviewItem>>;

    /// All of a user's items, ordered by next review
    fn list_review_items(&self, user_id: &str) -> Result<Vec<ReviewItem>>;

    /// Items with `after < next_review <= until`, ordered by next review.
    /// With no lower bound, every item due by `until`.
    fn list_review_items_due_between(
        &self,
        user_id: &str,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReviewItem>>;
}

/// Storage for knowledge graph nodes and edges
pub trait KnowledgeStore: Send + Sync {
    /// Atomically create or replace the node for (user, topic).
    /// `update` receives the current node, if any.
    fn upsert_knowledge_node(
        &self,
        user_id: &str,
        topic: &str,
        update: &mut dyn FnMut(Option<&KnowledgeNode>) -> KnowledgeNode,
    ) -> Result<KnowledgeNode>;

    fn get_knowledge_node(&self, user_id: &str, topic: &str) -> Result<Option<KnowledgeNode>>;

    /// All of a user's nodes, oldest first
    fn list_knowledge_nodes(&self, user_id: &str) -> Result<Vec<KnowledgeNode>>;

    /// Atomically create or replace the edge from one node to another
    fn upsert_knowledge_edge(
        &self,
        from_node: Uuid,
        to_node: Uuid,
        update: &mut dyn FnMut(Option<&KnowledgeEdge>) -> KnowledgeEdge,
    ) -> Result<KnowledgeEdge>;

    /// Edges leaving any of the user's nodes
    fn list_knowledge_edges(&self, user_id: &str) -> Result<Vec<KnowledgeEdge>>;
}

/// Storage for completed sessions and per-day progress
pub trait ProgressStore: Send + Sync {
    /// Store a session together with its turns, numbered from 1
    fn insert_session(&self, session: &SessionRecord, turns: &[TurnAnalysis]) -> Result<()>;

    fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>>;

    /// A user's sessions, most recent first
    fn list_sessions(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<SessionRecord>>;

    /// A session's turns in the order they were taken
    fn list_session_turns(&self, session_id: Uuid) -> Result<Vec<TurnAnalysis>>;

    /// Atomically recompute the user's row for `date`.
    /// `compute` receives the sessions completed on `date` (UTC) and the
    /// stored row for the day before, if any.
    fn refresh_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
        compute: &mut dyn FnMut(&[SessionRecord], Option<&DailyProgress>) -> DailyProgress,
    ) -> Result<DailyProgress>;

    /// Rows dated on or after `since`, oldest first
    fn list_daily_progress(&self, user_id: &str, since: NaiveDate) -> Result<Vec<DailyProgress>>;

    /// The most recent row, if the user has any
    fn latest_daily_progress(&self, user_id: &str) -> Result<Option<DailyProgress>>;
}

/// Order by due date, breaking ties by topic so listings are stable
pub(crate) fn sort_by_next_review(items: &mut [ReviewItem]) {
    items.sort_by(|a, b| {
        a.next_review
            .cmp(&b.next_review)
            .then_with(|| a.topic.cmp(&b.topic))
    });
}

/// Most recent first, ties broken by id
pub(crate) fn sort_newest_first(sessions: &mut [SessionRecord]) {
    sessions.sort_by(|a, b| {
        b.completed_at
            .cmp(&a.completed_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
