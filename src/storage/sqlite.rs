//! SQLite storage backend
//!
//! Timestamps are stored as integer milliseconds since the Unix epoch so
//! that due-date range queries compare numerically. String lists are
//! stored as JSON arrays.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use uuid::Uuid;

use super::{KnowledgeStore, ProgressStore, Result, ReviewStore, StorageError};
use crate::knowledge::{KnowledgeEdge, KnowledgeNode, Relationship};
use crate::progress::{DailyProgress, SessionRecord};
use crate::review::ReviewItem;
use crate::session::TurnAnalysis;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS review_items (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    topic TEXT NOT NULL,
    easiness_factor REAL NOT NULL,
    repetition_number INTEGER NOT NULL,
    interval_days INTEGER NOT NULL,
    last_reviewed INTEGER,
    next_review INTEGER NOT NULL,
    review_count INTEGER NOT NULL,
    average_quality REAL NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (user_id, topic)
);

CREATE TABLE IF NOT EXISTS knowledge_nodes (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    topic TEXT NOT NULL,
    times_taught INTEGER NOT NULL,
    average_confidence REAL NOT NULL,
    average_clarity REAL NOT NULL,
    first_taught INTEGER NOT NULL,
    last_taught INTEGER NOT NULL,
    related_concepts TEXT NOT NULL DEFAULT '[]',
    persistent_gaps TEXT NOT NULL DEFAULT '[]',
    recurring_jargon TEXT NOT NULL DEFAULT '[]',
    UNIQUE (user_id, topic)
);

CREATE TABLE IF NOT EXISTS knowledge_edges (
    id TEXT PRIMARY KEY,
    from_node TEXT NOT NULL,
    to_node TEXT NOT NULL,
    relationship TEXT NOT NULL,
    strength REAL NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (from_node, to_node),
    FOREIGN KEY (from_node) REFERENCES knowledge_nodes(id) ON DELETE CASCADE,
    FOREIGN KEY (to_node) REFERENCES knowledge_nodes(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    topic TEXT NOT NULL,
    turn_count INTEGER NOT NULL,
    average_confidence REAL NOT NULL,
    average_clarity REAL NOT NULL,
    knowledge_gaps TEXT NOT NULL DEFAULT '[]',
    completed_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS session_turns (
    session_id TEXT NOT NULL,
    turn_number INTEGER NOT NULL,
    confidence REAL NOT NULL,
    clarity REAL NOT NULL,
    knowledge_gaps TEXT NOT NULL DEFAULT '[]',
    unexplained_jargon TEXT NOT NULL DEFAULT '[]',
    strengths TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (session_id, turn_number),
    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS daily_progress (
    user_id TEXT NOT NULL,
    date TEXT NOT NULL,
    sessions_completed INTEGER NOT NULL,
    total_turns INTEGER NOT NULL,
    average_confidence REAL NOT NULL,
    average_clarity REAL NOT NULL,
    unique_topics INTEGER NOT NULL,
    consecutive_days INTEGER NOT NULL,
    PRIMARY KEY (user_id, date)
);

CREATE INDEX IF NOT EXISTS idx_review_items_due ON review_items(user_id, next_review);
CREATE INDEX IF NOT EXISTS idx_knowledge_nodes_user ON knowledge_nodes(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id, completed_at);
"#;

const REVIEW_COLUMNS: &str = "id, user_id, topic, easiness_factor, repetition_number, interval_days, \
     last_reviewed, next_review, review_count, average_quality, created_at";

const NODE_COLUMNS: &str = "id, user_id, topic, times_taught, average_confidence, average_clarity, \
     first_taught, last_taught, related_concepts, persistent_gaps, recurring_jargon";

const EDGE_COLUMNS: &str = "id, from_node, to_node, relationship, strength, created_at";

const SESSION_COLUMNS: &str = "id, user_id, topic, turn_count, average_confidence, average_clarity, \
     knowledge_gaps, completed_at";

const PROGRESS_COLUMNS: &str = "user_id, date, sessions_completed, total_turns, average_confidence, \
     average_clarity, unique_topics, consecutive_days";

/// Dates are stored as `YYYY-MM-DD`, which sorts chronologically
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage backed by a single SQLite database file
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at the given path
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        log::debug!("Opened review database at {:?}", db_path);
        Self::with_connection(conn)
    }

    /// A private database that disappears when dropped
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

// ==================== Row Mapping ====================

fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(StorageError::InvalidTimestamp(ms))
}

/// `[start, end)` of a UTC calendar day, in milliseconds
fn day_bounds(date: NaiveDate) -> (i64, i64) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    let end = start
        .checked_add_signed(Duration::days(1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (to_millis(start), to_millis(end))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| StorageError::Corrupt(format!("bad date {:?}: {}", s, e)))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StorageError::Corrupt(format!("bad id {:?}: {}", s, e)))
}

fn to_json_list(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

fn from_json_list(s: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(s)?)
}

/// Raw column values, converted after the rusqlite borrow ends
struct ReviewRow {
    id: String,
    user_id: String,
    topic: String,
    easiness_factor: f64,
    repetition_number: u32,
    interval_days: u32,
    last_reviewed: Option<i64>,
    next_review: i64,
    review_count: u32,
    average_quality: f64,
    created_at: i64,
}

impl ReviewRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            topic: row.get(2)?,
            easiness_factor: row.get(3)?,
            repetition_number: row.get(4)?,
            interval_days: row.get(5)?,
            last_reviewed: row.get(6)?,
            next_review: row.get(7)?,
            review_count: row.get(8)?,
            average_quality: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_item(self) -> Result<ReviewItem> {
        Ok(ReviewItem {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            topic: self.topic,
            easiness_factor: self.easiness_factor,
            repetition_number: self.repetition_number,
            interval_days: self.interval_days,
            last_reviewed: self.last_reviewed.map(from_millis).transpose()?,
            next_review: from_millis(self.next_review)?,
            review_count: self.review_count,
            average_quality: self.average_quality,
            created_at: from_millis(self.created_at)?,
        })
    }
}

struct NodeRow {
    id: String,
    user_id: String,
    topic: String,
    times_taught: u32,
    average_confidence: f64,
    average_clarity: f64,
    first_taught: i64,
    last_taught: i64,
    related_concepts: String,
    persistent_gaps: String,
    recurring_jargon: String,
}

impl NodeRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            topic: row.get(2)?,
            times_taught: row.get(3)?,
            average_confidence: row.get(4)?,
            average_clarity: row.get(5)?,
            first_taught: row.get(6)?,
            last_taught: row.get(7)?,
            related_concepts: row.get(8)?,
            persistent_gaps: row.get(9)?,
            recurring_jargon: row.get(10)?,
        })
    }

    fn into_node(self) -> Result<KnowledgeNode> {
        Ok(KnowledgeNode {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            topic: self.topic,
            times_taught: self.times_taught,
            average_confidence: self.average_confidence,
            average_clarity: self.average_clarity,
            first_taught: from_millis(self.first_taught)?,
            last_taught: from_millis(self.last_taught)?,
            related_concepts: from_json_list(&self.related_concepts)?,
            persistent_gaps: from_json_list(&self.persistent_gaps)?,
            recurring_jargon: from_json_list(&self.recurring_jargon)?,
        })
    }
}

struct EdgeRow {
    id: String,
    from_node: String,
    to_node: String,
    relationship: String,
    strength: f64,
    created_at: i64,
}

impl EdgeRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            from_node: row.get(1)?,
            to_node: row.get(2)?,
            relationship: row.get(3)?,
            strength: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_edge(self) -> Result<KnowledgeEdge> {
        let relationship: Relationship = self
            .relationship
            .parse()
            .map_err(|e: String| StorageError::Corrupt(e))?;

        Ok(KnowledgeEdge {
            id: parse_uuid(&self.id)?,
            from_node: parse_uuid(&self.from_node)?,
            to_node: parse_uuid(&self.to_node)?,
            relationship,
            strength: self.strength,
            created_at: from_millis(self.created_at)?,
        })
    }
}

struct SessionRow {
    id: String,
    user_id: String,
    topic: String,
    turn_count: u32,
    average_confidence: f64,
    average_clarity: f64,
    knowledge_gaps: String,
    completed_at: i64,
}

impl SessionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            topic: row.get(2)?,
            turn_count: row.get(3)?,
            average_confidence: row.get(4)?,
            average_clarity: row.get(5)?,
            knowledge_gaps: row.get(6)?,
            completed_at: row.get(7)?,
        })
    }

    fn into_session(self) -> Result<SessionRecord> {
        Ok(SessionRecord {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            topic: self.topic,
            turn_count: self.turn_count,
            average_confidence: self.average_confidence,
            average_clarity: self.average_clarity,
            knowledge_gaps: from_json_list(&self.knowledge_gaps)?,
            completed_at: from_millis(self.completed_at)?,
        })
    }
}

struct TurnRow {
    confidence: f64,
    clarity: f64,
    knowledge_gaps: String,
    unexplained_jargon: String,
    strengths: String,
}

impl TurnRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            confidence: row.get(0)?,
            clarity: row.get(1)?,
            knowledge_gaps: row.get(2)?,
            unexplained_jargon: row.get(3)?,
            strengths: row.get(4)?,
        })
    }

    fn into_turn(self) -> Result<TurnAnalysis> {
        Ok(TurnAnalysis {
            confidence: self.confidence,
            clarity: self.clarity,
            knowledge_gaps: from_json_list(&self.knowledge_gaps)?,
            unexplained_jargon: from_json_list(&self.unexplained_jargon)?,
            strengths: from_json_list(&self.strengths)?,
        })
    }
}

struct ProgressRow {
    user_id: String,
    date: String,
    sessions_completed: u32,
    total_turns: u32,
    average_confidence: f64,
    average_clarity: f64,
    unique_topics: u32,
    consecutive_days: u32,
}

impl ProgressRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            date: row.get(1)?,
            sessions_completed: row.get(2)?,
            total_turns: row.get(3)?,
            average_confidence: row.get(4)?,
            average_clarity: row.get(5)?,
            unique_topics: row.get(6)?,
            consecutive_days: row.get(7)?,
        })
    }

    fn into_progress(self) -> Result<DailyProgress> {
        Ok(DailyProgress {
            user_id: self.user_id,
            date: parse_date(&self.date)?,
            sessions_completed: self.sessions_completed,
            total_turns: self.total_turns,
            average_confidence: self.average_confidence,
            average_clarity: self.average_clarity,
            unique_topics: self.unique_topics,
            consecutive_days: self.consecutive_days,
        })
    }
}

// ==================== Queries ====================

fn select_review_item_by_id(conn: &Connection, id: Uuid) -> Result<Option<ReviewItem>> {
    conn.query_row(
        &format!("SELECT {} FROM review_items WHERE id = ?1", REVIEW_COLUMNS),
        params![id.to_string()],
        ReviewRow::read,
    )
    .optional()?
    .map(ReviewRow::into_item)
    .transpose()
}

fn select_review_item_by_topic(
    conn: &Connection,
    user_id: &str,
    topic: &str,
) -> Result<Option<ReviewItem>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM review_items WHERE user_id = ?1 AND topic = ?2",
            REVIEW_COLUMNS
        ),
        params![user_id, topic],
        ReviewRow::read,
    )
    .optional()?
    .map(ReviewRow::into_item)
    .transpose()
}

fn write_review_item(tx: &Transaction<'_>, item: &ReviewItem) -> Result<()> {
    tx.execute(
        &format!(
            "INSERT OR REPLACE INTO review_items ({}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            REVIEW_COLUMNS
        ),
        params![
            item.id.to_string(),
            item.user_id,
            item.topic,
            item.easiness_factor,
            item.repetition_number,
            item.interval_days,
            item.last_reviewed.map(to_millis),
            to_millis(item.next_review),
            item.review_count,
            item.average_quality,
            to_millis(item.created_at),
        ],
    )?;
    Ok(())
}

fn select_node_by_topic(
    conn: &Connection,
    user_id: &str,
    topic: &str,
) -> Result<Option<KnowledgeNode>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM knowledge_nodes WHERE user_id = ?1 AND topic = ?2",
            NODE_COLUMNS
        ),
        params![user_id, topic],
        NodeRow::read,
    )
    .optional()?
    .map(NodeRow::into_node)
    .transpose()
}

fn select_edge(conn: &Connection, from_node: Uuid, to_node: Uuid) -> Result<Option<KnowledgeEdge>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM knowledge_edges WHERE from_node = ?1 AND to_node = ?2",
            EDGE_COLUMNS
        ),
        params![from_node.to_string(), to_node.to_string()],
        EdgeRow::read,
    )
    .optional()?
    .map(EdgeRow::into_edge)
    .transpose()
}

fn select_progress(conn: &Connection, user_id: &str, date: NaiveDate) -> Result<Option<DailyProgress>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM daily_progress WHERE user_id = ?1 AND date = ?2",
            PROGRESS_COLUMNS
        ),
        params![user_id, date.format(DATE_FORMAT).to_string()],
        ProgressRow::read,
    )
    .optional()?
    .map(ProgressRow::into_progress)
    .transpose()
}

fn select_sessions_on(conn: &Connection, user_id: &str, date: NaiveDate) -> Result<Vec<SessionRecord>> {
    let (start, end) = day_bounds(date);
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM sessions \
         WHERE user_id = ?1 AND completed_at >= ?2 AND completed_at < ?3 \
         ORDER BY completed_at",
        SESSION_COLUMNS
    ))?;

    let rows = stmt
        .query_map(params![user_id, start, end], SessionRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(SessionRow::into_session).collect()
}

impl ReviewStore for SqliteStorage {
    fn insert_review_item_if_absent(&self, item: ReviewItem) -> Result<ReviewItem> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if let Some(existing) = select_review_item_by_topic(&tx, &item.user_id, &item.topic)? {
            return Ok(existing);
        }

        write_review_item(&tx, &item)?;
        let stored = select_review_item_by_id(&tx, item.id)?
            .ok_or_else(|| StorageError::Corrupt(format!("review item {} vanished", item.id)))?;

        tx.commit()?;
        Ok(stored)
    }

    fn get_review_item(&self, id: Uuid) -> Result<Option<ReviewItem>> {
        let conn = self.lock()?;
        select_review_item_by_id(&conn, id)
    }

    fn find_review_item(&self, user_id: &str, topic: &str) -> Result<Option<ReviewItem>> {
        let conn = self.lock()?;
        select_review_item_by_topic(&conn, user_id, topic)
    }

    fn update_review_item(
        &self,
        id: Uuid,
        update: &mut dyn FnMut(&ReviewItem) -> ReviewItem,
    ) -> Result<Option<ReviewItem>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some(current) = select_review_item_by_id(&tx, id)? else {
            return Ok(None);
        };

        let mut updated = update(&current);
        updated.id = current.id;
        write_review_item(&tx, &updated)?;

        let stored = select_review_item_by_id(&tx, id)?;
        tx.commit()?;
        Ok(stored)
    }

    fn list_review_items(&self, user_id: &str) -> Result<Vec<ReviewItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM review_items WHERE user_id = ?1 ORDER BY next_review, topic",
            REVIEW_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![user_id], ReviewRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(ReviewRow::into_item).collect()
    }

    fn list_review_items_due_between(
        &self,
        user_id: &str,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReviewItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM review_items \
             WHERE user_id = ?1 AND (?2 IS NULL OR next_review > ?2) AND next_review <= ?3 \
             ORDER BY next_review, topic",
            REVIEW_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![user_id, after.map(to_millis), to_millis(until)],
                ReviewRow::read,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(ReviewRow::into_item).collect()
    }
}

impl KnowledgeStore for SqliteStorage {
    fn upsert_knowledge_node(
        &self,
        user_id: &str,
        topic: &str,
        update: &mut dyn FnMut(Option<&KnowledgeNode>) -> KnowledgeNode,
    ) -> Result<KnowledgeNode> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current = select_node_by_topic(&tx, user_id, topic)?;
        let mut node = update(current.as_ref());
        if let Some(current) = &current {
            node.id = current.id;
        }

        tx.execute(
            &format!(
                "INSERT INTO knowledge_nodes ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
                 ON CONFLICT(id) DO UPDATE SET \
                    times_taught = excluded.times_taught, \
                    average_confidence = excluded.average_confidence, \
                    average_clarity = excluded.average_clarity, \
                    first_taught = excluded.first_taught, \
                    last_taught = excluded.last_taught, \
                    related_concepts = excluded.related_concepts, \
                    persistent_gaps = excluded.persistent_gaps, \
                    recurring_jargon = excluded.recurring_jargon",
                NODE_COLUMNS
            ),
            params![
                node.id.to_string(),
                node.user_id,
                node.topic,
                node.times_taught,
                node.average_confidence,
                node.average_clarity,
                to_millis(node.first_taught),
                to_millis(node.last_taught),
                to_json_list(&node.related_concepts)?,
                to_json_list(&node.persistent_gaps)?,
                to_json_list(&node.recurring_jargon)?,
            ],
        )?;

        let stored = select_node_by_topic(&tx, &node.user_id, &node.topic)?
            .ok_or_else(|| StorageError::Corrupt(format!("knowledge node {} vanished", node.id)))?;

        tx.commit()?;
        Ok(stored)
    }

    fn get_knowledge_node(&self, user_id: &str, topic: &str) -> Result<Option<KnowledgeNode>> {
        let conn = self.lock()?;
        select_node_by_topic(&conn, user_id, topic)
    }

    fn list_knowledge_nodes(&self, user_id: &str) -> Result<Vec<KnowledgeNode>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM knowledge_nodes WHERE user_id = ?1 ORDER BY first_taught, topic",
            NODE_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![user_id], NodeRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(NodeRow::into_node).collect()
    }

    fn upsert_knowledge_edge(
        &self,
        from_node: Uuid,
        to_node: Uuid,
        update: &mut dyn FnMut(Option<&KnowledgeEdge>) -> KnowledgeEdge,
    ) -> Result<KnowledgeEdge> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current = select_edge(&tx, from_node, to_node)?;
        let mut edge = update(current.as_ref());
        if let Some(current) = &current {
            edge.id = current.id;
        }
        edge.from_node = from_node;
        edge.to_node = to_node;

        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO knowledge_edges ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                EDGE_COLUMNS
            ),
            params![
                edge.id.to_string(),
                edge.from_node.to_string(),
                edge.to_node.to_string(),
                edge.relationship.as_str(),
                edge.strength,
                to_millis(edge.created_at),
            ],
        )?;

        let stored = select_edge(&tx, from_node, to_node)?
            .ok_or_else(|| StorageError::Corrupt(format!("knowledge edge {} vanished", edge.id)))?;

        tx.commit()?;
        Ok(stored)
    }

    fn list_knowledge_edges(&self, user_id: &str) -> Result<Vec<KnowledgeEdge>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT e.id, e.from_node, e.to_node, e.relationship, e.strength, e.created_at
            FROM knowledge_edges e
            JOIN knowledge_nodes n ON e.from_node = n.id
            WHERE n.user_id = ?1
            ORDER BY e.created_at, e.id
            "#,
        )?;

        let rows = stmt
            .query_map(params![user_id], EdgeRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(EdgeRow::into_edge).collect()
    }
}

impl ProgressStore for SqliteStorage {
    fn insert_session(&self, session: &SessionRecord, turns: &[TurnAnalysis]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                SESSION_COLUMNS
            ),
            params![
                session.id.to_string(),
                session.user_id,
                session.topic,
                session.turn_count,
                session.average_confidence,
                session.average_clarity,
                to_json_list(&session.knowledge_gaps)?,
                to_millis(session.completed_at),
            ],
        )?;

        for (index, turn) in turns.iter().enumerate() {
            tx.execute(
                "INSERT INTO session_turns \
                 (session_id, turn_number, confidence, clarity, knowledge_gaps, unexplained_jargon, strengths) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session.id.to_string(),
                    index as i64 + 1,
                    turn.confidence,
                    turn.clarity,
                    to_json_list(&turn.knowledge_gaps)?,
                    to_json_list(&turn.unexplained_jargon)?,
                    to_json_list(&turn.strengths)?,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
            params![id.to_string()],
            SessionRow::read,
        )
        .optional()?
        .map(SessionRow::into_session)
        .transpose()
    }

    fn list_sessions(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<SessionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE user_id = ?1 \
             ORDER BY completed_at DESC, id LIMIT ?2",
            SESSION_COLUMNS
        ))?;

        // A negative LIMIT means no limit
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let rows = stmt
            .query_map(params![user_id, limit], SessionRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(SessionRow::into_session).collect()
    }

    fn list_session_turns(&self, session_id: Uuid) -> Result<Vec<TurnAnalysis>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT confidence, clarity, knowledge_gaps, unexplained_jargon, strengths \
             FROM session_turns WHERE session_id = ?1 ORDER BY turn_number",
        )?;

        let rows = stmt
            .query_map(params![session_id.to_string()], TurnRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(TurnRow::into_turn).collect()
    }

    fn refresh_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
        compute: &mut dyn FnMut(&[SessionRecord], Option<&DailyProgress>) -> DailyProgress,
    ) -> Result<DailyProgress> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let sessions = select_sessions_on(&tx, user_id, date)?;
        let previous = match date.pred_opt() {
            Some(day) => select_progress(&tx, user_id, day)?,
            None => None,
        };

        let progress = compute(&sessions, previous.as_ref());
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO daily_progress ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                PROGRESS_COLUMNS
            ),
            params![
                user_id,
                date.format(DATE_FORMAT).to_string(),
                progress.sessions_completed,
                progress.total_turns,
                progress.average_confidence,
                progress.average_clarity,
                progress.unique_topics,
                progress.consecutive_days,
            ],
        )?;

        let stored = select_progress(&tx, user_id, date)?
            .ok_or_else(|| StorageError::Corrupt(format!("progress for {} vanished", date)))?;

        tx.commit()?;
        Ok(stored)
    }

    fn list_daily_progress(&self, user_id: &str, since: NaiveDate) -> Result<Vec<DailyProgress>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM daily_progress WHERE user_id = ?1 AND date >= ?2 ORDER BY date",
            PROGRESS_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![user_id, since.format(DATE_FORMAT).to_string()],
                ProgressRow::read,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(ProgressRow::into_progress).collect()
    }

    fn latest_daily_progress(&self, user_id: &str) -> Result<Option<DailyProgress>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM daily_progress WHERE user_id = ?1 ORDER BY date DESC LIMIT 1",
                PROGRESS_COLUMNS
            ),
            params![user_id],
            ProgressRow::read,
        )
        .optional()?
        .map(ProgressRow::into_progress)
        .transpose()
    }
}
