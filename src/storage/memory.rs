//! In-memory storage backend

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{
    sort_by_next_review, sort_newest_first, KnowledgeStore, ProgressStore, Result, ReviewStore,
    StorageError,
};
use crate::knowledge::{KnowledgeEdge, KnowledgeNode};
use crate::progress::{DailyProgress, SessionRecord};
use crate::review::ReviewItem;
use crate::session::TurnAnalysis;

#[derive(Default)]
struct Tables {
    review_items: HashMap<Uuid, ReviewItem>,
    knowledge_nodes: HashMap<Uuid, KnowledgeNode>,
    knowledge_edges: HashMap<(Uuid, Uuid), KnowledgeEdge>,
    sessions: HashMap<Uuid, SessionRecord>,
    session_turns: HashMap<Uuid, Vec<TurnAnalysis>>,
    daily_progress: HashMap<(String, NaiveDate), DailyProgress>,
}

/// Storage that lives only as long as the process
///
/// A single lock covers all tables; each call holds it for its whole
/// read-modify-write.
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl ReviewStore for MemoryStorage {
    fn insert_review_item_if_absent(&self, item: ReviewItem) -> Result<ReviewItem> {
        let mut tables = self.lock()?;

        if let Some(existing) = tables
            .review_items
            .values()
            .find(|i| i.user_id == item.user_id && i.topic == item.topic)
        {
            return Ok(existing.clone());
        }

        tables.review_items.insert(item.id, item.clone());
        Ok(item)
    }

    fn get_review_item(&self, id: Uuid) -> Result<Option<ReviewItem>> {
        Ok(self.lock()?.review_items.get(&id).cloned())
    }

    fn find_review_item(&self, user_id: &str, topic: &str) -> Result<Option<ReviewItem>> {
        Ok(self
            .lock()?
            .review_items
            .values()
            .find(|i| i.user_id == user_id && i.topic == topic)
            .cloned())
    }

    fn update_review_item(
        &self,
        id: Uuid,
        update: &mut dyn FnMut(&ReviewItem) -> ReviewItem,
    ) -> Result<Option<ReviewItem>> {
        let mut tables = self.lock()?;

        let Some(current) = tables.review_items.get_mut(&id) else {
            return Ok(None);
        };

        let updated = update(current);
        *current = updated.clone();
        Ok(Some(updated))
    }

    fn list_review_items(&self, user_id: &str) -> Result<Vec<ReviewItem>> {
        let mut items: Vec<ReviewItem> = self
            .lock()?
            .review_items
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();

        sort_by_next_review(&mut items);
        Ok(items)
    }

    fn list_review_items_due_between(
        &self,
        user_id: &str,
        after: Option<DateTime<Utc>>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ReviewItem>> {
        let mut items: Vec<ReviewItem> = self
            .lock()?
            .review_items
            .values()
            .filter(|i| i.user_id == user_id)
            .filter(|i| after.map_or(true, |after| i.next_review > after))
            .filter(|i| i.next_review <= until)
            .cloned()
            .collect();

        sort_by_next_review(&mut items);
        Ok(items)
    }
}

impl KnowledgeStore for MemoryStorage {
    fn upsert_knowledge_node(
        &self,
        user_id: &str,
        topic: &str,
        update: &mut dyn FnMut(Option<&KnowledgeNode>) -> KnowledgeNode,
    ) -> Result<KnowledgeNode> {
        let mut tables = self.lock()?;

        let current = tables
            .knowledge_nodes
            .values()
            .find(|n| n.user_id == user_id && n.topic == topic);

        let mut node = update(current);
        if let Some(current) = current {
            node.id = current.id;
        }

        tables.knowledge_nodes.insert(node.id, node.clone());
        Ok(node)
    }

    fn get_knowledge_node(&self, user_id: &str, topic: &str) -> Result<Option<KnowledgeNode>> {
        Ok(self
            .lock()?
            .knowledge_nodes
            .values()
            .find(|n| n.user_id == user_id && n.topic == topic)
            .cloned())
    }

    fn list_knowledge_nodes(&self, user_id: &str) -> Result<Vec<KnowledgeNode>> {
        let mut nodes: Vec<KnowledgeNode> = self
            .lock()?
            .knowledge_nodes
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();

        nodes.sort_by(|a, b| {
            a.first_taught
                .cmp(&b.first_taught)
                .then_with(|| a.topic.cmp(&b.topic))
        });
        Ok(nodes)
    }

    fn upsert_knowledge_edge(
        &self,
        from_node: Uuid,
        to_node: Uuid,
        update: &mut dyn FnMut(Option<&KnowledgeEdge>) -> KnowledgeEdge,
    ) -> Result<KnowledgeEdge> {
        let mut tables = self.lock()?;

        let current = tables.knowledge_edges.get(&(from_node, to_node));
        let mut edge = update(current);
        if let Some(current) = current {
            edge.id = current.id;
        }
        edge.from_node = from_node;
        edge.to_node = to_node;

        tables
            .knowledge_edges
            .insert((from_node, to_node), edge.clone());
        Ok(edge)
    }

    fn list_knowledge_edges(&self, user_id: &str) -> Result<Vec<KnowledgeEdge>> {
        let tables = self.lock()?;

        let mut edges: Vec<KnowledgeEdge> = tables
            .knowledge_edges
            .values()
            .filter(|e| {
                tables
                    .knowledge_nodes
                    .get(&e.from_node)
                    .map_or(false, |n| n.user_id == user_id)
            })
            .cloned()
            .collect();

        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(edges)
    }
}

impl ProgressStore for MemoryStorage {
    fn insert_session(&self, session: &SessionRecord, turns: &[TurnAnalysis]) -> Result<()> {
        let mut tables = self.lock()?;
        tables.sessions.insert(session.id, session.clone());
        tables.session_turns.insert(session.id, turns.to_vec());
        Ok(())
    }

    fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    fn list_sessions(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<SessionRecord>> {
        let mut sessions: Vec<SessionRecord> = self
            .lock()?
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();

        sort_newest_first(&mut sessions);
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    fn list_session_turns(&self, session_id: Uuid) -> Result<Vec<TurnAnalysis>> {
        Ok(self
            .lock()?
            .session_turns
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    fn refresh_daily_progress(
        &self,
        user_id: &str,
        date: NaiveDate,
        compute: &mut dyn FnMut(&[SessionRecord], Option<&DailyProgress>) -> DailyProgress,
    ) -> Result<DailyProgress> {
        let mut tables = self.lock()?;

        let mut sessions: Vec<SessionRecord> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.completed_at.date_naive() == date)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));

        let previous = date
            .pred_opt()
            .and_then(|d| tables.daily_progress.get(&(user_id.to_string(), d)));

        let mut progress = compute(&sessions, previous);
        progress.user_id = user_id.to_string();
        progress.date = date;

        tables
            .daily_progress
            .insert((user_id.to_string(), date), progress.clone());
        Ok(progress)
    }

    fn list_daily_progress(&self, user_id: &str, since: NaiveDate) -> Result<Vec<DailyProgress>> {
        let mut rows: Vec<DailyProgress> = self
            .lock()?
            .daily_progress
            .values()
            .filter(|p| p.user_id == user_id && p.date >= since)
            .cloned()
            .collect();

        rows.sort_by_key(|p| p.date);
        Ok(rows)
    }

    fn latest_daily_progress(&self, user_id: &str) -> Result<Option<DailyProgress>> {
        Ok(self
            .lock()?
            .daily_progress
            .values()
            .filter(|p| p.user_id == user_id)
            .max_by_key(|p| p.date)
            .cloned())
    }
}
