//! Knowledge tracking across teaching sessions

use std::sync::Arc;

use thiserror::Error;

use super::aggregate::{apply_observation, strengthen_edge};
use super::models::*;
use crate::clock::Clock;
use crate::storage::{KnowledgeStore, StorageError};
use crate::validate;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, KnowledgeError>;

/// Builds each user's knowledge graph from teaching sessions
pub struct KnowledgeTracker {
    store: Arc<dyn KnowledgeStore>,
    clock: Arc<dyn Clock>,
}

impl KnowledgeTracker {
    pub fn new(store: Arc<dyn KnowledgeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record that a user taught a topic, creating its node on first use
    pub fn record_teaching(
        &self,
        user_id: &str,
        topic: &str,
        observation: &TeachingObservation,
    ) -> Result<KnowledgeNode> {
        validate::non_empty("user_id", user_id).map_err(KnowledgeError::InvalidArgument)?;
        validate::non_empty("topic", topic).map_err(KnowledgeError::InvalidArgument)?;
        validate::unit_score("confidence", observation.confidence)
            .map_err(KnowledgeError::InvalidArgument)?;
        validate::unit_score("clarity", observation.clarity)
            .map_err(KnowledgeError::InvalidArgument)?;

        let now = self.clock.now();
        let node = self.store.upsert_knowledge_node(user_id, topic, &mut |current| {
            apply_observation(current, user_id, topic, observation, now)
        })?;

        log::info!(
            "Recorded teaching of '{}' for {} (taught {} times, confidence {:.2})",
            topic,
            user_id,
            node.times_taught,
            node.average_confidence
        );
        Ok(node)
    }

    pub fn get_node(&self, user_id: &str, topic: &str) -> Result<Option<KnowledgeNode>> {
        Ok(self.store.get_knowledge_node(user_id, topic)?)
    }

    /// Link two taught topics, strengthening the link if it already exists
    ///
    /// Returns `None` when either topic has no node yet.
    pub fn connect_topics(
        &self,
        user_id: &str,
        from_topic: &str,
        to_topic: &str,
        relationship: Relationship,
    ) -> Result<Option<KnowledgeEdge>> {
        validate::non_empty("user_id", user_id).map_err(KnowledgeError::InvalidArgument)?;
        if from_topic == to_topic {
            return Err(KnowledgeError::InvalidArgument(format!(
                "cannot link '{}' to itself",
                from_topic
            )));
        }

        let Some(from) = self.store.get_knowledge_node(user_id, from_topic)? else {
            log::debug!("No node for '{}', skipping link", from_topic);
            return Ok(None);
        };
        let Some(to) = self.store.get_knowledge_node(user_id, to_topic)? else {
            log::debug!("No node for '{}', skipping link", to_topic);
            return Ok(None);
        };

        let now = self.clock.now();
        let edge = self.store.upsert_knowledge_edge(from.id, to.id, &mut |current| {
            strengthen_edge(current, from.id, to.id, relationship, now)
        })?;

        Ok(Some(edge))
    }

    /// Every node and edge belonging to the user
    pub fn knowledge_graph(&self, user_id: &str) -> Result<KnowledgeGraph> {
        let nodes = self.store.list_knowledge_nodes(user_id)?;
        let edges = self.store.list_knowledge_edges(user_id)?;
        log::debug!(
            "Loaded knowledge graph for {}: {} nodes, {} edges",
            user_id,
            nodes.len(),
            edges.len()
        );
        Ok(KnowledgeGraph { nodes, edges })
    }
}
