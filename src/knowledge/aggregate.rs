//! Bookkeeping for repeated teaching of the same topic
//!
//! Pure functions: callers pass in what is stored, get back what should be
//! stored. Averages are running means over every session; string lists are
//! unions that keep first-seen order.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{
    KnowledgeEdge, KnowledgeNode, Relationship, TeachingObservation, EDGE_STRENGTH_STEP,
    MAX_EDGE_STRENGTH,
};

/// Append entries not already present, skipping blanks
pub fn merge_unique(existing: &mut Vec<String>, incoming: &[String]) {
    for entry in incoming {
        let entry = entry.trim();
        if entry.is_empty() || existing.iter().any(|e| e == entry) {
            continue;
        }
        existing.push(entry.to_string());
    }
}

/// Incremental mean after adding the `count`-th sample
fn running_mean(mean: f64, count: u32, sample: f64) -> f64 {
    (mean * f64::from(count - 1) + sample) / f64::from(count)
}

/// Fold one session's observation into a topic's node
pub fn apply_observation(
    current: Option<&KnowledgeNode>,
    user_id: &str,
    topic: &str,
    observation: &TeachingObservation,
    now: DateTime<Utc>,
) -> KnowledgeNode {
    let mut node = current
        .cloned()
        .unwrap_or_else(|| KnowledgeNode::new(user_id.to_string(), topic.to_string(), now));

    node.times_taught += 1;
    node.average_confidence =
        running_mean(node.average_confidence, node.times_taught, observation.confidence);
    node.average_clarity = running_mean(node.average_clarity, node.times_taught, observation.clarity);
    node.last_taught = now;

    let related: Vec<String> = observation
        .related_concepts
        .iter()
        .filter(|c| !c.trim().eq_ignore_ascii_case(topic.trim()))
        .cloned()
        .collect();
    merge_unique(&mut node.related_concepts, &related);
    merge_unique(&mut node.persistent_gaps, &observation.knowledge_gaps);
    merge_unique(&mut node.recurring_jargon, &observation.unexplained_jargon);

    node
}

/// A new edge, or the existing one made stronger
pub fn strengthen_edge(
    current: Option<&KnowledgeEdge>,
    from_node: Uuid,
    to_node: Uuid,
    relationship: Relationship,
    now: DateTime<Utc>,
) -> KnowledgeEdge {
    match current {
        Some(edge) => KnowledgeEdge {
            strength: (edge.strength + EDGE_STRENGTH_STEP).min(MAX_EDGE_STRENGTH),
            ..edge.clone()
        },
        None => KnowledgeEdge::new(from_node, to_node, relationship, now),
    }
}
