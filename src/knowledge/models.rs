//! Data models for the knowledge graph

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Edge strength for a newly linked pair of topics
pub const DEFAULT_EDGE_STRENGTH: f64 = 1.0;

/// Strength an edge can grow to through repeated linking
pub const MAX_EDGE_STRENGTH: f64 = 2.0;

/// Strength gained each time an existing link is seen again
pub const EDGE_STRENGTH_STEP: f64 = 0.1;

/// A topic a user has taught, with everything learned about it so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeNode {
    pub id: Uuid,
    pub user_id: String,
    pub topic: String,
    pub times_taught: u32,
    pub average_confidence: f64,
    pub average_clarity: f64,
    pub first_taught: DateTime<Utc>,
    pub last_taught: DateTime<Utc>,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    /// Gaps found in any session on this topic
    #[serde(default)]
    pub persistent_gaps: Vec<String>,
    /// Jargon left unexplained in any session on this topic
    #[serde(default)]
    pub recurring_jargon: Vec<String>,
}

impl KnowledgeNode {
    /// An empty node that has not been taught yet
    pub fn new(user_id: String, topic: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            topic,
            times_taught: 0,
            average_confidence: 0.0,
            average_clarity: 0.0,
            first_taught: now,
            last_taught: now,
            related_concepts: Vec::new(),
            persistent_gaps: Vec::new(),
            recurring_jargon: Vec::new(),
        }
    }

    pub fn mastery(&self) -> Mastery {
        Mastery::from_confidence(self.average_confidence)
    }
}

/// Confidence band used when displaying a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mastery {
    /// Below 50% confidence
    Low,
    /// 50% to 75% confidence
    Medium,
    /// 75% confidence and above
    High,
}

impl Mastery {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.75 {
            Self::High
        } else if confidence >= 0.50 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// How one topic relates to another
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Prerequisite,
    #[default]
    RelatedTo,
    PartOf,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prerequisite => "prerequisite",
            Self::RelatedTo => "related_to",
            Self::PartOf => "part_of",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "prerequisite" => Ok(Self::Prerequisite),
            "related_to" | "related" => Ok(Self::RelatedTo),
            "part_of" => Ok(Self::PartOf),
            other => Err(format!("unknown relationship: {}", other)),
        }
    }
}

/// A directed link between two of a user's topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEdge {
    pub id: Uuid,
    pub from_node: Uuid,
    pub to_node: Uuid,
    pub relationship: Relationship,
    pub strength: f64,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeEdge {
    pub fn new(from_node: Uuid, to_node: Uuid, relationship: Relationship, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_node,
            to_node,
            relationship,
            strength: DEFAULT_EDGE_STRENGTH,
            created_at: now,
        }
    }
}

/// What one teaching session revealed about a topic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingObservation {
    pub confidence: f64,
    pub clarity: f64,
    #[serde(default)]
    pub knowledge_gaps: Vec<String>,
    #[serde(default)]
    pub unexplained_jargon: Vec<String>,
    #[serde(default)]
    pub related_concepts: Vec<String>,
}

/// A user's whole knowledge graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraph {
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
}

impl KnowledgeGraph {
    pub fn node(&self, id: Uuid) -> Option<&KnowledgeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
