use serde::{Deserialize, Serialize};

use crate::knowledge::aggregate::merge_unique;
use crate::knowledge::{KnowledgeNode, TeachingObservation};
use crate::progress::{DailyProgress, SessionRecord};
use crate::review::ReviewItem;
use crate::validate;

use super::SessionError;

/// What the analysis of one explanation turn found
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnAnalysis {
    pub confidence: f64,
    pub clarity: f64,
    #[serde(default)]
    pub knowledge_gaps: Vec<String>,
    #[serde(default)]
    pub unexplained_jargon: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
}

/// A whole teaching session folded into one set of scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub turn_count: usize,
    pub confidence: f64,
    pub clarity: f64,
    pub knowledge_gaps: Vec<String>,
    pub unexplained_jargon: Vec<String>,
    pub strengths: Vec<String>,
    /// The turns the summary was folded from
    #[serde(default)]
    pub turns: Vec<TurnAnalysis>,
}

impl SessionSummary {
    /// Average the scores of every turn and merge their findings
    pub fn from_turns(turns: &[TurnAnalysis]) -> Result<Self, SessionError> {
        if turns.is_empty() {
            return Err(SessionError::InvalidArgument(
                "a session needs at least one turn".to_string(),
            ));
        }

        let mut summary = Self {
            turn_count: turns.len(),
            confidence: 0.0,
            clarity: 0.0,
            knowledge_gaps: Vec::new(),
            unexplained_jargon: Vec::new(),
            strengths: Vec::new(),
            turns: turns.to_vec(),
        };

        for (index, turn) in turns.iter().enumerate() {
            validate::unit_score(&format!("turn {} confidence", index + 1), turn.confidence)
                .map_err(SessionError::InvalidArgument)?;
            validate::unit_score(&format!("turn {} clarity", index + 1), turn.clarity)
                .map_err(SessionError::InvalidArgument)?;

            summary.confidence += turn.confidence;
            summary.clarity += turn.clarity;
            merge_unique(&mut summary.knowledge_gaps, &turn.knowledge_gaps);
            merge_unique(&mut summary.unexplained_jargon, &turn.unexplained_jargon);
            merge_unique(&mut summary.strengths, &turn.strengths);
        }

        summary.confidence /= turns.len() as f64;
        summary.clarity /= turns.len() as f64;
        Ok(summary)
    }

    pub fn had_gaps(&self) -> bool {
        !self.knowledge_gaps.is_empty()
    }

    /// The summary as the knowledge graph sees it
    pub fn observation(&self, related_concepts: &[String]) -> TeachingObservation {
        TeachingObservation {
            confidence: self.confidence,
            clarity: self.clarity,
            knowledge_gaps: self.knowledge_gaps.clone(),
            unexplained_jargon: self.unexplained_jargon.clone(),
            related_concepts: related_concepts.to_vec(),
        }
    }
}

/// Everything a completed session changed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub node: KnowledgeNode,
    pub review_item: ReviewItem,
    /// Links created or strengthened to already-known related topics
    pub edges_touched: usize,
    pub session: SessionRecord,
    pub progress: DailyProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(confidence: f64, clarity: f64, gaps: &[&str], strengths: &[&str]) -> TurnAnalysis {
        TurnAnalysis {
            confidence,
            clarity,
            knowledge_gaps: gaps.iter().map(|s| s.to_string()).collect(),
            strengths: strengths.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_averages_and_dedupes() {
        let turns = vec![
            turn(0.4, 0.6, &["base case"], &["good analogy"]),
            turn(0.8, 1.0, &["tail calls", "base case"], &["good analogy", "concise"]),
        ];

        let summary = SessionSummary::from_turns(&turns).unwrap();

        assert_eq!(summary.turn_count, 2);
        assert!((summary.confidence - 0.6).abs() < 1e-9);
        assert!((summary.clarity - 0.8).abs() < 1e-9);
        assert_eq!(summary.knowledge_gaps, vec!["base case", "tail calls"]);
        assert_eq!(summary.strengths, vec!["good analogy", "concise"]);
        assert!(summary.unexplained_jargon.is_empty());
        assert!(summary.had_gaps());
        assert_eq!(summary.turns, turns);
    }

    #[test]
    fn test_empty_session_rejected() {
        assert!(matches!(
            SessionSummary::from_turns(&[]),
            Err(SessionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_out_of_range_turn_rejected() {
        let turns = vec![turn(0.5, 0.5, &[], &[]), turn(0.5, 1.4, &[], &[])];
        assert!(matches!(
            SessionSummary::from_turns(&turns),
            Err(SessionError::InvalidArgument(msg)) if msg.contains("turn 2")
        ));
    }

    #[test]
    fn test_turn_deserializes_without_lists() {
        let turn: TurnAnalysis =
            serde_json::from_str(r#"{"confidence": 0.7, "clarity": 0.9}"#).unwrap();
        assert_eq!(turn.confidence, 0.7);
        assert!(turn.knowledge_gaps.is_empty());
    }
}
