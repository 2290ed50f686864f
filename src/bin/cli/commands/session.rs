use anyhow::Result;

use teachback_lib::review::format_interval;
use teachback_lib::session::{SessionSummary, TurnAnalysis};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

#[allow(clippy::too_many_arguments)]
pub fn run(
    app: &App,
    topic: &str,
    confidence: f64,
    clarity: f64,
    gaps: Vec<String>,
    jargon: Vec<String>,
    related: &[String],
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let summary = SessionSummary::from_turns(&[TurnAnalysis {
        confidence,
        clarity,
        knowledge_gaps: gaps,
        unexplained_jargon: jargon,
        strengths: Vec::new(),
    }])?;
    let outcome = app.complete_session(topic, &summary, related)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Plain => {
            let node = &outcome.node;
            let item = &outcome.review_item;

            println!("{}", paint(&node.topic, Color::BOLD, use_color));
            println!(
                "  Taught {} times, confidence {:.0}%, clarity {:.0}% ({})",
                node.times_taught,
                node.average_confidence * 100.0,
                node.average_clarity * 100.0,
                node.mastery().as_str()
            );
            if !node.persistent_gaps.is_empty() {
                println!(
                    "  {}",
                    paint(
                        &format!("Gaps: {}", node.persistent_gaps.join(", ")),
                        Color::YELLOW,
                        use_color
                    )
                );
            }
            println!(
                "  Next review in {} ({})",
                format_interval(item.interval_days),
                item.next_review.format("%Y-%m-%d")
            );
            if outcome.edges_touched > 0 {
                println!("  Linked to {} known topics", outcome.edges_touched);
            }
            let streak = outcome.progress.consecutive_days;
            println!(
                "  Session {} today, {} day streak",
                outcome.progress.sessions_completed,
                paint(&streak.to_string(), Color::GREEN, use_color && streak > 1)
            );
        }
    }

    Ok(())
}
