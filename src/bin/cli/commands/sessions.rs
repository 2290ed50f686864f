use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, rule, truncate, Color};
use crate::OutputFormat;

pub fn run(app: &App, limit: usize, format: &OutputFormat, use_color: bool) -> Result<()> {
    let sessions = app.sessions(limit)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        OutputFormat::Plain => {
            if sessions.is_empty() {
                println!("No sessions recorded yet.");
                return Ok(());
            }

            let topic_w = sessions
                .iter()
                .map(|s| s.topic.chars().count())
                .max()
                .unwrap_or(5)
                .clamp(5, 40);

            println!(
                "{:<16} {:<topic_w$} {:>5} {:>10} {:>7} {}",
                "Completed", "Topic", "Turns", "Confidence", "Clarity", "Gaps",
                topic_w = topic_w
            );
            println!("{}", rule(&[16, topic_w, 5, 10, 7, 4]));

            for session in &sessions {
                let gaps = session.knowledge_gaps.len().to_string();
                let gaps = if session.knowledge_gaps.is_empty() {
                    gaps
                } else {
                    paint(&gaps, Color::YELLOW, use_color)
                };
                println!(
                    "{:<16} {:<topic_w$} {:>5} {:>9.0}% {:>6.0}% {}",
                    session.completed_at.format("%Y-%m-%d %H:%M"),
                    truncate(&session.topic, topic_w),
                    session.turn_count,
                    session.average_confidence * 100.0,
                    session.average_clarity * 100.0,
                    gaps,
                    topic_w = topic_w
                );
            }
        }
    }

    Ok(())
}
