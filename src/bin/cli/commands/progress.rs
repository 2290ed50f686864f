use anyhow::Result;
use serde_json::json;

use crate::app::App;
use crate::render::terminal::{paint, rule, Color};
use crate::OutputFormat;

pub fn run(app: &App, days: u32, format: &OutputFormat, use_color: bool) -> Result<()> {
    let stats = app.progress_stats()?;
    let history = app.progress_history(days)?;

    match format {
        OutputFormat::Json => {
            let output = json!({
                "stats": stats,
                "history": history,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if stats.total_sessions == 0 {
                println!("No sessions recorded yet.");
                return Ok(());
            }

            let streak = format!("{} days", stats.current_streak);
            let streak = if stats.current_streak > 0 {
                paint(&streak, Color::GREEN, use_color)
            } else {
                streak
            };
            println!("Sessions:      {}", stats.total_sessions);
            println!("Turns:         {}", stats.total_turns);
            println!("Topics:        {}", stats.unique_topics);
            println!("Confidence:    {:.0}%", stats.average_confidence * 100.0);
            println!("Clarity:       {:.0}%", stats.average_clarity * 100.0);
            println!("Streak:        {}", streak);

            if history.is_empty() {
                println!("\nNo sessions in the last {} days.", days);
                return Ok(());
            }

            println!(
                "\n{:<10} {:>8} {:>5} {:>6} {:>10} {:>7} {:>6}",
                "Date", "Sessions", "Turns", "Topics", "Confidence", "Clarity", "Streak"
            );
            println!("{}", rule(&[10, 8, 5, 6, 10, 7, 6]));
            for day in &history {
                println!(
                    "{:<10} {:>8} {:>5} {:>6} {:>9.0}% {:>6.0}% {:>6}",
                    day.date.format("%Y-%m-%d"),
                    day.sessions_completed,
                    day.total_turns,
                    day.unique_topics,
                    day.average_confidence * 100.0,
                    day.average_clarity * 100.0,
                    day.consecutive_days
                );
            }
        }
    }

    Ok(())
}
