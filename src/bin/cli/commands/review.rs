use anyhow::Result;

use teachback_lib::review::{format_interval, preview_intervals, Quality};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, item: &str, quality: i64, format: &OutputFormat, use_color: bool) -> Result<()> {
    let before = app.find_item(item)?;
    let after = app.record_review(before.id, quality)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "item": after,
                "previousIntervalDays": before.interval_days,
                "previousEasinessFactor": before.easiness_factor,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            let label = Quality::new(quality).map(|q| q.label()).unwrap_or("?");
            println!("{} ({} - {})", paint(&after.topic, Color::BOLD, use_color), quality, label);
            println!(
                "  Interval:  {} -> {}",
                format_interval(before.interval_days),
                format_interval(after.interval_days)
            );
            println!(
                "  Easiness:  {:.2} -> {:.2}",
                before.easiness_factor, after.easiness_factor
            );
            println!("  Next due:  {}", after.next_review.format("%Y-%m-%d"));

            let preview = preview_intervals(&after)
                .iter()
                .enumerate()
                .map(|(q, days)| format!("{}:{}", q, format_interval(*days)))
                .collect::<Vec<_>>()
                .join("  ");
            println!("{}", paint(&format!("  Next time: {}", preview), Color::DIM, use_color));
        }
    }

    Ok(())
}
