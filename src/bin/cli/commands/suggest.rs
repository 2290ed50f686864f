use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{due_label, paint, truncate, Color};
use crate::OutputFormat;

pub fn run(app: &App, max_items: usize, format: &OutputFormat, use_color: bool) -> Result<()> {
    let suggestions = app.suggest(max_items)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
        OutputFormat::Plain => {
            if suggestions.is_empty() {
                println!("Nothing to review right now.");
                return Ok(());
            }

            let now = app.now();
            for (n, suggestion) in suggestions.iter().enumerate() {
                let when = due_label(&suggestion.item, now);
                let when = if suggestion.is_overdue {
                    paint(&when, Color::RED, use_color)
                } else {
                    when
                };
                println!(
                    "{:>2}. {:<40} {}  {}",
                    n + 1,
                    truncate(&suggestion.item.topic, 40),
                    &suggestion.item.id.to_string()[..8],
                    when
                );
            }
        }
    }

    Ok(())
}
