use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, topic: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let item = app.add_topic(topic)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        OutputFormat::Plain => {
            println!(
                "{} {} ({})",
                paint("Reviewing", Color::GREEN, use_color),
                item.topic,
                item.id
            );
            println!("First review: {}", item.next_review.format("%Y-%m-%d %H:%M"));
        }
    }

    Ok(())
}
