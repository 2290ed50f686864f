use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, print_item_table, truncate, Color};
use crate::OutputFormat;

pub fn run(app: &App, days: u32, format: &OutputFormat, use_color: bool) -> Result<()> {
    let schedule = app.schedule(days)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
        OutputFormat::Plain => {
            if schedule.is_empty() {
                println!("No reviews in the next {} days.", days);
                return Ok(());
            }

            if !schedule.overdue.is_empty() {
                println!("{}", paint("Overdue", Color::RED, use_color));
                print_item_table(&schedule.overdue, app.now(), use_color);
                println!();
            }

            for day in &schedule.upcoming {
                println!(
                    "{} ({})",
                    paint(&day.date.format("%a %Y-%m-%d").to_string(), Color::BOLD, use_color),
                    day.items.len()
                );
                for item in &day.items {
                    println!("  {}", truncate(&item.topic, 60));
                }
            }
        }
    }

    Ok(())
}
