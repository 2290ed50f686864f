use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, rule, truncate, Color};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let stats = app.statistics()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Plain => {
            let due = stats.items_due_now.to_string();
            let due = if stats.items_due_now > 0 {
                paint(&due, Color::YELLOW, use_color)
            } else {
                due
            };
            println!("Due now:       {}", due);
            println!("Next 7 days:   {}", stats.items_next_7_days);
            println!("Next 30 days:  {}", stats.items_next_30_days);

            if !stats.most_urgent.is_empty() {
                println!("\n{:<40} {}", "Most urgent", "Days overdue");
                println!("{}", rule(&[40, 12]));
                for urgent in &stats.most_urgent {
                    println!("{:<40} {}", truncate(&urgent.topic, 40), urgent.days_overdue);
                }
            }
        }
    }

    Ok(())
}
