use anyhow::Result;

use crate::app::App;
use crate::render::terminal::print_item_table;
use crate::OutputFormat;

pub fn run_due(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let items = app.due()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Plain => {
            if items.is_empty() {
                println!("Nothing due. Well done.");
                return Ok(());
            }
            print_item_table(&items, app.now(), use_color);
            println!("\n{} due", items.len());
        }
    }

    Ok(())
}

pub fn run_upcoming(app: &App, days: u32, format: &OutputFormat, use_color: bool) -> Result<()> {
    let items = app.upcoming(days)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Plain => {
            if items.is_empty() {
                println!("Nothing due in the next {} days.", days);
                return Ok(());
            }
            print_item_table(&items, app.now(), use_color);
            println!("\n{} due in the next {} days", items.len(), days);
        }
    }

    Ok(())
}
