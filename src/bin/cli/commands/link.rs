use anyhow::Result;

use teachback_lib::knowledge::Relationship;

use crate::app::App;
use crate::OutputFormat;

pub fn run(
    app: &App,
    from: &str,
    to: &str,
    relationship: Relationship,
    format: &OutputFormat,
) -> Result<()> {
    let edge = app.link(from, to, relationship)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&edge)?);
        }
        OutputFormat::Plain => {
            println!(
                "{} -[{}]-> {} (strength {:.1})",
                from, edge.relationship, to, edge.strength
            );
        }
    }

    Ok(())
}
