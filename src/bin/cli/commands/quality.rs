use anyhow::Result;

use teachback_lib::review::ReviewScheduler;

use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(
    confidence: f64,
    clarity: f64,
    had_gaps: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let quality = ReviewScheduler::derive_quality_from_performance(confidence, clarity, had_gaps);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "quality": quality,
                "label": quality.label(),
                "isPass": quality.is_pass(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            let color = if quality.is_pass() { Color::GREEN } else { Color::RED };
            println!(
                "Quality {} ({})",
                paint(&quality.to_string(), color, use_color),
                quality.label()
            );
        }
    }

    Ok(())
}
