use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, rule, truncate, Color};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let graph = app.graph()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&graph)?);
        }
        OutputFormat::Plain => {
            if graph.is_empty() {
                println!("No topics taught yet.");
                return Ok(());
            }

            let topic_w = graph
                .nodes
                .iter()
                .map(|n| n.topic.chars().count())
                .max()
                .unwrap_or(5)
                .clamp(5, 40);

            println!(
                "{:<topic_w$} {:<6} {:<7} {:<8} {}",
                "Topic", "Taught", "Conf", "Mastery", "Gaps",
                topic_w = topic_w
            );
            println!("{}", rule(&[topic_w, 6, 7, 8, 20]));

            for node in &graph.nodes {
                let mastery = format!("{:<8}", node.mastery().as_str());
                println!(
                    "{:<topic_w$} {:<6} {:<7} {} {}",
                    truncate(&node.topic, topic_w),
                    node.times_taught,
                    format!("{:.0}%", node.average_confidence * 100.0),
                    paint(&mastery, Color::DIM, use_color),
                    node.persistent_gaps.len(),
                    topic_w = topic_w
                );
            }

            if !graph.edges.is_empty() {
                println!("\nLinks");
                for edge in &graph.edges {
                    let from = graph.node(edge.from_node).map_or("?", |n| n.topic.as_str());
                    let to = graph.node(edge.to_node).map_or("?", |n| n.topic.as_str());
                    println!(
                        "  {} -[{}]-> {} ({:.1})",
                        from, edge.relationship, to, edge.strength
                    );
                }
            }
        }
    }

    Ok(())
}
