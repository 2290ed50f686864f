use chrono::{DateTime, Utc};

use teachback_lib::review::{format_interval, ReviewItem};

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Shorten to `width` characters, ending in "..." when cut
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub fn rule(widths: &[usize]) -> String {
    widths
        .iter()
        .map(|w| "\u{2500}".repeat(*w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Relative due date: "today", "in 3d", "2d overdue"
pub fn due_label(item: &ReviewItem, now: DateTime<Utc>) -> String {
    let overdue = item.days_overdue(now);
    if item.is_due(now) {
        if overdue == 0 {
            "today".to_string()
        } else {
            format!("{}d overdue", overdue)
        }
    } else {
        let until = (item.next_review - now).num_days();
        if until == 0 {
            "later today".to_string()
        } else {
            format!("in {}d", until)
        }
    }
}

/// Review items as an aligned table
pub fn print_item_table(items: &[ReviewItem], now: DateTime<Utc>, use_color: bool) {
    let topic_w = items
        .iter()
        .map(|i| i.topic.chars().count())
        .max()
        .unwrap_or(5)
        .clamp(5, 40);
    let id_w = 8;
    let due_w = 12;

    println!(
        "{:<id_w$} {:<topic_w$} {:<due_w$} {:<5} {:<9} {}",
        "Id", "Topic", "Due", "EF", "Interval", "Reviews",
        id_w = id_w, topic_w = topic_w, due_w = due_w
    );
    println!("{}", rule(&[id_w, topic_w, due_w, 5, 9, 7]));

    for item in items {
        let due = format!("{:<due_w$}", due_label(item, now), due_w = due_w);
        let due = if item.is_due(now) {
            paint(&due, Color::RED, use_color)
        } else {
            due
        };

        println!(
            "{:<id_w$} {:<topic_w$} {} {:<5.2} {:<9} {}",
            &item.id.to_string()[..id_w],
            truncate(&item.topic, topic_w),
            due,
            item.easiness_factor,
            format_interval(item.interval_days),
            item.review_count,
            id_w = id_w, topic_w = topic_w
        );
    }
}
