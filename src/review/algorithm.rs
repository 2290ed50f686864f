//! SM-2 Spaced Repetition Algorithm
//!
//! Implementation of the SuperMemo 2 algorithm for calculating review
//! intervals from recall quality, plus the mapping from teaching-session
//! scores to a quality rating.
//!
//! A review is applied in a fixed order:
//! 1. interval and repetition number, using the easiness factor as it was
//!    before this review
//! 2. easiness factor
//! 3. review dates
//! 4. running statistics

use chrono::{DateTime, Duration, Utc};

use super::models::{Quality, ReviewItem, MIN_EASINESS_FACTOR};

/// Score multiplier applied when a session surfaced knowledge gaps
const GAP_PENALTY: f64 = 0.8;

/// Longest interval a review can schedule, about one hundred years
///
/// Consecutive passes grow the interval geometrically; capping it keeps
/// `next_review` inside the representable date range.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Lower bound of the averaged score for each quality, highest first
const QUALITY_THRESHOLDS: [(f64, u8); 5] = [(0.95, 5), (0.85, 4), (0.70, 3), (0.50, 2), (0.30, 1)];

/// Interval and repetition number after a review
///
/// Uses the pre-review easiness factor for the multiplication. The result
/// never exceeds [`MAX_INTERVAL_DAYS`].
pub fn next_interval(item: &ReviewItem, quality: Quality) -> (u32, u32) {
    if quality.is_pass() {
        let interval = match item.repetition_number {
            0 => 1,
            1 => 6,
            _ => {
                let scaled = (f64::from(item.interval_days) * item.easiness_factor).round();
                scaled.clamp(1.0, f64::from(MAX_INTERVAL_DAYS)) as u32
            }
        };
        (interval, item.repetition_number + 1)
    } else {
        (1, 0)
    }
}

/// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), never below 1.3
pub fn next_easiness_factor(easiness_factor: f64, quality: Quality) -> f64 {
    let distance = f64::from(Quality::MAX - quality.value());
    let ef = easiness_factor + (0.1 - distance * (0.08 + distance * 0.02));
    ef.max(MIN_EASINESS_FACTOR)
}

/// Apply one review to an item, returning the updated copy
pub fn apply_review(item: &ReviewItem, quality: Quality, now: DateTime<Utc>) -> ReviewItem {
    let (interval_days, repetition_number) = next_interval(item, quality);
    let easiness_factor = next_easiness_factor(item.easiness_factor, quality);

    let review_count = item.review_count + 1;
    let total_quality =
        item.average_quality * f64::from(review_count - 1) + f64::from(quality.value());

    ReviewItem {
        easiness_factor,
        repetition_number,
        interval_days,
        last_reviewed: Some(now),
        next_review: now
            .checked_add_signed(Duration::days(i64::from(interval_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        review_count,
        average_quality: total_quality / f64::from(review_count),
        ..item.clone()
    }
}

/// Convert teaching performance into an SM-2 quality rating
///
/// Confidence and clarity are averaged, the average is penalised when gaps
/// were found, and the result is bucketed from the top threshold down.
pub fn derive_quality_from_performance(confidence: f64, clarity: f64, had_gaps: bool) -> Quality {
    let mut score = (confidence + clarity) / 2.0;
    if had_gaps {
        score *= GAP_PENALTY;
    }

    let value = QUALITY_THRESHOLDS
        .iter()
        .find(|(threshold, _)| score >= *threshold)
        .map_or(0, |(_, quality)| *quality);

    Quality(value)
}

/// Interval each quality rating would give, indexed by quality
/// Used to show users what a rating would do before they pick one
pub fn preview_intervals(item: &ReviewItem) -> [u32; 6] {
    let mut intervals = [0; 6];
    for quality in Quality::all() {
        intervals[usize::from(quality.value())] = next_interval(item, quality).0;
    }
    intervals
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
