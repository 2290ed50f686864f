//! Progress arithmetic over stored sessions
//!
//! Nothing here touches storage; the tracker hands these functions the
//! rows it loaded (or the rows a store loaded inside its transaction).

use std::collections::HashSet;

use chrono::NaiveDate;

use super::models::{DailyProgress, ProgressStats, SessionRecord};

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.sum::<f64>() / len as f64
}

fn unique_topics(sessions: &[SessionRecord]) -> u32 {
    let topics: HashSet<&str> = sessions.iter().map(|s| s.topic.as_str()).collect();
    topics.len() as u32
}

/// Consecutive days with sessions, ending on `date`
///
/// The previous row only extends the streak when it is for the day right
/// before `date` and had sessions of its own.
pub fn streak_on(date: NaiveDate, sessions_today: u32, previous_day: Option<&DailyProgress>) -> u32 {
    if sessions_today == 0 {
        return 0;
    }
    match previous_day {
        Some(prev) if prev.sessions_completed > 0 && date.pred_opt() == Some(prev.date) => {
            prev.consecutive_days + 1
        }
        _ => 1,
    }
}

/// Build a day's progress row from that day's sessions
pub fn summarize_day(
    user_id: &str,
    date: NaiveDate,
    sessions: &[SessionRecord],
    previous_day: Option<&DailyProgress>,
) -> DailyProgress {
    let sessions_completed = sessions.len() as u32;

    DailyProgress {
        user_id: user_id.to_string(),
        date,
        sessions_completed,
        total_turns: sessions.iter().map(|s| s.turn_count).sum(),
        average_confidence: mean(sessions.iter().map(|s| s.average_confidence)),
        average_clarity: mean(sessions.iter().map(|s| s.average_clarity)),
        unique_topics: unique_topics(sessions),
        consecutive_days: streak_on(date, sessions_completed, previous_day),
    }
}

/// Streak still running on `today`
///
/// A streak whose last day is yesterday has not been broken yet.
pub fn current_streak(latest: Option<&DailyProgress>, today: NaiveDate) -> u32 {
    match latest {
        Some(day)
            if day.sessions_completed > 0
                && (day.date == today || Some(day.date) == today.pred_opt()) =>
        {
            day.consecutive_days
        }
        _ => 0,
    }
}

/// Lifetime totals over every session a user has completed
pub fn summarize_history(
    sessions: &[SessionRecord],
    latest: Option<&DailyProgress>,
    today: NaiveDate,
) -> ProgressStats {
    ProgressStats {
        total_sessions: sessions.len() as u32,
        total_turns: sessions.iter().map(|s| s.turn_count).sum(),
        average_confidence: mean(sessions.iter().map(|s| s.average_confidence)),
        average_clarity: mean(sessions.iter().map(|s| s.average_clarity)),
        unique_topics: unique_topics(sessions),
        current_streak: current_streak(latest, today),
        last_session: sessions.iter().map(|s| s.completed_at).max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn session(topic: &str, turns: u32, confidence: f64, clarity: f64, d: u32) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            topic: topic.to_string(),
            turn_count: turns,
            average_confidence: confidence,
            average_clarity: clarity,
            knowledge_gaps: Vec::new(),
            completed_at: Utc.with_ymd_and_hms(2026, 3, d, 20, 0, 0).unwrap(),
        }
    }

    fn progress(date: NaiveDate, sessions_completed: u32, consecutive_days: u32) -> DailyProgress {
        DailyProgress {
            user_id: "u1".to_string(),
            date,
            sessions_completed,
            total_turns: sessions_completed,
            average_confidence: 0.5,
            average_clarity: 0.5,
            unique_topics: sessions_completed,
            consecutive_days,
        }
    }

    #[test]
    fn test_summarize_day() {
        let sessions = vec![
            session("Queues", 3, 0.6, 0.8, 2),
            session("Stacks", 2, 0.8, 0.4, 2),
            session("Queues", 1, 0.4, 0.6, 2),
        ];

        let today = summarize_day("u1", day(2), &sessions, None);
        assert_eq!(today.sessions_completed, 3);
        assert_eq!(today.total_turns, 6);
        assert!((today.average_confidence - 0.6).abs() < 1e-9);
        assert!((today.average_clarity - 0.6).abs() < 1e-9);
        assert_eq!(today.unique_topics, 2);
        assert_eq!(today.consecutive_days, 1);
    }

    #[test]
    fn test_streak_grows_only_from_yesterday() {
        assert_eq!(streak_on(day(5), 1, Some(&progress(day(4), 2, 3))), 4);
        // A gap day resets the streak
        assert_eq!(streak_on(day(5), 1, Some(&progress(day(3), 2, 3))), 1);
        // A row for yesterday without sessions does not count
        assert_eq!(streak_on(day(5), 1, Some(&progress(day(4), 0, 0))), 1);
        assert_eq!(streak_on(day(5), 1, None), 1);
        assert_eq!(streak_on(day(5), 0, Some(&progress(day(4), 2, 3))), 0);
    }

    #[test]
    fn test_current_streak_survives_until_a_day_is_missed() {
        let latest = progress(day(10), 1, 6);
        assert_eq!(current_streak(Some(&latest), day(10)), 6);
        assert_eq!(current_streak(Some(&latest), day(11)), 6);
        assert_eq!(current_streak(Some(&latest), day(12)), 0);
        assert_eq!(current_streak(None, day(12)), 0);
    }

    #[test]
    fn test_summarize_history() {
        let sessions = vec![
            session("Queues", 3, 1.0, 0.5, 1),
            session("Stacks", 1, 0.5, 0.5, 4),
            session("Stacks", 2, 0.0, 0.2, 4),
        ];

        let stats = summarize_history(&sessions, Some(&progress(day(4), 2, 1)), day(4));
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_turns, 6);
        assert!((stats.average_confidence - 0.5).abs() < 1e-9);
        assert!((stats.average_clarity - 0.4).abs() < 1e-9);
        assert_eq!(stats.unique_topics, 2);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.last_session, Some(sessions[1].completed_at));
    }

    #[test]
    fn test_empty_history() {
        let stats = summarize_history(&[], None, day(1));
        assert_eq!(stats, ProgressStats::default());
    }
}
