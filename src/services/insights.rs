use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::daily_log::{DailyLog, Mood};

#[derive(Debug, Serialize)]
pub struct Insights {
    pub dominant_mood: Option<Mood>,
    pub mood_distribution: BTreeMap<Mood, usize>,
    pub total_logs: usize,
    pub patterns: Vec<&'static str>,
    pub recommendations: Vec<&'static str>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

#[derive(Debug, Serialize)]
pub struct TrendAnalysis {
    pub trend: Trend,
    pub recent_average: f64,
    pub older_average: f64,
    pub change: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Rule-based read of a mood history: distribution, dominant mood and a
/// handful of pattern/recommendation strings.
pub fn generate_insights(logs: &[DailyLog]) -> Insights {
    let mut distribution: BTreeMap<Mood, usize> = BTreeMap::new();
    for log in logs {
        *distribution.entry(log.mood).or_insert(0) += 1;
    }

    let total = logs.len();
    let dominant_mood = distribution
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(mood, _)| *mood);

    let mut patterns = Vec::new();
    let mut recommendations = Vec::new();

    let count = |mood: Mood| distribution.get(&mood).copied().unwrap_or(0);

    if count(Mood::Sad) + count(Mood::Terrible) > count(Mood::Happy) + count(Mood::Good) {
        patterns.push("You've been experiencing more challenging emotions lately.");
        recommendations.push("Consider talking to a mental health professional.");
    }
    if total > 0 && count(Mood::Happy) * 10 > total * 6 {
        patterns.push("You've been consistently positive!");
        recommendations.push("Share your positive energy with others.");
    }
    if total < 7 {
        patterns.push("You're just getting started with mood tracking.");
        recommendations.push("Try to log your mood daily for better insights.");
    }

    Insights {
        dominant_mood,
        mood_distribution: distribution,
        total_logs: total,
        patterns,
        recommendations,
    }
}

/// Compare the average mood score of the last seven entries against the rest
/// of the window. Input must be in ascending timestamp order.
pub fn analyze_trend(logs: &[DailyLog]) -> TrendAnalysis {
    if logs.is_empty() {
        return TrendAnalysis {
            trend: Trend::InsufficientData,
            recent_average: 0.0,
            older_average: 0.0,
            change: 0.0,
        };
    }

    let split = logs.len().saturating_sub(7);
    let (older, recent) = logs.split_at(split);

    let average = |slice: &[DailyLog]| {
        slice.iter().map(|l| l.mood.score() as f64).sum::<f64>() / slice.len() as f64
    };

    let recent_average = average(recent);
    let older_average = if older.is_empty() {
        recent_average
    } else {
        average(older)
    };

    let change = recent_average - older_average;
    let trend = if change > f64::EPSILON {
        Trend::Improving
    } else if change < -f64::EPSILON {
        Trend::Declining
    } else {
        Trend::Stable
    };

    TrendAnalysis {
        trend,
        recent_average,
        older_average,
        change,
    }
}

/// Current and longest run of consecutive logged days. `days` must be
/// distinct calendar days in descending order. The current streak counts
/// only if the latest entry is today or yesterday relative to `today`.
pub fn mood_streaks(days: &[NaiveDate], today: NaiveDate) -> Streaks {
    if days.is_empty() {
        return Streaks { current: 0, longest: 0 };
    }

    let mut longest = 1u32;
    let mut run = 1u32;
    for pair in days.windows(2) {
        if pair[0] - pair[1] == chrono::Duration::days(1) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }

    let gap = today - days[0];
    let current = if gap <= chrono::Duration::days(1) {
        let mut current = 1u32;
        for pair in days.windows(2) {
            if pair[0] - pair[1] == chrono::Duration::days(1) {
                current += 1;
            } else {
                break;
            }
        }
        current
    } else {
        0
    };

    Streaks { current, longest }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, Utc};
    use uuid::Uuid;

    fn log(mood: Mood, ts: &str) -> DailyLog {
        let created_at = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
            .expect("valid timestamp")
            .and_utc();
        DailyLog {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            mood,
            notes: String::new(),
            ai_suggestion: None,
            sleep_hours: None,
            energy_level: None,
            stress_level: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_insights_empty_history() {
        let insights = generate_insights(&[]);
        assert_eq!(insights.total_logs, 0);
        assert!(insights.dominant_mood.is_none());
        assert!(insights
            .patterns
            .contains(&"You're just getting started with mood tracking."));
    }

    #[test]
    fn test_insights_flags_difficult_stretch() {
        let logs = vec![
            log(Mood::Sad, "2026-08-01 09:00:00"),
            log(Mood::Terrible, "2026-08-02 09:00:00"),
            log(Mood::Happy, "2026-08-03 09:00:00"),
        ];
        let insights = generate_insights(&logs);
        assert!(insights
            .patterns
            .contains(&"You've been experiencing more challenging emotions lately."));
    }

    #[test]
    fn test_insights_dominant_mood_and_distribution() {
        let logs = vec![
            log(Mood::Good, "2026-08-01 09:00:00"),
            log(Mood::Good, "2026-08-02 09:00:00"),
            log(Mood::Okay, "2026-08-03 09:00:00"),
        ];
        let insights = generate_insights(&logs);
        assert_eq!(insights.dominant_mood, Some(Mood::Good));
        assert_eq!(insights.mood_distribution[&Mood::Good], 2);
        assert_eq!(insights.total_logs, 3);
    }

    #[test]
    fn test_trend_empty_is_insufficient() {
        assert_eq!(analyze_trend(&[]).trend, Trend::InsufficientData);
    }

    #[test]
    fn test_trend_improving() {
        // Seven sad days, then seven happy days
        let mut logs = Vec::new();
        for d in 1..=7 {
            logs.push(log(Mood::Sad, &format!("2026-08-{:02} 09:00:00", d)));
        }
        for d in 8..=14 {
            logs.push(log(Mood::Happy, &format!("2026-08-{:02} 09:00:00", d)));
        }
        let analysis = analyze_trend(&logs);
        assert_eq!(analysis.trend, Trend::Improving);
        assert!(analysis.change > 0.0);
    }

    #[test]
    fn test_trend_short_history_is_stable() {
        // Fewer than seven entries: the whole window is "recent"
        let logs = vec![
            log(Mood::Okay, "2026-08-01 09:00:00"),
            log(Mood::Okay, "2026-08-02 09:00:00"),
        ];
        assert_eq!(analyze_trend(&logs).trend, Trend::Stable);
    }

    #[test]
    fn test_streaks_counts_consecutive_days() {
        let days = vec![day("2026-08-23"), day("2026-08-22"), day("2026-08-21")];
        let streaks = mood_streaks(&days, day("2026-08-23"));
        assert_eq!(streaks, Streaks { current: 3, longest: 3 });
    }

    #[test]
    fn test_streaks_survive_logging_yesterday_only() {
        let days = vec![day("2026-08-22"), day("2026-08-21")];
        let streaks = mood_streaks(&days, day("2026-08-23"));
        assert_eq!(streaks.current, 2);
    }

    #[test]
    fn test_streaks_broken_by_gap() {
        let days = vec![
            day("2026-08-23"),
            day("2026-08-20"),
            day("2026-08-19"),
            day("2026-08-18"),
        ];
        let streaks = mood_streaks(&days, day("2026-08-23"));
        assert_eq!(streaks.current, 1);
        assert_eq!(streaks.longest, 3);
    }

    #[test]
    fn test_streaks_zero_after_lapse() {
        let days = vec![day("2026-08-15"), day("2026-08-14")];
        let streaks = mood_streaks(&days, day("2026-08-23"));
        assert_eq!(streaks.current, 0);
        assert_eq!(streaks.longest, 2);
    }

    #[test]
    fn test_streaks_empty() {
        assert_eq!(
            mood_streaks(&[], day("2026-08-23")),
            Streaks { current: 0, longest: 0 }
        );
    }
}
