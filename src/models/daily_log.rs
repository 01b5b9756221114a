use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood: Mood,
    pub notes: String,
    pub ai_suggestion: Option<String>,
    pub sleep_hours: Option<f32>,
    pub energy_level: Option<i32>,
    pub stress_level: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The mood vocabulary. Stored as a Postgres enum; the serde aliases accept
/// the capitalized spellings older clients send.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[sqlx(type_name = "mood", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[serde(alias = "Happy")]
    Happy,
    #[serde(alias = "Good")]
    Good,
    #[serde(alias = "Okay")]
    Okay,
    #[serde(alias = "Sad")]
    Sad,
    #[serde(alias = "Terrible")]
    Terrible,
}

impl Mood {
    /// Numeric weight for trend math: happy = 5 down to terrible = 1.
    pub fn score(&self) -> i32 {
        match self {
            Mood::Happy => 5,
            Mood::Good => 4,
            Mood::Okay => 3,
            Mood::Sad => 2,
            Mood::Terrible => 1,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Good => "🙂",
            Mood::Okay => "😐",
            Mood::Sad => "😔",
            Mood::Terrible => "😖",
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDailyLogRequest {
    pub mood: Mood,
    #[validate(length(max = 1000, message = "Notes must be less than 1000 characters"))]
    #[serde(default)]
    pub notes: String,
    #[validate(length(max = 2000, message = "AI suggestion must be less than 2000 characters"))]
    pub ai_suggestion: Option<String>,
    #[validate(range(min = 0.0, max = 24.0, message = "Sleep hours must be between 0 and 24"))]
    pub sleep_hours: Option<f32>,
    #[validate(range(min = 1, max = 10, message = "Energy level must be between 1 and 10"))]
    pub energy_level: Option<i32>,
    #[validate(range(min = 1, max = 10, message = "Stress level must be between 1 and 10"))]
    pub stress_level: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDailyLogRequest {
    pub mood: Option<Mood>,
    #[validate(length(max = 1000, message = "Notes must be less than 1000 characters"))]
    pub notes: Option<String>,
    #[validate(length(max = 2000, message = "AI suggestion must be less than 2000 characters"))]
    pub ai_suggestion: Option<String>,
    #[validate(range(min = 0.0, max = 24.0, message = "Sleep hours must be between 0 and 24"))]
    pub sleep_hours: Option<f32>,
    #[validate(range(min = 1, max = 10, message = "Energy level must be between 1 and 10"))]
    pub energy_level: Option<i32>,
    #[validate(range(min = 1, max = 10, message = "Stress level must be between 1 and 10"))]
    pub stress_level: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
}

/// One calendar day of log entries, reduced to its dominant mood.
#[derive(Debug, Serialize, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub mood: Mood,
    pub mood_emoji: &'static str,
    pub entry_count: usize,
    pub notes: Vec<String>,
}

/// Group entries by calendar day (UTC) and pick the most frequent mood per
/// day. Ties go to the mood logged most recently within that day. Days are
/// returned newest first; one row per distinct day present in the input.
pub fn summarize_by_day(logs: &[DailyLog]) -> Vec<DaySummary> {
    let mut days: BTreeMap<NaiveDate, Vec<&DailyLog>> = BTreeMap::new();
    for log in logs {
        days.entry(log.created_at.date_naive()).or_default().push(log);
    }

    days.into_iter()
        .rev()
        .map(|(date, entries)| {
            let mut tallies: BTreeMap<Mood, (usize, DateTime<Utc>)> = BTreeMap::new();
            for log in &entries {
                let tally = tallies.entry(log.mood).or_insert((0, log.created_at));
                tally.0 += 1;
                if log.created_at > tally.1 {
                    tally.1 = log.created_at;
                }
            }
            let mood = tallies
                .into_iter()
                .max_by_key(|(_, (count, latest))| (*count, *latest))
                .map(|(mood, _)| mood)
                .expect("day group is never empty");

            let notes = entries
                .iter()
                .filter(|l| !l.notes.is_empty())
                .map(|l| l.notes.clone())
                .collect();

            DaySummary {
                date,
                mood,
                mood_emoji: mood.emoji(),
                entry_count: entries.len(),
                notes,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn log_at(mood: Mood, ts: &str, notes: &str) -> DailyLog {
        let created_at = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
            .expect("valid timestamp")
            .and_utc();
        DailyLog {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            mood,
            notes: notes.into(),
            ai_suggestion: None,
            sleep_hours: None,
            energy_level: None,
            stress_level: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_one_row_per_distinct_day() {
        let logs = vec![
            log_at(Mood::Happy, "2026-08-01 09:00:00", ""),
            log_at(Mood::Sad, "2026-08-01 21:00:00", ""),
            log_at(Mood::Okay, "2026-08-03 12:00:00", ""),
            log_at(Mood::Okay, "2026-08-05 12:00:00", ""),
        ];
        let summary = summarize_by_day(&logs);
        let dates: Vec<NaiveDate> = summary.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
                NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
                NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_most_frequent_mood_wins() {
        let logs = vec![
            log_at(Mood::Sad, "2026-08-01 08:00:00", ""),
            log_at(Mood::Happy, "2026-08-01 12:00:00", ""),
            log_at(Mood::Sad, "2026-08-01 20:00:00", ""),
        ];
        let summary = summarize_by_day(&logs);
        assert_eq!(summary[0].mood, Mood::Sad);
        assert_eq!(summary[0].entry_count, 3);
    }

    #[test]
    fn test_tie_breaks_toward_most_recent() {
        let logs = vec![
            log_at(Mood::Happy, "2026-08-01 08:00:00", ""),
            log_at(Mood::Sad, "2026-08-01 20:00:00", ""),
        ];
        let summary = summarize_by_day(&logs);
        assert_eq!(summary[0].mood, Mood::Sad);

        // Same counts, opposite order
        let logs = vec![
            log_at(Mood::Sad, "2026-08-01 08:00:00", ""),
            log_at(Mood::Happy, "2026-08-01 20:00:00", ""),
        ];
        let summary = summarize_by_day(&logs);
        assert_eq!(summary[0].mood, Mood::Happy);
    }

    #[test]
    fn test_empty_notes_are_dropped() {
        let logs = vec![
            log_at(Mood::Good, "2026-08-02 09:00:00", "slept well"),
            log_at(Mood::Good, "2026-08-02 18:00:00", ""),
        ];
        let summary = summarize_by_day(&logs);
        assert_eq!(summary[0].notes, vec!["slept well".to_string()]);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert!(summarize_by_day(&[]).is_empty());
    }

    #[test]
    fn test_unknown_mood_rejected_on_deserialize() {
        let err = serde_json::from_str::<Mood>("\"ecstatic\"");
        assert!(err.is_err());

        // Legacy capitalized spellings still parse
        let mood: Mood = serde_json::from_str("\"Happy\"").unwrap();
        assert_eq!(mood, Mood::Happy);
    }
}
