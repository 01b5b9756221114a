use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_log::{
    summarize_by_day, CreateDailyLogRequest, DailyLog, DaySummary, ListQuery,
    UpdateDailyLogRequest, WindowQuery,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub logs: Vec<DailyLog>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct MoodStatsResponse {
    pub stats: Vec<MoodCount>,
    pub total_logs: i64,
    pub date_range: DateRange,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MoodCount {
    pub mood: crate::models::daily_log::Mood,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub start: chrono::DateTime<Utc>,
    pub end: chrono::DateTime<Utc>,
}

/// OFFSET for a 1-based page, or None when the product overflows i64.
fn page_offset(page: i64, limit: i64) -> Option<i64> {
    (page - 1).checked_mul(limit)
}

pub async fn create_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateDailyLogRequest>,
) -> AppResult<(axum::http::StatusCode, Json<DailyLog>)> {
    body.validate()?;

    let log = sqlx::query_as::<_, DailyLog>(
        r#"
        INSERT INTO daily_logs (id, user_id, mood, notes, ai_suggestion, sleep_hours, energy_level, stress_level)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(body.mood)
    .bind(&body.notes)
    .bind(&body.ai_suggestion)
    .bind(body.sleep_hours)
    .bind(body.energy_level)
    .bind(body.stress_level)
    .fetch_one(&state.db)
    .await?;

    Ok((axum::http::StatusCode::CREATED, Json(log)))
}

pub async fn list_daily_logs(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let limit = query.limit.unwrap_or(50);
    if !(1..=100).contains(&limit) {
        return Err(AppError::Validation("Limit must be between 1 and 100".into()));
    }
    let page = query.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::Validation("Page must be a positive integer".into()));
    }
    let offset = page_offset(page, limit)
        .ok_or(AppError::Validation("Page is out of range".into()))?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM daily_logs WHERE user_id = $1")
        .bind(auth_user.id)
        .fetch_one(&state.db)
        .await?;

    let logs = sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT * FROM daily_logs
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(auth_user.id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ListResponse {
        logs,
        pagination: Pagination { page, limit, total },
    }))
}

pub async fn get_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<DailyLog>> {
    let log = sqlx::query_as::<_, DailyLog>(
        "SELECT * FROM daily_logs WHERE id = $1 AND user_id = $2",
    )
    .bind(log_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Daily log not found".into()))?;

    Ok(Json(log))
}

pub async fn update_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
    Json(body): Json<UpdateDailyLogRequest>,
) -> AppResult<Json<DailyLog>> {
    body.validate()?;

    let log = sqlx::query_as::<_, DailyLog>(
        r#"
        UPDATE daily_logs SET
            mood = COALESCE($3, mood),
            notes = COALESCE($4, notes),
            ai_suggestion = COALESCE($5, ai_suggestion),
            sleep_hours = COALESCE($6, sleep_hours),
            energy_level = COALESCE($7, energy_level),
            stress_level = COALESCE($8, stress_level),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(log_id)
    .bind(auth_user.id)
    .bind(body.mood)
    .bind(&body.notes)
    .bind(&body.ai_suggestion)
    .bind(body.sleep_hours)
    .bind(body.energy_level)
    .bind(body.stress_level)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Daily log not found".into()))?;

    Ok(Json(log))
}

pub async fn delete_daily_log(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM daily_logs WHERE id = $1 AND user_id = $2")
        .bind(log_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Daily log not found".into()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, serde::Deserialize)]
pub struct RangeQuery {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

/// All entries between two calendar dates (UTC, inclusive), oldest first.
pub async fn get_daily_logs_range(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<DailyLog>>> {
    if query.start_date > query.end_date {
        return Err(AppError::Validation(
            "start_date must not be after end_date".into(),
        ));
    }

    let logs = sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT * FROM daily_logs
        WHERE user_id = $1
          AND created_at >= $2
          AND created_at < $3
        ORDER BY created_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(query.start_date.and_hms_opt(0, 0, 0).unwrap().and_utc())
    .bind(
        (query.end_date + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc(),
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(logs))
}

/// Per-calendar-day view over a trailing window: dominant mood, entry count
/// and notes per day. Recomputed per request.
pub async fn get_day_summaries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<Vec<DaySummary>>> {
    let days = query.days.unwrap_or(30).clamp(1, 365);
    let since = Utc::now() - Duration::days(days);

    let logs = sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT * FROM daily_logs
        WHERE user_id = $1 AND created_at >= $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(summarize_by_day(&logs)))
}

/// Mood-frequency histogram over a trailing window.
pub async fn get_mood_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<MoodStatsResponse>> {
    let days = query.days.unwrap_or(30).clamp(1, 365);
    let now = Utc::now();
    let since = now - Duration::days(days);

    let stats = sqlx::query_as::<_, MoodCount>(
        r#"
        SELECT mood, COUNT(*) AS count FROM daily_logs
        WHERE user_id = $1 AND created_at >= $2
        GROUP BY mood
        ORDER BY count DESC
        "#,
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    let total_logs = stats.iter().map(|s| s.count).sum();

    Ok(Json(MoodStatsResponse {
        stats,
        total_logs,
        date_range: DateRange {
            start: since,
            end: now,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset_first_page_is_zero() {
        assert_eq!(page_offset(1, 50), Some(0));
        assert_eq!(page_offset(3, 50), Some(100));
    }

    #[test]
    fn test_page_offset_overflow_is_rejected() {
        assert_eq!(page_offset(i64::MAX, 100), None);
    }
}
