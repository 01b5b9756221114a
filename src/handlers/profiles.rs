use axum::{extract::State, Extension, Json};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_log::Mood;
use crate::models::user::{User, UserProfile};
use crate::services::insights::mood_streaks;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be between 1 and 50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 50, message = "Last name must be less than 50 characters"))]
    pub last_name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be less than 500 characters"))]
    pub bio: Option<String>,
    #[validate(url(message = "Avatar URL must be a valid URL"))]
    pub avatar_url: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Invalid timezone"))]
    pub timezone: Option<String>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Profile not found".into()))?;

    Ok(Json(user.into()))
}

#[derive(Debug, Serialize)]
pub struct ProfileStats {
    pub total_logs: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Average mood score (1 to 5) over the last 30 days, if any entries.
    pub average_mood: Option<f64>,
}

/// Logging statistics for the authenticated user: lifetime entry count,
/// consecutive-day streaks and the recent mood average.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProfileStats>> {
    let total_logs =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM daily_logs WHERE user_id = $1")
            .bind(auth_user.id)
            .fetch_one(&state.db)
            .await?;

    let days: Vec<NaiveDate> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT (created_at AT TIME ZONE 'UTC')::date AS day
        FROM daily_logs
        WHERE user_id = $1
        ORDER BY day DESC
        "#,
    )
    .bind(auth_user.id)
    .fetch_all(&state.db)
    .await?;

    let streaks = mood_streaks(&days, Utc::now().date_naive());

    let recent_moods: Vec<Mood> = sqlx::query_scalar(
        "SELECT mood FROM daily_logs WHERE user_id = $1 AND created_at >= $2",
    )
    .bind(auth_user.id)
    .bind(Utc::now() - Duration::days(30))
    .fetch_all(&state.db)
    .await?;

    let average_mood = if recent_moods.is_empty() {
        None
    } else {
        let sum: i32 = recent_moods.iter().map(Mood::score).sum();
        Some(sum as f64 / recent_moods.len() as f64)
    };

    Ok(Json(ProfileStats {
        total_logs,
        current_streak: streaks.current,
        longest_streak: streaks.longest,
        average_mood,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    body.validate()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            bio = COALESCE($4, bio),
            avatar_url = COALESCE($5, avatar_url),
            timezone = COALESCE($6, timezone),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(auth_user.id)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.bio)
    .bind(&body.avatar_url)
    .bind(&body.timezone)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Profile not found".into()))?;

    Ok(Json(user.into()))
}
