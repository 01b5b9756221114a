use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::daily_log::{DailyLog, Mood, WindowQuery};
use crate::services::insights::{analyze_trend, generate_insights, Insights, TrendAnalysis};
use crate::services::suggestions::{
    classify_text, pick_suggestion, suggestions_for_emotion, Emotion, EmotionScore,
};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 1000, message = "Text must be between 1 and 1000 characters"))]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub detected_emotion: Emotion,
    pub score: f64,
    pub suggestions: Vec<&'static str>,
    pub source: &'static str, // "external" or "fallback"
}

#[derive(Debug, Deserialize, Validate)]
pub struct SuggestionRequest {
    pub mood: Option<Mood>,
    #[validate(length(max = 1000, message = "Notes must be less than 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestion: String,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Classify free text and return suggestions for the detected emotion.
/// Uses the external webhook when configured, local keywords otherwise.
pub async fn analyze_mood(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    body.validate()?;

    let (emotion, score, source) = match classify_external(&state, &body.text).await {
        Ok(Some((emotion, score))) => (emotion, score, "external"),
        Ok(None) => (classify_text(&body.text), 1.0, "fallback"),
        Err(e) => {
            tracing::warn!(error = %e, "External classifier unavailable, using keyword fallback");
            (classify_text(&body.text), 1.0, "fallback")
        }
    };

    Ok(Json(AnalyzeResponse {
        detected_emotion: emotion,
        score,
        suggestions: suggestions_for_emotion(emotion).to_vec(),
        source,
    }))
}

/// One suggestion for a logged mood, personalized by note keywords.
pub async fn get_suggestion(
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<SuggestionRequest>,
) -> AppResult<Json<SuggestionResponse>> {
    body.validate()?;

    if body.mood.is_none() && body.notes.as_deref().map_or(true, str::is_empty) {
        return Err(AppError::Validation("Mood or notes are required".into()));
    }

    let suggestion = pick_suggestion(body.mood, body.notes.as_deref().unwrap_or(""));
    tracing::debug!(user_id = %auth_user.id, "Suggestion generated");

    Ok(Json(SuggestionResponse {
        suggestion,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub insights: Insights,
    pub period_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    #[serde(flatten)]
    pub analysis: TrendAnalysis,
    pub period: String,
    pub total_logs: usize,
}

/// Rule-based insights over a trailing window of the user's history.
pub async fn get_insights(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<InsightsResponse>> {
    let days = query.days.unwrap_or(30).clamp(1, 365);
    let since = Utc::now() - chrono::Duration::days(days);

    let logs = sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT * FROM daily_logs
        WHERE user_id = $1 AND created_at >= $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(InsightsResponse {
        insights: generate_insights(&logs),
        period_days: days,
    }))
}

/// Mood trajectory: recent entries scored against the rest of the period.
pub async fn get_trends(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TrendQuery>,
) -> AppResult<Json<TrendResponse>> {
    let period = query.period.as_deref().unwrap_or("month");
    let days = match period {
        "week" => 7,
        "month" => 30,
        "quarter" => 90,
        _ => {
            return Err(AppError::Validation(
                "Period must be one of: week, month, quarter".into(),
            ))
        }
    };
    let since = Utc::now() - chrono::Duration::days(days);

    let logs = sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT * FROM daily_logs
        WHERE user_id = $1 AND created_at >= $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(TrendResponse {
        analysis: analyze_trend(&logs),
        period: period.to_string(),
        total_logs: logs.len(),
    }))
}

/// Ask the configured webhook to classify `text`. Returns Ok(None) when no
/// webhook is configured. A single failed call is surfaced as an error; the
/// caller falls back synchronously, no retry.
async fn classify_external(
    state: &AppState,
    text: &str,
) -> Result<Option<(Emotion, f64)>, anyhow::Error> {
    let Some(url) = state.config.mood_webhook_url.as_deref() else {
        return Ok(None);
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let response = client
        .post(url)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!("Classifier returned {}", response.status());
    }

    let emotions: Vec<EmotionScore> = response.json().await?;
    let top = emotions
        .into_iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| anyhow::anyhow!("Classifier returned no emotions"))?;

    Ok(Some((top.label, top.score)))
}
