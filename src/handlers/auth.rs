use axum::{extract::State, Extension, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    jwt::{create_session_token, generate_magic_token, hash_token},
    middleware::AuthUser,
    password::{hash_password, verify_password},
};
use crate::error::{AppError, AppResult};
use crate::models::magic_link::{MagicLinkToken, TokenState};
use crate::models::user::{AuthMethod, User, UserProfile};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "First name must be between 1 and 50 characters"))]
    pub first_name: String,
    #[validate(length(max = 50, message = "Last name must be less than 50 characters"))]
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MagicLinkRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyMagicLinkRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub token: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

fn session_response(message: &str, user: User, state: &AppState) -> AppResult<SessionResponse> {
    let token = create_session_token(user.id, &user.email, &state.config)?;
    Ok(SessionResponse {
        message: message.into(),
        token,
        expires_in: state.config.jwt_session_ttl_secs,
        user: user.into(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(axum::http::StatusCode, Json<SessionResponse>)> {
    body.validate()?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_one(&state.db)
        .await?;

    if existing > 0 {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let pwd_hash = hash_password(&body.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, auth_method)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&body.email)
    .bind(&pwd_hash)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(AuthMethod::Password)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    let response = session_response("User created successfully", user, &state)?;
    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    body.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::InvalidCredential("Invalid credentials".into()))?;

    // Magic-link-only accounts have no hash; same rejection as a bad password
    let password_hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredential("Invalid credentials".into()))?;

    if !verify_password(&body.password, password_hash)? {
        return Err(AppError::InvalidCredential("Invalid credentials".into()));
    }

    Ok(Json(session_response("Login successful", user, &state)?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}

/// Request a magic link: find-or-create the account, store a hashed
/// single-use token, email the redemption URL.
pub async fn send_magic_link(
    State(state): State<AppState>,
    Json(body): Json<MagicLinkRequest>,
) -> AppResult<Json<serde_json::Value>> {
    body.validate()?;

    let user = match sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?
    {
        Some(user) => user,
        None => {
            let first_name = body.email.split('@').next().unwrap_or("").to_string();
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, email, first_name, last_name, auth_method)
                VALUES ($1, $2, $3, '', $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&body.email)
            .bind(&first_name)
            .bind(AuthMethod::MagicLink)
            .fetch_one(&state.db)
            .await?
        }
    };

    let raw_token = generate_magic_token();
    let expires_at = Utc::now() + Duration::seconds(state.config.magic_link_ttl_secs);

    sqlx::query(
        r#"
        INSERT INTO magic_link_tokens (id, user_id, email, token_hash, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&user.email)
    .bind(hash_token(&raw_token))
    .bind(expires_at)
    .execute(&state.db)
    .await?;

    let magic_link = format!("{}?token={}", state.config.magic_link_base(), raw_token);
    state.mailer.send_magic_link(&user.email, &magic_link).await?;

    tracing::info!(user_id = %user.id, "Magic link issued");

    Ok(Json(serde_json::json!({
        "message": "Magic link sent to your email",
        "success": true,
    })))
}

/// Redeem a magic link. The validity decision is `MagicLinkToken::state_at`;
/// single use is enforced by the conditional UPDATE, so of two concurrent
/// redemptions exactly one matches the unredeemed row.
pub async fn verify_magic_link(
    State(state): State<AppState>,
    Json(body): Json<VerifyMagicLinkRequest>,
) -> AppResult<Json<SessionResponse>> {
    if body.token.is_empty() {
        return Err(AppError::Validation("Token is required".into()));
    }

    let token_hash = hash_token(&body.token);

    let token = sqlx::query_as::<_, MagicLinkToken>(
        "SELECT * FROM magic_link_tokens WHERE token_hash = $1",
    )
    .bind(&token_hash)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::InvalidCredential("Invalid or expired token".into()))?;

    match token.state_at(Utc::now()) {
        TokenState::Redeemed => {
            tracing::warn!(token_id = %token.id, "Spent magic link presented again");
            return Err(AppError::InvalidCredential("Invalid or expired token".into()));
        }
        TokenState::Expired => {
            // Invalidate so a retry short-circuits before the cleanup sweep runs
            sqlx::query("UPDATE magic_link_tokens SET redeemed_at = NOW() WHERE id = $1")
                .bind(token.id)
                .execute(&state.db)
                .await?;
            tracing::debug!(token_id = %token.id, "Expired magic link presented");
            return Err(AppError::InvalidCredential("Token has expired".into()));
        }
        TokenState::Pending => {}
    }

    let claimed = sqlx::query_as::<_, MagicLinkToken>(
        r#"
        UPDATE magic_link_tokens
        SET redeemed_at = NOW()
        WHERE id = $1 AND redeemed_at IS NULL
        RETURNING *
        "#,
    )
    .bind(token.id)
    .fetch_optional(&state.db)
    .await?;

    // Lost the race with a concurrent redemption
    if claimed.is_none() {
        return Err(AppError::InvalidCredential("Invalid or expired token".into()));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(token.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::InvalidCredential("User not found".into()))?;

    tracing::info!(user_id = %user.id, "Magic link redeemed");

    Ok(Json(session_response("Login successful", user, &state)?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

/// Change the password on a password account. Magic-link accounts carry no
/// hash and cannot pass the current-password check.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    body.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    let password_hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredential("Current password is incorrect".into()))?;

    if !verify_password(&body.current_password, password_hash)? {
        return Err(AppError::InvalidCredential("Current password is incorrect".into()));
    }

    let new_hash = hash_password(&body.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&new_hash)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(serde_json::json!({
        "message": "Password changed successfully",
    })))
}

/// Delete the authenticated account. Logs and outstanding magic links go
/// with it via the foreign-key cascades.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    tracing::info!(user_id = %auth_user.id, "Account deleted");

    Ok(Json(serde_json::json!({
        "message": "Account deleted successfully",
    })))
}

/// Purge redeemed and expired magic-link rows every 10 minutes.
pub fn spawn_token_cleanup_worker(db: sqlx::PgPool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            match sqlx::query(
                "DELETE FROM magic_link_tokens WHERE redeemed_at IS NOT NULL OR expires_at < NOW()",
            )
            .execute(&db)
            .await
            {
                Ok(result) if result.rows_affected() > 0 => {
                    tracing::debug!(purged = result.rows_affected(), "Magic link tokens purged");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Magic link cleanup failed");
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::verify_token;
    use crate::config::Config;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            host: "0.0.0.0".into(),
            port: 8080,
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "test-secret".into(),
            jwt_session_ttl_secs: 3600,
            magic_link_ttl_secs: 900,
            smtp_host: "localhost".into(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            email_from: String::new(),
            mood_webhook_url: None,
            cors_extra_origins: Vec::new(),
        }
    }

    #[test]
    fn test_registered_credentials_log_back_in() {
        // The credential path register and login share: store the argon2
        // hash, verify the same password against it, then mint a session
        // token that identifies the user.
        let config = test_config();
        let user_id = Uuid::new_v4();
        let password = "hunter2hunter2";

        let stored_hash = hash_password(password).unwrap();
        assert!(verify_password(password, &stored_hash).unwrap());
        assert!(!verify_password("wrong-password", &stored_hash).unwrap());

        let token = create_session_token(user_id, "a@b.com", &config).unwrap();
        let data = verify_token(&token, &config).unwrap();
        assert_eq!(data.claims.sub, user_id);
        assert_eq!(data.claims.email, "a@b.com");
    }
}
