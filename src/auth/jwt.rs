use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issue a signed session token for an authenticated user.
pub fn create_session_token(user_id: Uuid, email: &str, config: &Config) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (now + Duration::seconds(config.jwt_session_ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create session token: {}", e)))
}

pub fn verify_token(token: &str, config: &Config) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)
}

/// Generate a single-use magic-link credential: 32 random bytes as lowercase hex.
pub fn generate_magic_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compute SHA-256 hash of a raw token string, returned as lowercase hex.
/// Only the hash is persisted; the raw token travels in the emailed link.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(session_ttl_secs: i64) -> Config {
        Config {
            database_url: String::new(),
            host: "0.0.0.0".into(),
            port: 8080,
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "test-secret".into(),
            jwt_session_ttl_secs: session_ttl_secs,
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
    fn test_session_token_roundtrip() {
        let config = test_config(3600);
        let user_id = Uuid::new_v4();
        let token = create_session_token(user_id, "a@b.com", &config).unwrap();

        let data = verify_token(&token, &config).unwrap();
        assert_eq!(data.claims.sub, user_id);
        assert_eq!(data.claims.email, "a@b.com");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = test_config(3600);
        let token = create_session_token(Uuid::new_v4(), "a@b.com", &config).unwrap();

        let mut other = test_config(3600);
        other.jwt_secret = "different-secret".into();
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // jsonwebtoken's default leeway is 60s, so go well past it
        let config = test_config(-120);
        let token = create_session_token(Uuid::new_v4(), "a@b.com", &config).unwrap();
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn test_magic_token_shape() {
        let token = generate_magic_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_magic_token());
    }

    #[test]
    fn test_hash_token_deterministic() {
        let token = "test-magic-token-value";
        let h1 = hash_token(token);
        let h2 = hash_token(token);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex = 64 chars
    }

    #[test]
    fn test_hash_token_different_inputs() {
        let h1 = hash_token("token-a");
        let h2 = hash_token("token-b");
        assert_ne!(h1, h2);
    }
}
