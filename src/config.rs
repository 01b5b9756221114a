use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,
    pub jwt_session_ttl_secs: i64,
    pub magic_link_ttl_secs: i64,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub email_from: String,

    pub mood_webhook_url: Option<String>,
    pub cors_extra_origins: Vec<String>,
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_else(|_| String::new());
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_session_ttl_secs: env::var("JWT_SESSION_TTL_SECS")
                .unwrap_or_else(|_| "604800".into()) // 7 days
                .parse()
                .expect("JWT_SESSION_TTL_SECS must be a number"),
            magic_link_ttl_secs: env::var("MAGIC_LINK_TTL_SECS")
                .unwrap_or_else(|_| "900".into()) // 15 minutes
                .parse()
                .expect("MAGIC_LINK_TTL_SECS must be a number"),

            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".into())
                .parse()
                .expect("SMTP_PORT must be a number"),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_else(|_| String::new()),
            email_from: env::var("EMAIL_FROM").unwrap_or_else(|_| smtp_username.clone()),
            smtp_username,

            mood_webhook_url: env::var("MOOD_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .map(|raw| parse_origin_list(&raw))
                .unwrap_or_default(),
        }
    }

    /// Every origin the CORS layer should accept: the frontend plus any
    /// extras (e.g. LAN addresses for testing from another device).
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.clone()];
        origins.extend(self.cors_extra_origins.iter().cloned());
        origins
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL embedded in magic-link emails.
    pub fn magic_link_base(&self) -> String {
        format!("{}/verify-magic-link", self.frontend_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            host: "0.0.0.0".into(),
            port: 8080,
            frontend_url: "https://app.example.com/".into(),
            jwt_secret: "test-secret".into(),
            jwt_session_ttl_secs: 604800,
            magic_link_ttl_secs: 900,
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            smtp_username: "noreply@example.com".into(),
            smtp_password: String::new(),
            email_from: "noreply@example.com".into(),
            mood_webhook_url: None,
            cors_extra_origins: Vec::new(),
        }
    }

    #[test]
    fn test_magic_link_base_strips_trailing_slash() {
        let config = test_config();
        assert_eq!(
            config.magic_link_base(),
            "https://app.example.com/verify-magic-link"
        );
    }

    #[test]
    fn test_parse_origin_list_trims_and_drops_blanks() {
        assert_eq!(
            parse_origin_list("http://192.168.1.5:3000, http://localhost:3001,,"),
            vec![
                "http://192.168.1.5:3000".to_string(),
                "http://localhost:3001".to_string(),
            ]
        );
        assert!(parse_origin_list("").is_empty());
    }

    #[test]
    fn test_allowed_origins_starts_with_frontend() {
        let mut config = test_config();
        config.cors_extra_origins = vec!["http://localhost:3001".into()];
        assert_eq!(
            config.allowed_origins(),
            vec![
                "https://app.example.com/".to_string(),
                "http://localhost:3001".to_string(),
            ]
        );
    }
}
