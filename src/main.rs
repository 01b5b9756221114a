use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use auth::rate_limit::RateLimitState;
use config::Config;
use services::email::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub mailer: Mailer,
    pub rate_limiter: RateLimitState,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mindtrack_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let mailer = Mailer::from_config(&config).expect("Failed to configure SMTP mailer");

    let rate_limiter = RateLimitState::new();

    let state = AppState {
        db,
        config: config.clone(),
        mailer,
        rate_limiter,
    };

    // Password auth + magic-link verification, rate limited per IP+path
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/auth/magic-link/verify",
            post(handlers::auth::verify_magic_link),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    // Endpoints that send email or call the external classifier get the
    // stricter per-IP budget
    let strict_routes = Router::new()
        .route("/api/auth/magic-link", post(handlers::auth::send_magic_link))
        .route("/api/ai/analyze", post(handlers::ai::analyze_mood))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_strict,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(strict_routes)
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        // Daily logs
        .route("/api/daily-logs", post(handlers::daily_logs::create_daily_log))
        .route("/api/daily-logs", get(handlers::daily_logs::list_daily_logs))
        .route("/api/daily-logs/days", get(handlers::daily_logs::get_day_summaries))
        .route(
            "/api/daily-logs/range",
            get(handlers::daily_logs::get_daily_logs_range),
        )
        .route(
            "/api/daily-logs/stats/mood",
            get(handlers::daily_logs::get_mood_stats),
        )
        .route("/api/daily-logs/:id", get(handlers::daily_logs::get_daily_log))
        .route("/api/daily-logs/:id", put(handlers::daily_logs::update_daily_log))
        .route(
            "/api/daily-logs/:id",
            delete(handlers::daily_logs::delete_daily_log),
        )
        // Account management
        .route("/api/auth/password", put(handlers::auth::change_password))
        .route("/api/auth/account", delete(handlers::auth::delete_account))
        // Suggestions + analytics
        .route("/api/ai/suggestion", post(handlers::ai::get_suggestion))
        .route("/api/ai/insights", get(handlers::ai::get_insights))
        .route("/api/ai/trends", get(handlers::ai::get_trends))
        // Profile
        .route("/api/profile", get(handlers::profiles::get_profile))
        .route("/api/profile", put(handlers::profiles::update_profile))
        .route("/api/profile/stats", get(handlers::profiles::get_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    // Start magic-link sweeper (purges redeemed/expired tokens every 10 min)
    handlers::auth::spawn_token_cleanup_worker(state.db.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    // Use into_make_service_with_connect_info to provide client IP for rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}
