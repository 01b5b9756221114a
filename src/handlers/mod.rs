pub mod ai;
pub mod auth;
pub mod daily_logs;
pub mod health;
pub mod profiles;
