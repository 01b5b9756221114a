pub mod daily_log;
pub mod magic_link;
pub mod user;
