pub mod email;
pub mod insights;
pub mod suggestions;
