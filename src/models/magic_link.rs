use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One outstanding magic-link credential. Only the SHA-256 digest of the
/// emailed token is stored; `redeemed_at` marks it spent (single use).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MagicLinkToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Redemption decision for a presented token at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Outstanding and inside its window: may be redeemed.
    Pending,
    /// Already spent; a second redemption must fail.
    Redeemed,
    /// Past its window; invalid even if never redeemed.
    Expired,
}

impl MagicLinkToken {
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.redeemed_at.is_some() {
            TokenState::Redeemed
        } else if now > self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Pending
        }
    }
}
