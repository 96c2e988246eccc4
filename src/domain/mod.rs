use serde::{Deserialize, Serialize};

/// Identifier of a user owning a point balance
pub type UserId = i64;

/// Upper bound for the number of points a single user can hold
pub const MAX_POINT: i64 = 1_000_000;

/// Current point balance of a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPoint {
    pub user_id: UserId,
    /// Current amount of points
    ///
    /// This is always between 0 and [`MAX_POINT`] inclusive.
    pub point: i64,
    /// Last time the balance changed, in milliseconds since the Unix epoch
    pub updated_at: i64,
}

impl UserPoint {
    /// Balance for a user that has never charged any points
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            point: 0,
            updated_at: now_millis(),
        }
    }
}

/// Kind of balance mutation recorded in the history
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Charge,
    Use,
}

/// One entry of a user's point history
///
/// Entries are append-only: once stored they are never updated or removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointHistory {
    /// Sequence number assigned by the history store
    pub id: i64,
    pub user_id: UserId,
    /// Number of points charged or used, always positive
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
