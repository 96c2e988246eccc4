use crate::domain::{PointHistory, TransactionType, UserId};

#[mockall::automock]
#[async_trait::async_trait]
pub trait HistoryPort: Send + Sync {
    /// Append a new entry to the history of a user
    async fn insert(
        &self,
        user_id: UserId,
        amount: i64,
        kind: TransactionType,
        timestamp: i64,
    ) -> Result<PointHistory, Error>;
    /// All entries for a user, in insertion order
    async fn select_all_by_user_id(&self, user_id: UserId) -> Result<Vec<PointHistory>, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Concrete adapter errors
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
