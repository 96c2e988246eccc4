use crate::domain::{UserId, UserPoint};

#[mockall::automock]
#[async_trait::async_trait]
pub trait BalancePort: Send + Sync {
    /// Current balance of a user
    ///
    /// Users without a stored balance are reported with zero points.
    async fn select_by_id(&self, user_id: UserId) -> Result<UserPoint, Error>;
    /// Store the new balance of a user and return the persisted record
    async fn insert_or_update(
        &self,
        user_id: UserId,
        point: i64,
        updated_at: i64,
    ) -> Result<UserPoint, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
