use std::sync::Arc;

use tracing::{error, warn};

use crate::{
    domain::{TransactionType, UserId, UserPoint, MAX_POINT},
    locks::UserLocks,
    ports::{balance::BalancePort, history::HistoryPort},
};

pub mod charge;
pub mod get_balance;
pub mod get_history;
pub mod use_points;

/// Point operations on top of a balance store and a history store
///
/// Every operation is exposed as a [`tower::Service`] over its own request type.
pub struct DomainLogic<B, H> {
    balance: Arc<B>,
    history: Arc<H>,
    locks: UserLocks,
}

impl<B, H> DomainLogic<B, H> {
    pub fn new(balance: Arc<B>, history: Arc<H>) -> Self {
        Self {
            balance,
            history,
            locks: UserLocks::default(),
        }
    }
}

// Clones share the stores and the per-user locks
impl<B, H> Clone for DomainLogic<B, H> {
    fn clone(&self) -> Self {
        Self {
            balance: self.balance.clone(),
            history: self.history.clone(),
            locks: self.locks.clone(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("amount must be greater than 0, got {amount}")]
    InvalidAmount { amount: i64 },
    #[error("balance cannot exceed {} points: {current} + {amount}", MAX_POINT)]
    BalanceCapExceeded { current: i64, amount: i64 },
    #[error("insufficient balance: {current} available, {amount} requested")]
    InsufficientBalance { current: i64, amount: i64 },
    #[error("user {0} does not exist")]
    UserNotFound(UserId),

    #[error("balance port error: {0:?}")]
    Balance(#[from] crate::ports::balance::Error),
    #[error("history port error: {0:?}")]
    History(#[from] crate::ports::history::Error),
}

/// Coarse classification of [`Error`], used at the boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAmount,
    BalanceCapExceeded,
    InsufficientBalance,
    UserNotFound,
    /// Failures that are not caused by the request itself
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Error::BalanceCapExceeded { .. } => ErrorKind::BalanceCapExceeded,
            Error::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Error::UserNotFound(_) => ErrorKind::UserNotFound,
            Error::Balance(_) | Error::History(_) => ErrorKind::Internal,
        }
    }
}

/// Reject amounts that are not strictly positive
fn validate_amount(amount: i64) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Record a balance change in the history
///
/// The new balance is already stored when this runs. If the entry cannot be appended, the
/// balance is put back to `previous` so no mutation exists without its history entry.
/// Callers must still hold the user lock.
async fn append_or_restore<B, H>(
    balance: &B,
    history: &H,
    previous: &UserPoint,
    amount: i64,
    kind: TransactionType,
    timestamp: i64,
) -> Result<(), Error>
where
    B: BalancePort,
    H: HistoryPort,
{
    let err = match history
        .insert(previous.user_id, amount, kind, timestamp)
        .await
    {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };

    if let Err(restore_err) = balance
        .insert_or_update(previous.user_id, previous.point, previous.updated_at)
        .await
    {
        error!(
            user_id = previous.user_id,
            point = previous.point,
            error = %restore_err,
            "could not restore balance after history failure"
        );
    }
    Err(err.into())
}

/// Log a failed mutation with a level matching its cause
fn report<T>(
    operation: &'static str,
    user_id: UserId,
    res: Result<T, Error>,
) -> Result<T, Error> {
    if let Err(err) = &res {
        match err.kind() {
            ErrorKind::Internal => {
                error!(operation, user_id, error = %err, "point operation failed")
            }
            _ => warn!(operation, user_id, error = %err, "point operation rejected"),
        }
    }
    res
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::{
        adapters::database::memory::MemoryBalanceStore,
        domain::{UserId, UserPoint},
        ports::balance::{BalancePort, Error},
    };

    /// In-memory balances that hand control back to the scheduler on every call
    ///
    /// Concurrent requests interleave between reading and writing a balance, as they would
    /// against a remote store.
    #[derive(Clone, Debug, Default)]
    pub struct YieldingBalanceStore {
        inner: MemoryBalanceStore,
    }

    #[async_trait::async_trait]
    impl BalancePort for YieldingBalanceStore {
        async fn select_by_id(&self, user_id: UserId) -> Result<UserPoint, Error> {
            let user_point = self.inner.select_by_id(user_id).await;
            tokio::task::yield_now().await;
            user_point
        }

        async fn insert_or_update(
            &self,
            user_id: UserId,
            point: i64,
            updated_at: i64,
        ) -> Result<UserPoint, Error> {
            tokio::task::yield_now().await;
            self.inner.insert_or_update(user_id, point, updated_at).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use speculoos::prelude::*;

    #[rstest]
    #[case(Error::InvalidAmount { amount: 0 }, ErrorKind::InvalidAmount)]
    #[case(Error::BalanceCapExceeded { current: 10, amount: MAX_POINT }, ErrorKind::BalanceCapExceeded)]
    #[case(Error::InsufficientBalance { current: 10, amount: 20 }, ErrorKind::InsufficientBalance)]
    #[case(Error::UserNotFound(3), ErrorKind::UserNotFound)]
    #[case(Error::Balance(crate::ports::balance::Error::Adapter("down".into())), ErrorKind::Internal)]
    #[case(Error::History(crate::ports::history::Error::Adapter("down".into())), ErrorKind::Internal)]
    fn test_error_kind(#[case] err: Error, #[case] expected: ErrorKind) {
        assert_that!(err.kind()).is_equal_to(expected);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(i64::MIN)]
    fn test_validate_amount_rejects(#[case] amount: i64) {
        assert_that!(validate_amount(amount))
            .is_err()
            .matches(|err| matches!(err, Error::InvalidAmount { .. }));
    }

    #[test]
    fn test_cap_message() {
        let err = Error::BalanceCapExceeded {
            current: 999_000,
            amount: 2_000,
        };

        assert_that!(err.to_string())
            .is_equal_to("balance cannot exceed 1000000 points: 999000 + 2000".to_string());
    }
}
