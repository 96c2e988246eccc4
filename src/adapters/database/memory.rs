use crate::{
    domain::{PointHistory, TransactionType, UserId, UserPoint},
    ports::{
        balance::{self, BalancePort},
        history::{self, HistoryPort},
    },
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

/// Balances kept in process memory
#[derive(Clone, Debug, Default)]
pub struct MemoryBalanceStore {
    balances: Arc<Mutex<HashMap<UserId, UserPoint>>>,
}

#[async_trait::async_trait]
impl BalancePort for MemoryBalanceStore {
    #[tracing::instrument(level = "trace", skip(self))]
    async fn select_by_id(&self, user_id: UserId) -> Result<UserPoint, balance::Error> {
        let user_point = self
            .balances
            .lock()?
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserPoint::empty(user_id));

        Ok(user_point)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn insert_or_update(
        &self,
        user_id: UserId,
        point: i64,
        updated_at: i64,
    ) -> Result<UserPoint, balance::Error> {
        let user_point = UserPoint {
            user_id,
            point,
            updated_at,
        };
        self.balances.lock()?.insert(user_id, user_point.clone());

        Ok(user_point)
    }
}

#[derive(Debug)]
struct HistoryLog {
    /// Next id to hand out
    cursor: i64,
    entries: Vec<PointHistory>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self {
            cursor: 1,
            entries: Vec::new(),
        }
    }
}

/// Append-only point history kept in process memory
///
/// Ids are assigned from a single sequence shared by all users.
#[derive(Clone, Debug, Default)]
pub struct MemoryHistoryStore {
    log: Arc<Mutex<HistoryLog>>,
}

#[async_trait::async_trait]
impl HistoryPort for MemoryHistoryStore {
    #[tracing::instrument(level = "trace", skip(self))]
    async fn insert(
        &self,
        user_id: UserId,
        amount: i64,
        kind: TransactionType,
        timestamp: i64,
    ) -> Result<PointHistory, history::Error> {
        let mut log = self.log.lock()?;
        let entry = PointHistory {
            id: log.cursor,
            user_id,
            amount,
            kind,
            timestamp,
        };
        log.cursor += 1;
        log.entries.push(entry.clone());

        Ok(entry)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn select_all_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PointHistory>, history::Error> {
        let entries = self
            .log
            .lock()?
            .entries
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();

        Ok(entries)
    }
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

impl<T> From<PoisonError<T>> for balance::Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}

impl<T> From<PoisonError<T>> for history::Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
