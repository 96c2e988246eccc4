use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{now_millis, TransactionType, UserId, UserPoint},
    locks::UserLocks,
    ports::{balance::BalancePort, history::HistoryPort},
};
use tower::Service;
use tracing::info;

use super::{append_or_restore, report, validate_amount, DomainLogic, Error};

/// Spend points from the balance of a user
#[derive(Clone, Debug)]
pub struct UsePointsRequest {
    pub user_id: UserId,
    pub amount: i64,
}

impl<B, H> Service<UsePointsRequest> for DomainLogic<B, H>
where
    B: BalancePort + 'static,
    H: HistoryPort + 'static,
{
    type Response = UserPoint;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: UsePointsRequest) -> Self::Future {
        let balance = self.balance.clone();
        let history = self.history.clone();
        let locks = self.locks.clone();
        Box::pin(async move {
            let user_id = req.user_id;
            let res = use_points(balance.as_ref(), history.as_ref(), &locks, req).await;
            report("use", user_id, res)
        })
    }
}

async fn use_points<B, H>(
    balance: &B,
    history: &H,
    locks: &UserLocks,
    req: UsePointsRequest,
) -> Result<UserPoint, Error>
where
    B: BalancePort,
    H: HistoryPort,
{
    validate_amount(req.amount)?;

    let _guard = locks.lock(req.user_id).await;
    let current = balance.select_by_id(req.user_id).await?;
    if current.point < req.amount {
        return Err(Error::InsufficientBalance {
            current: current.point,
            amount: req.amount,
        });
    }

    let now = now_millis();
    let updated = balance
        .insert_or_update(req.user_id, current.point - req.amount, now)
        .await?;
    append_or_restore(
        balance,
        history,
        &current,
        req.amount,
        TransactionType::Use,
        now,
    )
    .await?;

    info!(
        user_id = req.user_id,
        amount = req.amount,
        point = updated.point,
        "points used"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::database::memory::{MemoryBalanceStore, MemoryHistoryStore},
        commands::{charge::ChargeRequest, testing::YieldingBalanceStore},
        domain::PointHistory,
        ports::{balance::MockBalancePort, history::MockHistoryPort},
    };
    use mockall::predicate::*;
    use rstest::*;
    use speculoos::prelude::*;
    use std::sync::Arc;
    use tower::{BoxError, ServiceExt};

    #[fixture]
    fn user_id() -> UserId {
        1
    }

    /// Balance port that always reports `point` for the user
    fn balance_with(point: i64) -> MockBalancePort {
        let mut balance = MockBalancePort::new();
        balance.expect_select_by_id().returning(move |user_id| {
            Ok(UserPoint {
                user_id,
                point,
                updated_at: 0,
            })
        });
        balance
    }

    #[rstest]
    #[tokio::test]
    async fn test_call(user_id: UserId) -> Result<(), BoxError> {
        // GIVEN
        // * a balance port with 500 points for the user
        // * a history port expecting one USE entry
        let mut balance = balance_with(500);
        balance
            .expect_insert_or_update()
            .times(1)
            .with(eq(user_id), eq(300), always())
            .returning(|user_id, point, updated_at| {
                Ok(UserPoint {
                    user_id,
                    point,
                    updated_at,
                })
            });
        let mut history = MockHistoryPort::new();
        history
            .expect_insert()
            .times(1)
            .with(eq(user_id), eq(200), eq(TransactionType::Use), always())
            .returning(|user_id, amount, kind, timestamp| {
                Ok(PointHistory {
                    id: 1,
                    user_id,
                    amount,
                    kind,
                    timestamp,
                })
            });
        let domain = DomainLogic::new(Arc::new(balance), Arc::new(history));

        // WHEN using 200 points
        let res = domain
            .clone()
            .oneshot(UsePointsRequest {
                user_id,
                amount: 200,
            })
            .await;

        // THEN
        // * the remaining balance is returned
        // * all ports are called
        assert_that!(res)
            .is_ok()
            .matches(|user_point| user_point.point == 300);
        Arc::into_inner(domain.balance).unwrap().checkpoint();
        Arc::into_inner(domain.history).unwrap().checkpoint();

        Ok(())
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[tokio::test]
    async fn test_call_invalid_amount(user_id: UserId, #[case] amount: i64) {
        // GIVEN ports that must not be called
        let mut balance = MockBalancePort::new();
        balance.expect_select_by_id().never();
        balance.expect_insert_or_update().never();
        let mut history = MockHistoryPort::new();
        history.expect_insert().never();
        let mut domain = DomainLogic::new(Arc::new(balance), Arc::new(history));

        // WHEN using a non-positive amount
        let res = domain.call(UsePointsRequest { user_id, amount }).await;

        // THEN it fails without touching the stores
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::InvalidAmount { .. }));
    }

    #[rstest]
    #[case(500, 600)]
    #[case(0, 1)]
    #[tokio::test]
    async fn test_call_insufficient_balance(
        user_id: UserId,
        #[case] point: i64,
        #[case] amount: i64,
    ) {
        // GIVEN a balance smaller than the requested amount and no writes allowed
        let mut balance = balance_with(point);
        balance.expect_insert_or_update().never();
        let mut history = MockHistoryPort::new();
        history.expect_insert().never();
        let mut domain = DomainLogic::new(Arc::new(balance), Arc::new(history));

        // WHEN using more than available
        let res = domain.call(UsePointsRequest { user_id, amount }).await;

        // THEN it fails with InsufficientBalance
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::InsufficientBalance { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn test_call_history_port_failure(user_id: UserId) {
        // GIVEN
        // * a balance port with 100 points, stored at time 0
        // * a history port that cannot be reached
        let mut balance = balance_with(100);
        balance
            .expect_insert_or_update()
            .times(1)
            .with(eq(user_id), eq(90), always())
            .returning(|user_id, point, updated_at| {
                Ok(UserPoint {
                    user_id,
                    point,
                    updated_at,
                })
            });
        balance
            .expect_insert_or_update()
            .times(1)
            .with(eq(user_id), eq(100), eq(0))
            .returning(|user_id, point, updated_at| {
                Ok(UserPoint {
                    user_id,
                    point,
                    updated_at,
                })
            });
        let mut history = MockHistoryPort::new();
        history.expect_insert().times(1).returning(|_, _, _, _| {
            Err(crate::ports::history::Error::Adapter("disk full".into()))
        });
        let domain = DomainLogic::new(Arc::new(balance), Arc::new(history));

        // WHEN using points
        let res = domain
            .clone()
            .oneshot(UsePointsRequest {
                user_id,
                amount: 10,
            })
            .await;

        // THEN
        // * the adapter error is surfaced
        // * the previous balance is written back
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::History(_)));
        Arc::into_inner(domain.balance).unwrap().checkpoint();
    }

    #[rstest]
    #[tokio::test]
    async fn test_use_entire_balance(user_id: UserId) -> Result<(), BoxError> {
        // GIVEN in-memory stores with 500 points
        let balance = Arc::new(MemoryBalanceStore::default());
        let history = Arc::new(MemoryHistoryStore::default());
        let mut domain = DomainLogic::new(balance.clone(), history.clone());
        domain
            .call(ChargeRequest {
                user_id,
                amount: 500,
            })
            .await?;

        // WHEN using all of it, then one more point
        let res = domain
            .call(UsePointsRequest {
                user_id,
                amount: 500,
            })
            .await;
        assert_that!(res).is_ok().matches(|user_point| user_point.point == 0);
        let res = domain
            .call(UsePointsRequest {
                user_id,
                amount: 1,
            })
            .await;

        // THEN
        // * the second request fails
        // * the balance stays at 0 with exactly two history entries
        assert_that!(res).is_err();
        assert_that!(balance.select_by_id(user_id).await?.point).is_equal_to(0);
        let kinds: Vec<_> = history
            .select_all_by_user_id(user_id)
            .await?
            .into_iter()
            .map(|entry| entry.kind)
            .collect();
        assert_that!(kinds).is_equal_to(vec![TransactionType::Charge, TransactionType::Use]);

        Ok(())
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_use_never_overdraws(user_id: UserId) -> Result<(), BoxError> {
        // GIVEN 100 points in a balance store that yields between read and write
        let balance = Arc::new(YieldingBalanceStore::default());
        let history = Arc::new(MemoryHistoryStore::default());
        let mut domain = DomainLogic::new(balance.clone(), history.clone());
        domain
            .call(ChargeRequest {
                user_id,
                amount: 100,
            })
            .await?;

        // WHEN 30 tasks each try to use 10 points
        let tasks: Vec<_> = (0..30)
            .map(|_| {
                let mut domain = domain.clone();
                tokio::spawn(async move {
                    domain
                        .call(UsePointsRequest {
                            user_id,
                            amount: 10,
                        })
                        .await
                })
            })
            .collect();
        let mut succeeded = 0;
        for task in tasks {
            if task.await?.is_ok() {
                succeeded += 1;
            }
        }

        // THEN
        // * exactly 10 succeed and the balance ends at 0
        // * one USE entry exists per success
        assert_that!(succeeded).is_equal_to(10);
        assert_that!(balance.select_by_id(user_id).await?.point).is_equal_to(0);
        let uses = history
            .select_all_by_user_id(user_id)
            .await?
            .into_iter()
            .filter(|entry| entry.kind == TransactionType::Use)
            .count();
        assert_that!(uses).is_equal_to(10);

        Ok(())
    }
}
