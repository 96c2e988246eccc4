use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{now_millis, TransactionType, UserId, UserPoint, MAX_POINT},
    locks::UserLocks,
    ports::{balance::BalancePort, history::HistoryPort},
};
use tower::Service;
use tracing::info;

use super::{append_or_restore, report, validate_amount, DomainLogic, Error};

/// Add points to the balance of a user
#[derive(Clone, Debug)]
pub struct ChargeRequest {
    pub user_id: UserId,
    pub amount: i64,
}

impl<B, H> Service<ChargeRequest> for DomainLogic<B, H>
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

    fn call(&mut self, req: ChargeRequest) -> Self::Future {
        let balance = self.balance.clone();
        let history = self.history.clone();
        let locks = self.locks.clone();
        Box::pin(async move {
            let user_id = req.user_id;
            let res = charge(balance.as_ref(), history.as_ref(), &locks, req).await;
            report("charge", user_id, res)
        })
    }
}

async fn charge<B, H>(
    balance: &B,
    history: &H,
    locks: &UserLocks,
    req: ChargeRequest,
) -> Result<UserPoint, Error>
where
    B: BalancePort,
    H: HistoryPort,
{
    validate_amount(req.amount)?;

    let _guard = locks.lock(req.user_id).await;
    let current = balance.select_by_id(req.user_id).await?;
    let next = next_balance(current.point, req.amount)?;

    // Balance and history share the same instant
    let now = now_millis();
    let updated = balance.insert_or_update(req.user_id, next, now).await?;
    append_or_restore(
        balance,
        history,
        &current,
        req.amount,
        TransactionType::Charge,
        now,
    )
    .await?;

    info!(
        user_id = req.user_id,
        amount = req.amount,
        point = updated.point,
        "points charged"
    );
    Ok(updated)
}

/// Balance after charging `amount` on top of `current`
///
/// Amounts above [`MAX_POINT`] can never fit, so they are rejected before any arithmetic.
fn next_balance(current: i64, amount: i64) -> Result<i64, Error> {
    if amount > MAX_POINT {
        return Err(Error::BalanceCapExceeded { current, amount });
    }
    current
        .checked_add(amount)
        .filter(|next| *next <= MAX_POINT)
        .ok_or(Error::BalanceCapExceeded { current, amount })
}
