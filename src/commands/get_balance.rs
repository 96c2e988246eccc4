use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{UserId, UserPoint},
    ports::{balance::BalancePort, history::HistoryPort},
};
use tower::Service;

use super::{DomainLogic, Error};

/// Look up the current balance of a user
#[derive(Clone, Debug)]
pub struct GetBalanceRequest {
    pub user_id: UserId,
}

impl<B, H> Service<GetBalanceRequest> for DomainLogic<B, H>
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

    fn call(&mut self, req: GetBalanceRequest) -> Self::Future {
        let balance = self.balance.clone();
        // Reads do not take the user lock
        Box::pin(async move { balance.select_by_id(req.user_id).await.map_err(Error::from) })
    }
}
