use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    domain::{PointHistory, UserId},
    ports::{balance::BalancePort, history::HistoryPort},
};
use tower::Service;

use super::{DomainLogic, Error};

/// List every charge and use of a user, oldest first
#[derive(Clone, Debug)]
pub struct GetHistoryRequest {
    pub user_id: UserId,
}

impl<B, H> Service<GetHistoryRequest> for DomainLogic<B, H>
where
    B: BalancePort + 'static,
    H: HistoryPort + 'static,
{
    type Response = Vec<PointHistory>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GetHistoryRequest) -> Self::Future {
        let history = self.history.clone();
        Box::pin(async move {
            history
                .select_all_by_user_id(req.user_id)
                .await
                .map_err(Error::from)
        })
    }
}
