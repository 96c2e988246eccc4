//! Line-oriented front end over [`DomainLogic`]
//!
//! Each input line is one command:
//!
//! ```text
//! balance <user>
//! history <user>
//! charge <user> <amount>
//! use <user> <amount>
//! ```
//!
//! Each command produces a single JSON document: the record(s) on success, or an
//! [`ErrorResponse`] on failure.

use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing::error;

use crate::{
    commands::{
        charge::ChargeRequest, get_balance::GetBalanceRequest, get_history::GetHistoryRequest,
        use_points::UsePointsRequest, DomainLogic, Error,
    },
    domain::UserId,
    ports::{balance::BalancePort, history::HistoryPort},
    response::ErrorResponse,
};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Balance(UserId),
    History(UserId),
    Charge(UserId, i64),
    Use(UserId, i64),
}

impl Command {
    /// Parse one input line
    ///
    /// Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ErrorResponse> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            [] => return Ok(None),
            ["balance", user] => Command::Balance(number("user", user)?),
            ["history", user] => Command::History(number("user", user)?),
            ["charge", user, amount] => {
                Command::Charge(number("user", user)?, number("amount", amount)?)
            }
            ["use", user, amount] => Command::Use(number("user", user)?, number("amount", amount)?),
            _ => {
                return Err(ErrorResponse::bad_request(format!(
                    "unrecognised command: {}",
                    line.trim()
                )))
            }
        };
        Ok(Some(command))
    }
}

fn number(name: &str, value: &str) -> Result<i64, ErrorResponse> {
    value
        .parse()
        .map_err(|_| ErrorResponse::bad_request(format!("{name} must be an integer: {value}")))
}

/// Run a command and render its outcome as JSON
pub async fn execute<B, H>(domain: &DomainLogic<B, H>, command: Command) -> Value
where
    B: BalancePort + 'static,
    H: HistoryPort + 'static,
{
    let domain = domain.clone();
    match command {
        Command::Balance(user_id) => render(domain.oneshot(GetBalanceRequest { user_id }).await),
        Command::History(user_id) => render(domain.oneshot(GetHistoryRequest { user_id }).await),
        Command::Charge(user_id, amount) => {
            render(domain.oneshot(ChargeRequest { user_id, amount }).await)
        }
        Command::Use(user_id, amount) => {
            render(domain.oneshot(UsePointsRequest { user_id, amount }).await)
        }
    }
}

/// Parse and run one line, returning `None` for blank lines
pub async fn handle_line<B, H>(domain: &DomainLogic<B, H>, line: &str) -> Option<Value>
where
    B: BalancePort + 'static,
    H: HistoryPort + 'static,
{
    match Command::parse(line) {
        Ok(Some(command)) => Some(execute(domain, command).await),
        Ok(None) => None,
        Err(response) => Some(to_value(&response)),
    }
}

fn render<T: Serialize>(res: Result<T, Error>) -> Value {
    match res {
        Ok(value) => to_value(&value),
        Err(err) => to_value(&ErrorResponse::from(&err)),
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        error!(error = %err, "could not serialize response");
        let response = ErrorResponse::internal();
        json!({ "code": response.code, "message": response.message })
    })
}
