//! Per-user point balances with an append-only history of charges and uses
//!
//! The domain operations live in [`commands`] and talk to storage through the traits in
//! [`ports`]. [`adapters`] holds concrete stores.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod locks;
pub mod ports;
pub mod response;
pub mod telemetry;
