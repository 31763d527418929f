//! Points Ledger - referral and task reward backend
//!
//! Users earn points by referring other users and by completing tasks.
//! Every change to a balance is paired with an append-only transaction in
//! the same commit, so the ledger always explains the balance.
//!
//! # Modules
//!
//! - [`ledger`] - Reward Engine, storage traits, PostgreSQL and in-memory stores
//! - [`gateway`] - HTTP routes, response envelope, OpenAPI docs
//! - [`user_auth`] - JWT issue/verify and the auth middleware
//! - [`config`] - YAML configuration with environment overrides
//! - [`db`] - PostgreSQL pool and migrations
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod user_auth;

// Convenient re-exports at crate root
pub use config::{AppConfig, RewardsConfig};
pub use ledger::{LedgerError, MemoryLedger, PgLedger, RewardEngine};
