//! Referral-and-reward ledger
//!
//! - [`models`] - users, balances, transactions, tasks, projections
//! - [`error`] - domain rejections and structural failures
//! - [`store`] - storage capability traits and the unit of work
//! - [`postgres`] - PostgreSQL adapter
//! - [`memory`] - in-memory adapter (test double)
//! - [`engine`] - Reward Engine workflows

pub mod engine;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use engine::RewardEngine;
pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use models::{
    Balance, CompletedTask, LeaderboardEntry, NewTransaction, Reference, ReferenceKind, Task,
    Transaction, User, UserProfile, UserStatus,
};
pub use postgres::PgLedger;
pub use store::{
    BalanceStore, CompletionStore, LedgerStorage, ReferralStore, TaskStore, UnitOfWork, UserStore,
};
