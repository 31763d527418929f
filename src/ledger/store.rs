//! Storage capability traits
//!
//! Each trait owns one entity's persistence and enforces that entity's
//! invariants at the storage boundary. A [`UnitOfWork`] bundles all of them
//! behind a single atomic scope: every call made through it becomes visible
//! to other units of work only on [`UnitOfWork::commit`]. Dropping a unit of
//! work without committing rolls it back.

use async_trait::async_trait;

use super::error::LedgerError;
use super::models::{
    Balance, CompletedTask, LeaderboardEntry, NewTransaction, Task, Transaction, User,
};

#[async_trait]
pub trait UserStore: Send {
    /// Insert a user. Fails with `UsernameTaken` on a duplicate username.
    async fn create_user(
        &mut self,
        username: &str,
        referrer_id: Option<i64>,
    ) -> Result<User, LedgerError>;

    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>, LedgerError>;
}

#[async_trait]
pub trait BalanceStore: Send {
    /// Create the zero balance row for a new user
    async fn create_balance(&mut self, user_id: i64) -> Result<Balance, LedgerError>;

    async fn get_balance(&mut self, user_id: i64) -> Result<Option<Balance>, LedgerError>;

    /// Add a signed delta as one conditional update.
    ///
    /// Fails with `InsufficientBalance` and leaves the row (including
    /// `updated_at`) untouched if the result would be negative or the row
    /// does not exist.
    async fn apply_delta(&mut self, user_id: i64, delta: i64) -> Result<Balance, LedgerError>;

    async fn record_transaction(
        &mut self,
        entry: NewTransaction,
    ) -> Result<Transaction, LedgerError>;

    /// Newest first
    async fn list_transactions(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// Points descending, ties by user id ascending
    async fn leaderboard(
        &mut self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError>;
}

#[async_trait]
pub trait TaskStore: Send {
    async fn get_task(&mut self, task_id: i64) -> Result<Option<Task>, LedgerError>;

    /// Active tasks by creation time ascending
    async fn list_active_tasks(&mut self) -> Result<Vec<Task>, LedgerError>;
}

#[async_trait]
pub trait CompletionStore: Send {
    async fn is_completed(&mut self, user_id: i64, task_id: i64) -> Result<bool, LedgerError>;

    /// Fails with `TaskAlreadyCompleted` if the (user, task) pair exists
    async fn record_completion(&mut self, user_id: i64, task_id: i64) -> Result<(), LedgerError>;

    /// Completion time descending
    async fn list_completed(&mut self, user_id: i64) -> Result<Vec<CompletedTask>, LedgerError>;

    /// Active tasks the user has not completed, creation time ascending
    async fn list_available(&mut self, user_id: i64) -> Result<Vec<Task>, LedgerError>;
}

#[async_trait]
pub trait ReferralStore: Send {
    /// Link `user_id` to `referrer_id` if no referrer is set yet.
    ///
    /// Check and set are a single atomic step: of two racing calls for the
    /// same user exactly one succeeds, the other gets `AlreadyHasReferrer`.
    async fn set_referrer(&mut self, user_id: i64, referrer_id: i64) -> Result<(), LedgerError>;

    async fn get_referrer(&mut self, user_id: i64) -> Result<Option<i64>, LedgerError>;

    /// Number of users whose referrer is `user_id`
    async fn referral_count(&mut self, user_id: i64) -> Result<i64, LedgerError>;
}

/// Scoped atomic unit of work over all ledger capabilities
#[async_trait]
pub trait UnitOfWork: UserStore + BalanceStore + TaskStore + CompletionStore + ReferralStore {
    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;
}

/// Factory for units of work
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError>;
}
