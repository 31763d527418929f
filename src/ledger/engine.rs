//! Reward Engine
//!
//! Orchestrates the referral and task workflows over the storage
//! capabilities. Each workflow call acquires exactly one unit of work,
//! threads it through every step, and commits once at the end. Any `?`
//! before the commit drops the unit of work, which rolls back every
//! earlier step of the same call.
//!
//! ```text
//! create_user:   user ─▶ balance(0) ─▶ [referee bonus] ─▶ [referrer bonus] ─▶ commit
//! set_referrer:  link  ─▶ [referee bonus] ─▶ [referrer bonus] ─▶ commit
//! complete_task: completion ─▶ [reward credit + transaction] ─▶ commit
//! ```

use std::sync::Arc;

use crate::config::RewardsConfig;

use super::error::LedgerError;
use super::models::{
    LeaderboardEntry, NewTransaction, Reference, Task, Transaction, User, UserProfile, UserStatus,
};
use super::store::{LedgerStorage, UnitOfWork};

pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_PAGE_LIMIT: i64 = 100;

pub const REASON_REFEREE_BONUS: &str = "Referral signup bonus";
pub const REASON_REFERRAL_REWARD: &str = "Referral reward";

pub struct RewardEngine {
    storage: Arc<dyn LedgerStorage>,
    rewards: RewardsConfig,
}

impl RewardEngine {
    pub fn new(storage: Arc<dyn LedgerStorage>, rewards: RewardsConfig) -> Self {
        tracing::info!(
            backend = storage.name(),
            referral_bonus = rewards.referral_bonus,
            referee_bonus = rewards.referee_bonus,
            "Reward engine initialized"
        );
        Self { storage, rewards }
    }

    pub fn rewards(&self) -> &RewardsConfig {
        &self.rewards
    }

    // ========================================================================
    // Workflows
    // ========================================================================

    /// Register a user, optionally linked to an existing referrer.
    pub async fn create_user(
        &self,
        username: &str,
        referrer_id: Option<i64>,
    ) -> Result<User, LedgerError> {
        let username = validate_username(username)?;

        let mut uow = self.storage.begin().await?;

        if let Some(referrer_id) = referrer_id {
            if uow.get_user(referrer_id).await?.is_none() {
                return Err(LedgerError::ReferrerNotFound(referrer_id));
            }
        }

        let user = uow.create_user(username, referrer_id).await?;
        uow.create_balance(user.id).await?;

        if let Some(referrer_id) = referrer_id {
            if referrer_id == user.id {
                return Err(LedgerError::SelfReferral(user.id));
            }
            self.grant_referral_bonuses(uow.as_mut(), user.id, referrer_id)
                .await?;
        }

        uow.commit().await?;

        tracing::info!(
            user_id = user.id,
            username = %user.username,
            referrer_id = ?user.referrer_id,
            "User created"
        );
        Ok(user)
    }

    /// Link an existing user to a referrer. A referrer can be set once.
    pub async fn set_referrer(&self, user_id: i64, referrer_id: i64) -> Result<(), LedgerError> {
        let mut uow = self.storage.begin().await?;

        let user = uow
            .get_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))?;
        if user.referrer_id.is_some() {
            return Err(LedgerError::AlreadyHasReferrer(user_id));
        }
        if user_id == referrer_id {
            return Err(LedgerError::SelfReferral(user_id));
        }

        // The store re-checks atomically; a concurrent winner surfaces here
        uow.set_referrer(user_id, referrer_id).await?;
        self.grant_referral_bonuses(uow.as_mut(), user_id, referrer_id)
            .await?;

        uow.commit().await?;

        tracing::info!(user_id, referrer_id, "Referrer set");
        Ok(())
    }

    /// Mark a task completed for a user and credit its reward.
    ///
    /// Returns the reward transaction, or `None` for zero-reward tasks.
    pub async fn complete_task(
        &self,
        user_id: i64,
        task_id: i64,
    ) -> Result<Option<Transaction>, LedgerError> {
        let mut uow = self.storage.begin().await?;

        if uow.get_user(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(user_id));
        }

        let task = uow
            .get_task(task_id)
            .await?
            .ok_or(LedgerError::TaskNotFound(task_id))?;
        if !task.is_active {
            return Err(LedgerError::TaskInactive(task_id));
        }

        // Insert is the dedup point, no separate is_completed lookup
        uow.record_completion(user_id, task_id).await?;

        let reward = if task.reward_points > 0 {
            let entry = NewTransaction::new(
                user_id,
                task.reward_points,
                format!("Task completed: {}", task.title),
            )
            .with_reference(Reference::task(task_id));
            Some(credit(uow.as_mut(), entry).await?)
        } else {
            None
        };

        uow.commit().await?;

        tracing::info!(
            user_id,
            task_id,
            reward = task.reward_points,
            "Task completed"
        );
        Ok(reward)
    }

    /// Administrative signed adjustment.
    ///
    /// A debit that would take the balance below zero is rejected and
    /// leaves no transaction behind. So is a zero delta, since every
    /// ledger row must move the balance.
    pub async fn adjust_balance(
        &self,
        user_id: i64,
        delta: i64,
        reason: &str,
    ) -> Result<Transaction, LedgerError> {
        if delta == 0 {
            return Err(LedgerError::ZeroAdjustment);
        }
        let mut uow = self.storage.begin().await?;

        if uow.get_user(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(user_id));
        }
        let balance = uow.apply_delta(user_id, delta).await?;
        let tx = uow
            .record_transaction(NewTransaction::new(user_id, delta, reason))
            .await?;

        uow.commit().await?;

        tracing::info!(user_id, delta, points = balance.points, reason, "Balance adjusted");
        Ok(tx)
    }

    // ========================================================================
    // Read paths
    // ========================================================================

    pub async fn get_user(&self, user_id: i64) -> Result<UserProfile, LedgerError> {
        let mut uow = self.storage.begin().await?;
        load_profile(uow.as_mut(), user_id).await
    }

    /// Balance plus completed tasks, newest completion first
    pub async fn get_status(&self, user_id: i64) -> Result<UserStatus, LedgerError> {
        let mut uow = self.storage.begin().await?;
        let profile = load_profile(uow.as_mut(), user_id).await?;
        let completed_tasks = uow.list_completed(user_id).await?;
        Ok(UserStatus {
            profile,
            completed_tasks,
        })
    }

    pub async fn get_leaderboard(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let (limit, offset) = clamp_page(limit, offset);
        let mut uow = self.storage.begin().await?;
        uow.leaderboard(limit, offset).await
    }

    pub async fn get_transactions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let (limit, offset) = clamp_page(limit, offset);
        let mut uow = self.storage.begin().await?;
        if uow.get_user(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(user_id));
        }
        uow.list_transactions(user_id, limit, offset).await
    }

    /// Active task catalog
    pub async fn list_tasks(&self) -> Result<Vec<Task>, LedgerError> {
        let mut uow = self.storage.begin().await?;
        uow.list_active_tasks().await
    }

    pub async fn list_available_tasks(&self, user_id: i64) -> Result<Vec<Task>, LedgerError> {
        let mut uow = self.storage.begin().await?;
        if uow.get_user(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(user_id));
        }
        uow.list_available(user_id).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Referee and referrer credits. A zero bonus skips its credit entirely.
    ///
    /// Credits are applied in ascending user id so that two workflows
    /// touching the same pair of balance rows lock them in the same order.
    async fn grant_referral_bonuses(
        &self,
        uow: &mut dyn UnitOfWork,
        referee_id: i64,
        referrer_id: i64,
    ) -> Result<(), LedgerError> {
        let mut entries = Vec::with_capacity(2);
        if self.rewards.referee_bonus > 0 {
            entries.push(NewTransaction::new(
                referee_id,
                i64::from(self.rewards.referee_bonus),
                REASON_REFEREE_BONUS,
            ));
        }
        if self.rewards.referral_bonus > 0 {
            entries.push(
                NewTransaction::new(
                    referrer_id,
                    i64::from(self.rewards.referral_bonus),
                    REASON_REFERRAL_REWARD,
                )
                .with_reference(Reference::referral(referee_id)),
            );
        }

        entries.sort_by_key(|entry| entry.user_id);
        for entry in entries {
            credit(uow, entry).await?;
        }
        Ok(())
    }
}

/// Apply a positive delta and record its transaction.
///
/// A positive delta can only be refused when the balance row is missing,
/// which is a broken invariant rather than a user-facing outcome.
async fn credit(
    uow: &mut dyn UnitOfWork,
    entry: NewTransaction,
) -> Result<Transaction, LedgerError> {
    debug_assert!(entry.delta > 0);
    match uow.apply_delta(entry.user_id, entry.delta).await {
        Ok(_) => {}
        Err(LedgerError::InsufficientBalance(user_id)) => {
            tracing::error!(user_id, delta = entry.delta, "Credit refused: balance row missing");
            return Err(LedgerError::Internal(format!(
                "balance row missing for user {}",
                user_id
            )));
        }
        Err(e) => return Err(e),
    }
    uow.record_transaction(entry).await
}

async fn load_profile(uow: &mut dyn UnitOfWork, user_id: i64) -> Result<UserProfile, LedgerError> {
    let user = uow
        .get_user(user_id)
        .await?
        .ok_or(LedgerError::UserNotFound(user_id))?;
    let balance = uow
        .get_balance(user_id)
        .await?
        .map(|b| b.points)
        .unwrap_or(0);
    let referral_count = uow.referral_count(user_id).await?;
    Ok(UserProfile {
        user,
        balance,
        referral_count,
    })
}

fn validate_username(username: &str) -> Result<&str, LedgerError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(LedgerError::InvalidUsername);
    }
    Ok(username)
}

fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_LIMIT), offset.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryLedger;
    use crate::ledger::models::ReferenceKind;

    struct TestHarness {
        engine: Arc<RewardEngine>,
        ledger: MemoryLedger,
    }

    impl TestHarness {
        fn new(referral_bonus: u32, referee_bonus: u32) -> Self {
            let ledger = MemoryLedger::new();
            let engine = Arc::new(RewardEngine::new(
                Arc::new(ledger.clone()),
                RewardsConfig {
                    referral_bonus,
                    referee_bonus,
                },
            ));
            Self { engine, ledger }
        }

        async fn balance(&self, user_id: i64) -> i64 {
            self.engine.get_user(user_id).await.unwrap().balance
        }
    }

    // ========================================================================
    // create_user
    // ========================================================================

    #[tokio::test]
    async fn test_create_user_starts_at_zero() {
        let h = TestHarness::new(100, 50);
        let user = h.engine.create_user("alice", None).await.unwrap();
        assert_eq!(user.referrer_id, None);
        assert_eq!(h.balance(user.id).await, 0);
        assert_eq!(h.ledger.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_user_trims_and_validates_username() {
        let h = TestHarness::new(100, 50);
        let user = h.engine.create_user("  bob ", None).await.unwrap();
        assert_eq!(user.username, "bob");

        assert_eq!(
            h.engine.create_user("   ", None).await.unwrap_err(),
            LedgerError::InvalidUsername
        );
        let long = "x".repeat(MAX_USERNAME_LEN + 1);
        assert_eq!(
            h.engine.create_user(&long, None).await.unwrap_err(),
            LedgerError::InvalidUsername
        );
    }

    #[tokio::test]
    async fn test_create_user_duplicate_username() {
        let h = TestHarness::new(100, 50);
        h.engine.create_user("carol", None).await.unwrap();
        assert_eq!(
            h.engine.create_user("carol", None).await.unwrap_err(),
            LedgerError::UsernameTaken("carol".to_string())
        );
    }

    #[tokio::test]
    async fn test_create_user_with_referrer_grants_both_bonuses() {
        let h = TestHarness::new(100, 50);
        let referrer = h.engine.create_user("referrer", None).await.unwrap();
        let referee = h
            .engine
            .create_user("referee", Some(referrer.id))
            .await
            .unwrap();

        assert_eq!(referee.referrer_id, Some(referrer.id));
        assert_eq!(h.balance(referee.id).await, 50);
        assert_eq!(h.balance(referrer.id).await, 100);

        let referee_txs = h.engine.get_transactions(referee.id, 10, 0).await.unwrap();
        assert_eq!(referee_txs.len(), 1);
        assert_eq!(referee_txs[0].delta, 50);
        assert_eq!(referee_txs[0].reason, REASON_REFEREE_BONUS);
        assert_eq!(referee_txs[0].reference, None);

        let referrer_txs = h.engine.get_transactions(referrer.id, 10, 0).await.unwrap();
        assert_eq!(referrer_txs.len(), 1);
        assert_eq!(referrer_txs[0].delta, 100);
        assert_eq!(referrer_txs[0].reason, REASON_REFERRAL_REWARD);
        assert_eq!(
            referrer_txs[0].reference,
            Some(Reference {
                id: referee.id,
                kind: ReferenceKind::Referral
            })
        );

        let profile = h.engine.get_user(referrer.id).await.unwrap();
        assert_eq!(profile.referral_count, 1);

        // Lower user id is credited first
        assert!(referrer_txs[0].id < referee_txs[0].id);
    }

    #[tokio::test]
    async fn test_zero_bonus_skips_transaction() {
        let h = TestHarness::new(0, 50);
        let referrer = h.engine.create_user("r", None).await.unwrap();
        let referee = h.engine.create_user("e", Some(referrer.id)).await.unwrap();

        assert_eq!(h.balance(referrer.id).await, 0);
        assert!(
            h.engine
                .get_transactions(referrer.id, 10, 0)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(h.balance(referee.id).await, 50);
        assert_eq!(h.ledger.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_user_unknown_referrer() {
        let h = TestHarness::new(100, 50);
        assert_eq!(
            h.engine.create_user("dave", Some(77)).await.unwrap_err(),
            LedgerError::ReferrerNotFound(77)
        );
        // Nothing committed: the username is still free
        h.engine.create_user("dave", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_user_rolls_back_when_bonus_fails() {
        let h = TestHarness::new(100, 50);
        let referrer = h.engine.create_user("ref", None).await.unwrap();

        h.ledger.set_fail_transactions(true);
        let err = h
            .engine
            .create_user("newbie", Some(referrer.id))
            .await
            .unwrap_err();
        assert!(!err.is_rejection());
        h.ledger.set_fail_transactions(false);

        assert_eq!(h.balance(referrer.id).await, 0);
        assert_eq!(h.engine.get_user(referrer.id).await.unwrap().referral_count, 0);
        // The user row was rolled back too
        h.engine.create_user("newbie", None).await.unwrap();
    }

    // ========================================================================
    // set_referrer
    // ========================================================================

    #[tokio::test]
    async fn test_set_referrer_grants_bonuses() {
        let h = TestHarness::new(100, 50);
        let a = h.engine.create_user("a", None).await.unwrap();
        let b = h.engine.create_user("b", None).await.unwrap();

        h.engine.set_referrer(b.id, a.id).await.unwrap();

        assert_eq!(h.balance(b.id).await, 50);
        assert_eq!(h.balance(a.id).await, 100);
        assert_eq!(h.engine.get_user(b.id).await.unwrap().user.referrer_id, Some(a.id));
    }

    #[tokio::test]
    async fn test_set_referrer_rejections() {
        let h = TestHarness::new(100, 50);
        let a = h.engine.create_user("a", None).await.unwrap();
        let b = h.engine.create_user("b", Some(a.id)).await.unwrap();
        let c = h.engine.create_user("c", None).await.unwrap();

        assert_eq!(
            h.engine.set_referrer(999, a.id).await.unwrap_err(),
            LedgerError::UserNotFound(999)
        );
        // Referrer assigned at registration is final
        assert_eq!(
            h.engine.set_referrer(b.id, c.id).await.unwrap_err(),
            LedgerError::AlreadyHasReferrer(b.id)
        );
        assert_eq!(
            h.engine.set_referrer(c.id, c.id).await.unwrap_err(),
            LedgerError::SelfReferral(c.id)
        );
        assert_eq!(
            h.engine.set_referrer(c.id, 404).await.unwrap_err(),
            LedgerError::ReferrerNotFound(404)
        );
        assert_eq!(h.balance(c.id).await, 0);
    }

    #[tokio::test]
    async fn test_set_referrer_concurrent_single_winner() {
        let h = TestHarness::new(100, 50);
        let a = h.engine.create_user("a", None).await.unwrap();
        let b = h.engine.create_user("b", None).await.unwrap();
        let target = h.engine.create_user("target", None).await.unwrap();

        let (r1, r2) = tokio::join!(
            h.engine.set_referrer(target.id, a.id),
            h.engine.set_referrer(target.id, b.id)
        );

        let results = [r1, r2];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| *r == Err(LedgerError::AlreadyHasReferrer(target.id)))
        );
        // Exactly one referee bonus and one referrer reward
        assert_eq!(h.balance(target.id).await, 50);
        assert_eq!(h.balance(a.id).await + h.balance(b.id).await, 100);
    }

    // ========================================================================
    // complete_task
    // ========================================================================

    #[tokio::test]
    async fn test_complete_task_credits_reward() {
        let h = TestHarness::new(100, 50);
        let task = h.ledger.insert_task("FOLLOW", "Follow us", 25, true).await;
        let user = h.engine.create_user("u", None).await.unwrap();

        let tx = h.engine.complete_task(user.id, task.id).await.unwrap().unwrap();
        assert_eq!(tx.delta, 25);
        assert_eq!(tx.reason, "Task completed: Follow us");
        assert_eq!(tx.reference, Some(Reference::task(task.id)));

        let status = h.engine.get_status(user.id).await.unwrap();
        assert_eq!(status.profile.balance, 25);
        assert_eq!(status.completed_tasks.len(), 1);
        assert_eq!(status.completed_tasks[0].code, "FOLLOW");

        assert!(h.engine.list_available_tasks(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_task_zero_reward_records_completion_only() {
        let h = TestHarness::new(100, 50);
        let task = h.ledger.insert_task("READ", "Read the rules", 0, true).await;
        let user = h.engine.create_user("u", None).await.unwrap();

        assert_eq!(h.engine.complete_task(user.id, task.id).await.unwrap(), None);
        assert_eq!(h.ledger.transaction_count().await, 0);
        assert_eq!(
            h.engine.complete_task(user.id, task.id).await.unwrap_err(),
            LedgerError::TaskAlreadyCompleted {
                user_id: user.id,
                task_id: task.id
            }
        );
    }

    #[tokio::test]
    async fn test_complete_task_rejections() {
        let h = TestHarness::new(100, 50);
        let inactive = h.ledger.insert_task("OLD", "Retired", 40, false).await;
        let user = h.engine.create_user("u", None).await.unwrap();

        assert_eq!(
            h.engine.complete_task(user.id, 12345).await.unwrap_err(),
            LedgerError::TaskNotFound(12345)
        );
        assert_eq!(
            h.engine.complete_task(user.id, inactive.id).await.unwrap_err(),
            LedgerError::TaskInactive(inactive.id)
        );
        assert_eq!(
            h.engine.complete_task(999, inactive.id).await.unwrap_err(),
            LedgerError::UserNotFound(999)
        );

        let status = h.engine.get_status(user.id).await.unwrap();
        assert_eq!(status.profile.balance, 0);
        assert!(status.completed_tasks.is_empty());
    }

    #[tokio::test]
    async fn test_complete_task_concurrent_single_reward() {
        let h = TestHarness::new(100, 50);
        let task = h.ledger.insert_task("SHARE", "Share a post", 30, true).await;
        let user = h.engine.create_user("u", None).await.unwrap();

        let (user_id, task_id) = (user.id, task.id);
        let attempts = (0..8).map(|_| {
            let engine = h.engine.clone();
            tokio::spawn(async move { engine.complete_task(user_id, task_id).await })
        });
        let results: Vec<_> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().filter(|r| r.is_err()).all(|r| matches!(
            r,
            Err(LedgerError::TaskAlreadyCompleted { .. })
        )));
        assert_eq!(h.balance(user.id).await, 30);
        assert_eq!(h.ledger.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_complete_task_rolls_back_completion_on_failure() {
        let h = TestHarness::new(100, 50);
        let task = h.ledger.insert_task("QUIZ", "Pass the quiz", 10, true).await;
        let user = h.engine.create_user("u", None).await.unwrap();

        h.ledger.set_fail_transactions(true);
        assert!(h.engine.complete_task(user.id, task.id).await.is_err());
        h.ledger.set_fail_transactions(false);

        // No orphan completion, no credit: the task can still be completed
        assert_eq!(h.balance(user.id).await, 0);
        assert!(h.engine.complete_task(user.id, task.id).await.is_ok());
        assert_eq!(h.balance(user.id).await, 10);
    }

    // ========================================================================
    // adjust_balance / reads
    // ========================================================================

    #[tokio::test]
    async fn test_adjust_balance_never_negative() {
        let h = TestHarness::new(100, 50);
        let user = h.engine.create_user("u", None).await.unwrap();

        h.engine.adjust_balance(user.id, 40, "manual credit").await.unwrap();
        h.engine.adjust_balance(user.id, -15, "penalty").await.unwrap();
        assert_eq!(
            h.engine.adjust_balance(user.id, -26, "penalty").await.unwrap_err(),
            LedgerError::InsufficientBalance(user.id)
        );
        assert_eq!(h.balance(user.id).await, 25);

        let txs = h.engine.get_transactions(user.id, 10, 0).await.unwrap();
        let deltas: Vec<i64> = txs.iter().map(|t| t.delta).collect();
        assert_eq!(deltas, vec![-15, 40]);
    }

    #[tokio::test]
    async fn test_mutual_referrers_settle_both_bonuses() {
        let h = TestHarness::new(100, 50);
        let x = h.engine.create_user("x", None).await.unwrap();
        let y = h.engine.create_user("y", None).await.unwrap();

        let (a, b) = tokio::join!(
            h.engine.set_referrer(x.id, y.id),
            h.engine.set_referrer(y.id, x.id)
        );
        assert_eq!(a, Ok(()));
        assert_eq!(b, Ok(()));

        // Each is both a referee and a referrer
        assert_eq!(h.balance(x.id).await, 150);
        assert_eq!(h.balance(y.id).await, 150);
        assert_eq!(h.ledger.transaction_count().await, 4);
    }

    #[tokio::test]
    async fn test_adjust_balance_rejects_zero_delta() {
        let h = TestHarness::new(100, 50);
        let user = h.engine.create_user("idle", None).await.unwrap();

        assert_eq!(
            h.engine.adjust_balance(user.id, 0, "noop").await.unwrap_err(),
            LedgerError::ZeroAdjustment
        );
        assert_eq!(h.ledger.transaction_count().await, 0);
        assert_eq!(h.balance(user.id).await, 0);
    }

    #[tokio::test]
    async fn test_adjust_balance_overflow_rolls_back() {
        let h = TestHarness::new(100, 50);
        let user = h.engine.create_user("whale", None).await.unwrap();
        h.engine.adjust_balance(user.id, i64::MAX, "seed").await.unwrap();

        let err = h.engine.adjust_balance(user.id, 1, "one more").await.unwrap_err();
        assert_eq!(err, LedgerError::Internal("balance overflow".to_string()));
        assert_eq!(h.balance(user.id).await, i64::MAX);
        assert_eq!(h.ledger.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_leaderboard_pagination() {
        let h = TestHarness::new(100, 50);
        for (name, points) in [("p30", 30), ("p10", 10), ("p20", 20)] {
            let u = h.engine.create_user(name, None).await.unwrap();
            h.engine.adjust_balance(u.id, points, "seed").await.unwrap();
        }

        let top = h.engine.get_leaderboard(2, 0).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!((top[0].username.as_str(), top[0].rank), ("p30", 1));
        assert_eq!((top[1].username.as_str(), top[1].rank), ("p20", 2));

        let rest = h.engine.get_leaderboard(2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!((rest[0].username.as_str(), rest[0].rank), ("p10", 3));

        // Out-of-range paging is clamped, not rejected
        assert_eq!(h.engine.get_leaderboard(0, -5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_status_unknown_user() {
        let h = TestHarness::new(100, 50);
        assert_eq!(
            h.engine.get_status(5).await.unwrap_err(),
            LedgerError::UserNotFound(5)
        );
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, -1), (1, 0));
        assert_eq!(clamp_page(500, 20), (MAX_PAGE_LIMIT, 20));
        assert_eq!(clamp_page(10, 0), (10, 0));
    }
}
