//! In-memory ledger storage
//!
//! Used as the test double for the PostgreSQL adapter. A unit of work holds
//! the store lock for its whole lifetime, so units of work are serialised
//! and each one sees every earlier commit. Writes go to a private copy that
//! replaces the shared state only on commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::LedgerError;
use super::models::{
    Balance, CompletedTask, LeaderboardEntry, NewTransaction, Task, Transaction, User,
};
use super::store::{
    BalanceStore, CompletionStore, LedgerStorage, ReferralStore, TaskStore, UnitOfWork, UserStore,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    balances: BTreeMap<i64, Balance>,
    transactions: Vec<Transaction>,
    tasks: BTreeMap<i64, Task>,
    completions: BTreeMap<(i64, i64), DateTime<Utc>>,
    next_user_id: i64,
    next_task_id: i64,
    next_transaction_id: i64,
}

/// Shared in-memory store. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<MemoryState>>,
    fail_transactions: Arc<AtomicBool>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the task catalog
    pub async fn insert_task(
        &self,
        code: &str,
        title: &str,
        reward_points: i64,
        is_active: bool,
    ) -> Task {
        let mut state = self.state.lock().await;
        state.next_task_id += 1;
        let task = Task {
            id: state.next_task_id,
            code: code.to_string(),
            title: title.to_string(),
            reward_points,
            is_active,
            created_at: Utc::now(),
        };
        state.tasks.insert(task.id, task.clone());
        task
    }

    /// Make every `record_transaction` fail with a database error
    pub fn set_fail_transactions(&self, fail: bool) {
        self.fail_transactions.store(fail, Ordering::SeqCst);
    }

    /// Committed transaction count across all users
    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }
}

#[async_trait]
impl LedgerStorage for MemoryLedger {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            fail_transactions: self.fail_transactions.load(Ordering::SeqCst),
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_transactions: bool,
}

#[async_trait]
impl UserStore for MemoryUnitOfWork {
    async fn create_user(
        &mut self,
        username: &str,
        referrer_id: Option<i64>,
    ) -> Result<User, LedgerError> {
        if self.working.users.values().any(|u| u.username == username) {
            return Err(LedgerError::UsernameTaken(username.to_string()));
        }
        if let Some(referrer_id) = referrer_id {
            if !self.working.users.contains_key(&referrer_id) {
                return Err(LedgerError::ReferrerNotFound(referrer_id));
            }
        }
        self.working.next_user_id += 1;
        let user = User {
            id: self.working.next_user_id,
            username: username.to_string(),
            referrer_id,
            created_at: Utc::now(),
        };
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>, LedgerError> {
        Ok(self.working.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl BalanceStore for MemoryUnitOfWork {
    async fn create_balance(&mut self, user_id: i64) -> Result<Balance, LedgerError> {
        if !self.working.users.contains_key(&user_id) {
            return Err(LedgerError::UserNotFound(user_id));
        }
        let balance = self
            .working
            .balances
            .entry(user_id)
            .or_insert_with(|| Balance {
                user_id,
                points: 0,
                updated_at: Utc::now(),
            });
        Ok(balance.clone())
    }

    async fn get_balance(&mut self, user_id: i64) -> Result<Option<Balance>, LedgerError> {
        Ok(self.working.balances.get(&user_id).cloned())
    }

    async fn apply_delta(&mut self, user_id: i64, delta: i64) -> Result<Balance, LedgerError> {
        let balance = self
            .working
            .balances
            .get_mut(&user_id)
            .ok_or(LedgerError::InsufficientBalance(user_id))?;

        // Overflow is structural, as `bigint out of range` is in PostgreSQL
        let points = balance
            .points
            .checked_add(delta)
            .ok_or_else(|| LedgerError::Internal("balance overflow".to_string()))?;
        if points < 0 {
            return Err(LedgerError::InsufficientBalance(user_id));
        }
        balance.points = points;
        balance.updated_at = Utc::now();
        Ok(balance.clone())
    }

    async fn record_transaction(
        &mut self,
        entry: NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        if self.fail_transactions {
            return Err(LedgerError::DatabaseError(
                "injected transaction insert failure".to_string(),
            ));
        }
        self.working.next_transaction_id += 1;
        let tx = Transaction {
            id: self.working.next_transaction_id,
            user_id: entry.user_id,
            delta: entry.delta,
            reason: entry.reason,
            reference: entry.reference,
            created_at: Utc::now(),
        };
        self.working.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn list_transactions(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, LedgerError> {
        // Ids are assigned in insertion order, so reverse id order is newest first
        Ok(self
            .working
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn leaderboard(
        &mut self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let mut rows: Vec<&Balance> = self.working.balances.values().collect();
        rows.sort_by(|a, b| b.points.cmp(&a.points).then(a.user_id.cmp(&b.user_id)));

        Ok(rows
            .into_iter()
            .enumerate()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|(i, b)| {
                self.working.users.get(&b.user_id).map(|u| LeaderboardEntry {
                    rank: i as i64 + 1,
                    user_id: b.user_id,
                    username: u.username.clone(),
                    points: b.points,
                })
            })
            .collect())
    }
}

#[async_trait]
impl TaskStore for MemoryUnitOfWork {
    async fn get_task(&mut self, task_id: i64) -> Result<Option<Task>, LedgerError> {
        Ok(self.working.tasks.get(&task_id).cloned())
    }

    async fn list_active_tasks(&mut self) -> Result<Vec<Task>, LedgerError> {
        let mut tasks: Vec<Task> = self
            .working
            .tasks
            .values()
            .filter(|t| t.is_active)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }
}

#[async_trait]
impl CompletionStore for MemoryUnitOfWork {
    async fn is_completed(&mut self, user_id: i64, task_id: i64) -> Result<bool, LedgerError> {
        Ok(self.working.completions.contains_key(&(user_id, task_id)))
    }

    async fn record_completion(&mut self, user_id: i64, task_id: i64) -> Result<(), LedgerError> {
        if self.working.completions.contains_key(&(user_id, task_id)) {
            return Err(LedgerError::TaskAlreadyCompleted { user_id, task_id });
        }
        self.working
            .completions
            .insert((user_id, task_id), Utc::now());
        Ok(())
    }

    async fn list_completed(&mut self, user_id: i64) -> Result<Vec<CompletedTask>, LedgerError> {
        let mut completed: Vec<CompletedTask> = self
            .working
            .completions
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .filter_map(|((_, task_id), completed_at)| {
                self.working.tasks.get(task_id).map(|t| CompletedTask {
                    task_id: t.id,
                    code: t.code.clone(),
                    title: t.title.clone(),
                    reward_points: t.reward_points,
                    completed_at: *completed_at,
                })
            })
            .collect();
        completed.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then(b.task_id.cmp(&a.task_id))
        });
        Ok(completed)
    }

    async fn list_available(&mut self, user_id: i64) -> Result<Vec<Task>, LedgerError> {
        let active = self.list_active_tasks().await?;
        Ok(active
            .into_iter()
            .filter(|t| !self.working.completions.contains_key(&(user_id, t.id)))
            .collect())
    }
}

#[async_trait]
impl ReferralStore for MemoryUnitOfWork {
    async fn set_referrer(&mut self, user_id: i64, referrer_id: i64) -> Result<(), LedgerError> {
        if user_id == referrer_id {
            return Err(LedgerError::SelfReferral(user_id));
        }
        if !self.working.users.contains_key(&referrer_id) {
            return Err(LedgerError::ReferrerNotFound(referrer_id));
        }
        let user = self
            .working
            .users
            .get_mut(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        if user.referrer_id.is_some() {
            return Err(LedgerError::AlreadyHasReferrer(user_id));
        }
        user.referrer_id = Some(referrer_id);
        Ok(())
    }

    async fn get_referrer(&mut self, user_id: i64) -> Result<Option<i64>, LedgerError> {
        Ok(self
            .working
            .users
            .get(&user_id)
            .and_then(|u| u.referrer_id))
    }

    async fn referral_count(&mut self, user_id: i64) -> Result<i64, LedgerError> {
        Ok(self
            .working
            .users
            .values()
            .filter(|u| u.referrer_id == Some(user_id))
            .count() as i64)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
