//! PostgreSQL ledger storage
//!
//! Every unit of work is one database transaction. Invariants are enforced
//! by the statements themselves (conditional updates, `ON CONFLICT`) so no
//! check-then-act pair ever spans two statements without a guard.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};

use super::error::LedgerError;
use super::models::{
    Balance, CompletedTask, LeaderboardEntry, NewTransaction, Reference, ReferenceKind, Task,
    Transaction, User,
};
use super::store::{
    BalanceStore, CompletionStore, LedgerStorage, ReferralStore, TaskStore, UnitOfWork, UserStore,
};

/// Ledger storage backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStorage for PgLedger {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// One open database transaction. Rolled back on drop unless committed.
pub struct PgUnitOfWork {
    tx: sqlx::Transaction<'static, Postgres>,
}

// ============================================================================
// Row mapping
// ============================================================================

fn row_to_user(row: &PgRow) -> Result<User, LedgerError> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        referrer_id: row.try_get("referrer_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_balance(row: &PgRow) -> Result<Balance, LedgerError> {
    Ok(Balance {
        user_id: row.try_get("user_id")?,
        points: row.try_get("points")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, LedgerError> {
    let reference_id: Option<i64> = row.try_get("reference_id")?;
    let reference_type: Option<String> = row.try_get("reference_type")?;

    let reference = match (reference_id, reference_type) {
        (Some(id), Some(kind)) => Some(Reference {
            id,
            kind: kind.parse::<ReferenceKind>().map_err(LedgerError::Internal)?,
        }),
        (None, None) => None,
        _ => {
            return Err(LedgerError::Internal(
                "transaction reference id and type must be set together".to_string(),
            ));
        }
    };

    Ok(Transaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        delta: row.try_get("delta")?,
        reason: row.try_get("reason")?,
        reference,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_task(row: &PgRow) -> Result<Task, LedgerError> {
    Ok(Task {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        title: row.try_get("title")?,
        reward_points: row.try_get("reward_points")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_completed_task(row: &PgRow) -> Result<CompletedTask, LedgerError> {
    Ok(CompletedTask {
        task_id: row.try_get("task_id")?,
        code: row.try_get("code")?,
        title: row.try_get("title")?,
        reward_points: row.try_get("reward_points")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn row_to_leaderboard_entry(row: &PgRow) -> Result<LeaderboardEntry, LedgerError> {
    Ok(LeaderboardEntry {
        rank: row.try_get("rank")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        points: row.try_get("points")?,
    })
}

// ============================================================================
// Capability implementations
// ============================================================================

#[async_trait]
impl UserStore for PgUnitOfWork {
    async fn create_user(
        &mut self,
        username: &str,
        referrer_id: Option<i64>,
    ) -> Result<User, LedgerError> {
        let row = sqlx::query(
            r#"INSERT INTO users (username, referrer_id)
               VALUES ($1, $2)
               ON CONFLICT (username) DO NOTHING
               RETURNING id, username, referrer_id, created_at"#,
        )
        .bind(username)
        .bind(referrer_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(LedgerError::UsernameTaken(username.to_string())),
        }
    }

    async fn get_user(&mut self, user_id: i64) -> Result<Option<User>, LedgerError> {
        let row = sqlx::query(
            r#"SELECT id, username, referrer_id, created_at
               FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl BalanceStore for PgUnitOfWork {
    async fn create_balance(&mut self, user_id: i64) -> Result<Balance, LedgerError> {
        let row = sqlx::query(
            r#"INSERT INTO balances (user_id, points)
               VALUES ($1, 0)
               RETURNING user_id, points, updated_at"#,
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_balance(&row)
    }

    async fn get_balance(&mut self, user_id: i64) -> Result<Option<Balance>, LedgerError> {
        let row = sqlx::query(
            r#"SELECT user_id, points, updated_at
               FROM balances WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_balance).transpose()
    }

    async fn apply_delta(&mut self, user_id: i64, delta: i64) -> Result<Balance, LedgerError> {
        // Zero rows is the rejection signal: missing row or negative result
        let row = sqlx::query(
            r#"UPDATE balances
               SET points = points + $2, updated_at = NOW()
               WHERE user_id = $1 AND points + $2 >= 0
               RETURNING user_id, points, updated_at"#,
        )
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => row_to_balance(&row),
            None => Err(LedgerError::InsufficientBalance(user_id)),
        }
    }

    async fn record_transaction(
        &mut self,
        entry: NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        let row = sqlx::query(
            r#"INSERT INTO transactions (user_id, delta, reason, reference_id, reference_type)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, user_id, delta, reason, reference_id, reference_type, created_at"#,
        )
        .bind(entry.user_id)
        .bind(entry.delta)
        .bind(&entry.reason)
        .bind(entry.reference.map(|r| r.id))
        .bind(entry.reference.map(|r| r.kind.as_str()))
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_transaction(&row)
    }

    async fn list_transactions(
        &mut self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, delta, reason, reference_id, reference_type, created_at
               FROM transactions
               WHERE user_id = $1
               ORDER BY created_at DESC, id DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    async fn leaderboard(
        &mut self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT ROW_NUMBER() OVER (ORDER BY b.points DESC, b.user_id ASC) AS rank,
                      b.user_id, u.username, b.points
               FROM balances b
               JOIN users u ON u.id = b.user_id
               ORDER BY b.points DESC, b.user_id ASC
               LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_leaderboard_entry).collect()
    }
}

#[async_trait]
impl TaskStore for PgUnitOfWork {
    async fn get_task(&mut self, task_id: i64) -> Result<Option<Task>, LedgerError> {
        let row = sqlx::query(
            r#"SELECT id, code, title, reward_points, is_active, created_at
               FROM tasks WHERE id = $1"#,
        )
        .bind(task_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn list_active_tasks(&mut self) -> Result<Vec<Task>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT id, code, title, reward_points, is_active, created_at
               FROM tasks
               WHERE is_active
               ORDER BY created_at ASC, id ASC"#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_task).collect()
    }
}

#[async_trait]
impl CompletionStore for PgUnitOfWork {
    async fn is_completed(&mut self, user_id: i64, task_id: i64) -> Result<bool, LedgerError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_tasks WHERE user_id = $1 AND task_id = $2)",
        )
        .bind(user_id)
        .bind(task_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn record_completion(&mut self, user_id: i64, task_id: i64) -> Result<(), LedgerError> {
        // A concurrent insert of the same pair blocks here until the other
        // transaction resolves, then yields zero rows if it committed.
        let result = sqlx::query(
            r#"INSERT INTO user_tasks (user_id, task_id)
               VALUES ($1, $2)
               ON CONFLICT (user_id, task_id) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(task_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::TaskAlreadyCompleted { user_id, task_id });
        }
        Ok(())
    }

    async fn list_completed(&mut self, user_id: i64) -> Result<Vec<CompletedTask>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT ut.task_id, t.code, t.title, t.reward_points, ut.completed_at
               FROM user_tasks ut
               JOIN tasks t ON t.id = ut.task_id
               WHERE ut.user_id = $1
               ORDER BY ut.completed_at DESC, ut.task_id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_completed_task).collect()
    }

    async fn list_available(&mut self, user_id: i64) -> Result<Vec<Task>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT t.id, t.code, t.title, t.reward_points, t.is_active, t.created_at
               FROM tasks t
               WHERE t.is_active
                 AND NOT EXISTS (
                     SELECT 1 FROM user_tasks ut
                     WHERE ut.task_id = t.id AND ut.user_id = $1
                 )
               ORDER BY t.created_at ASC, t.id ASC"#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_task).collect()
    }
}

#[async_trait]
impl ReferralStore for PgUnitOfWork {
    async fn set_referrer(&mut self, user_id: i64, referrer_id: i64) -> Result<(), LedgerError> {
        if user_id == referrer_id {
            return Err(LedgerError::SelfReferral(user_id));
        }

        let referrer_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(referrer_id)
                .fetch_one(&mut *self.tx)
                .await?;
        if !referrer_exists {
            return Err(LedgerError::ReferrerNotFound(referrer_id));
        }

        let result = sqlx::query(
            r#"UPDATE users SET referrer_id = $2
               WHERE id = $1 AND referrer_id IS NULL"#,
        )
        .bind(user_id)
        .bind(referrer_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing updated: tell a missing user apart from a lost race
        match self.get_user(user_id).await? {
            Some(_) => Err(LedgerError::AlreadyHasReferrer(user_id)),
            None => Err(LedgerError::UserNotFound(user_id)),
        }
    }

    async fn get_referrer(&mut self, user_id: i64) -> Result<Option<i64>, LedgerError> {
        let referrer: Option<Option<i64>> =
            sqlx::query_scalar("SELECT referrer_id FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(referrer.flatten())
    }

    async fn referral_count(&mut self, user_id: i64) -> Result<i64, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE referrer_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }
}
