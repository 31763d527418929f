//! Data models for the point ledger

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Set at most once, never reassigned
    pub referrer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Current point total of a user. Never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Balance {
    pub user_id: i64,
    pub points: i64,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Transactions
// ============================================================================

/// What kind of event a transaction points back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Task,
    Referral,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::Task => "task",
            ReferenceKind::Referral => "referral",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(ReferenceKind::Task),
            "referral" => Ok(ReferenceKind::Referral),
            other => Err(format!("Unknown reference type: {}", other)),
        }
    }
}

/// Link from a transaction to the event that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Reference {
    pub id: i64,
    pub kind: ReferenceKind,
}

impl Reference {
    pub fn task(task_id: i64) -> Self {
        Self {
            id: task_id,
            kind: ReferenceKind::Task,
        }
    }

    pub fn referral(user_id: i64) -> Self {
        Self {
            id: user_id,
            kind: ReferenceKind::Referral,
        }
    }
}

/// Append-only audit record of a point delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub delta: i64,
    pub reason: String,
    pub reference: Option<Reference>,
    pub created_at: DateTime<Utc>,
}

/// Transaction to be appended (id and timestamp assigned by the store)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: i64,
    pub delta: i64,
    pub reason: String,
    pub reference: Option<Reference>,
}

impl NewTransaction {
    pub fn new(user_id: i64, delta: i64, reason: impl Into<String>) -> Self {
        Self {
            user_id,
            delta,
            reason: reason.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// Task catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Task {
    pub id: i64,
    #[schema(example = "JOIN_CHANNEL")]
    pub code: String,
    pub title: String,
    pub reward_points: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A completion record joined with its task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CompletedTask {
    pub task_id: i64,
    pub code: String,
    pub title: String,
    pub reward_points: i64,
    pub completed_at: DateTime<Utc>,
}

// ============================================================================
// Read projections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: i64,
    pub username: String,
    pub points: i64,
}

/// User with balance and referral statistics
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub balance: i64,
    pub referral_count: i64,
}

/// Profile plus completed tasks
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserStatus {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub completed_tasks: Vec<CompletedTask>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_kind_round_trip() {
        assert_eq!("task".parse::<ReferenceKind>(), Ok(ReferenceKind::Task));
        assert_eq!(
            "referral".parse::<ReferenceKind>(),
            Ok(ReferenceKind::Referral)
        );
        assert!("bonus".parse::<ReferenceKind>().is_err());
        assert_eq!(ReferenceKind::Referral.to_string(), "referral");
    }

    #[test]
    fn test_new_transaction_reference_defaults_to_none() {
        let tx = NewTransaction::new(7, 50, "Referral signup bonus");
        assert_eq!(tx.reference, None);

        let tx = tx.with_reference(Reference::task(3));
        assert_eq!(tx.reference.map(|r| r.kind), Some(ReferenceKind::Task));
        assert_eq!(tx.reference.map(|r| r.id), Some(3));
    }

    #[test]
    fn test_profile_serializes_flat() {
        let profile = UserProfile {
            user: User {
                id: 1,
                username: "alice".to_string(),
                referrer_id: None,
                created_at: Utc::now(),
            },
            balance: 150,
            referral_count: 2,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["balance"], 150);
        assert!(json["referrer_id"].is_null());
    }
}
