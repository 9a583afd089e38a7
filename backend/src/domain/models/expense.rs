//! Domain model for an expense and its per-participant approval records.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an expense total is divided among the split inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitPolicy {
    Equal,
    Exact,
    Percentage,
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            SplitPolicy::Equal => "EQUAL",
            SplitPolicy::Exact => "EXACT",
            SplitPolicy::Percentage => "PERCENTAGE",
        };
        write!(f, "{}", token)
    }
}

impl FromStr for SplitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQUAL" => Ok(SplitPolicy::Equal),
            "EXACT" => Ok(SplitPolicy::Exact),
            "PERCENTAGE" => Ok(SplitPolicy::Percentage),
            other => Err(format!("Unknown split policy: {}", other)),
        }
    }
}

/// One participant's entry in an expense split.
///
/// `value` is an exact amount for EXACT, a percentage for PERCENTAGE, and
/// advisory only for EQUAL (the actual share is total / N).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitInput {
    pub user_id: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            ExpenseStatus::Pending => "PENDING",
            ExpenseStatus::Approved => "APPROVED",
            ExpenseStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", token)
    }
}

impl FromStr for ExpenseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ExpenseStatus::Pending),
            "APPROVED" => Ok(ExpenseStatus::Approved),
            "REJECTED" => Ok(ExpenseStatus::Rejected),
            other => Err(format!("Unknown expense status: {}", other)),
        }
    }
}

/// A shared cost event. Terminal once Approved or Rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub total_amount: f64,
    pub paid_by: String,
    pub split_policy: SplitPolicy,
    pub split_inputs: Vec<SplitInput>,
    /// Exactly the users named in the split inputs, in input order.
    pub participants: Vec<String>,
    pub status: ExpenseStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn generate_id() -> String {
        super::generate_entity_id("exp")
    }

    /// The participant set is derived from the split inputs, never stored
    /// independently of them.
    pub fn derive_participants(split_inputs: &[SplitInput]) -> Vec<String> {
        split_inputs.iter().map(|s| s.user_id.clone()).collect()
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Accepted => "ACCEPTED",
            ApprovalStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", token)
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ApprovalStatus::Pending),
            "ACCEPTED" => Ok(ApprovalStatus::Accepted),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            other => Err(format!("Unknown approval status: {}", other)),
        }
    }
}

/// One participant's vote on one expense.
///
/// Exactly one record exists per (expense, participant) pair. A record is
/// mutated at most once, from Pending to a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseApproval {
    pub expense_id: String,
    pub user_id: String,
    pub status: ApprovalStatus,
    pub responded_at: Option<DateTime<Utc>>,
}
