//! Wire types shared between the split-ledger backend and its clients.
//!
//! Everything here is plain serde data. Business rules (split validation,
//! consensus, balance netting) live in the backend domain layer; these types
//! only describe what goes over the wire.

use serde::{Deserialize, Serialize};

/// How an expense total is divided among its participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitPolicy {
    /// Everyone named in the split inputs owes total / N.
    Equal,
    /// Each split input's value is the exact amount owed.
    Exact,
    /// Each split input's value is a percentage of the total.
    Percentage,
}

/// One participant's entry in an expense split.
///
/// The meaning of `value` depends on the policy: ignored for EQUAL, an
/// absolute amount for EXACT, a percentage for PERCENTAGE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitInput {
    pub user_id: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SettlementStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A shared cost event within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub total_amount: f64,
    /// Group member who fronted the money.
    pub paid_by: String,
    pub split_policy: SplitPolicy,
    pub split_inputs: Vec<SplitInput>,
    /// Exactly the users named in the split inputs.
    pub participants: Vec<String>,
    pub status: ExpenseStatus,
    pub created_by: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

/// One participant's vote on one expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseApproval {
    pub expense_id: String,
    pub user_id: String,
    pub status: ApprovalStatus,
    /// RFC 3339 timestamp, absent while the vote is pending.
    pub responded_at: Option<String>,
}

/// An expense together with the state of every participant's vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseWithApprovals {
    pub expense: Expense,
    pub approvals: Vec<ExpenseApproval>,
}

/// Net outstanding directional debt between two users in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub group_id: String,
    /// The debtor.
    pub from_user: String,
    /// The creditor.
    pub to_user: String,
    pub amount: f64,
}

/// A debtor's claim that a payment was made outside the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub group_id: String,
    pub from_user: String,
    pub to_user: String,
    pub amount: f64,
    pub status: SettlementStatus,
    /// RFC 3339 timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp, absent while pending.
    pub responded_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    /// Authenticated user making the request (the expense creator).
    pub user_id: String,
    pub description: String,
    pub total_amount: f64,
    pub paid_by: String,
    pub split_policy: SplitPolicy,
    pub split_inputs: Vec<SplitInput>,
}

/// Body for responding to an expense or a settlement.
///
/// `action` must be `"ACCEPT"` or `"REJECT"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondRequest {
    pub user_id: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSettlementRequest {
    /// Authenticated user making the request (the debtor).
    pub user_id: String,
    pub to_user: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseListResponse {
    pub expenses: Vec<ExpenseWithApprovals>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceListResponse {
    pub balances: Vec<Balance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementListResponse {
    pub settlements: Vec<Settlement>,
}
