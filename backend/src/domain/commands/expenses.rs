//! Commands and results for the expense approval workflow.
use crate::domain::models::expense::{Expense, ExpenseApproval, SplitInput, SplitPolicy};

/// Create a new expense in a group. `actor` is the authenticated user
/// creating it; they self-approve at creation time.
#[derive(Debug, Clone)]
pub struct CreateExpenseCommand {
    pub group_id: String,
    pub actor: String,
    pub description: String,
    pub total_amount: f64,
    pub paid_by: String,
    pub split_policy: SplitPolicy,
    pub split_inputs: Vec<SplitInput>,
}

/// One participant's ACCEPT/REJECT vote on a pending expense. The action is
/// kept as the raw token so the service owns InvalidAction handling.
#[derive(Debug, Clone)]
pub struct RespondToExpenseCommand {
    pub expense_id: String,
    pub actor: String,
    pub action: String,
}

/// An expense with the state of every participant's vote.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseWithApprovals {
    pub expense: Expense,
    pub approvals: Vec<ExpenseApproval>,
}
