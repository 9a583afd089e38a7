//! # Storage Traits
//!
//! Abstraction traits that let the domain layer work against different
//! storage backends without modification. All operations are synchronous;
//! ledger mutations are serialized per group by the ledger service, not here.

use anyhow::Result;

use crate::domain::models::balance::PairBalance;
use crate::domain::models::expense::{Expense, ExpenseApproval};
use crate::domain::models::settlement::Settlement;

/// Interface for expense storage operations.
pub trait ExpenseStorage: Send + Sync {
    /// Store a new expense.
    fn store_expense(&self, expense: &Expense) -> Result<()>;

    /// Retrieve an expense by ID, searching across groups.
    fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>>;

    /// Update an existing expense (status transitions only; expenses are
    /// otherwise immutable).
    fn update_expense(&self, expense: &Expense) -> Result<()>;

    /// List all expenses for a group, unordered.
    fn list_group_expenses(&self, group_id: &str) -> Result<Vec<Expense>>;
}

/// Interface for expense approval storage operations.
///
/// Uniqueness of the (expense, participant) pair is the caller's invariant:
/// approvals are only created at expense creation, one per participant.
pub trait ApprovalStorage: Send + Sync {
    /// Store a new approval record.
    fn store_approval(&self, group_id: &str, approval: &ExpenseApproval) -> Result<()>;

    /// Retrieve one participant's approval record for an expense.
    fn get_approval(
        &self,
        group_id: &str,
        expense_id: &str,
        user_id: &str,
    ) -> Result<Option<ExpenseApproval>>;

    /// List every approval record for an expense.
    fn list_expense_approvals(
        &self,
        group_id: &str,
        expense_id: &str,
    ) -> Result<Vec<ExpenseApproval>>;

    /// Update an existing approval record.
    fn update_approval(&self, group_id: &str, approval: &ExpenseApproval) -> Result<()>;
}

/// Interface for balance storage operations.
///
/// Balances are keyed by (group, unordered user pair); the storage holds at
/// most one row per key, which is what makes the netting representation
/// unambiguous.
pub trait BalanceStorage: Send + Sync {
    /// Retrieve the balance row for the pair containing `user_a` and
    /// `user_b`, in either order.
    fn get_pair_balance(
        &self,
        group_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<PairBalance>>;

    /// Insert or replace the row for the balance's pair key.
    fn upsert_pair_balance(&self, balance: &PairBalance) -> Result<()>;

    /// Delete the row for the pair, if present.
    fn delete_pair_balance(&self, group_id: &str, user_a: &str, user_b: &str) -> Result<()>;

    /// List all balance rows for a group.
    fn list_group_balances(&self, group_id: &str) -> Result<Vec<PairBalance>>;
}

/// Interface for settlement storage operations.
pub trait SettlementStorage: Send + Sync {
    /// Store a new settlement.
    fn store_settlement(&self, settlement: &Settlement) -> Result<()>;

    /// Retrieve a settlement by ID, searching across groups.
    fn get_settlement(&self, settlement_id: &str) -> Result<Option<Settlement>>;

    /// Update an existing settlement (status transition only).
    fn update_settlement(&self, settlement: &Settlement) -> Result<()>;

    /// List all settlements for a group, unordered.
    fn list_group_settlements(&self, group_id: &str) -> Result<Vec<Settlement>>;
}

/// Interface for storage connections.
///
/// Provides factory methods for creating repositories so the domain layer
/// can be generic over the backend.
pub trait Connection: Send + Sync + Clone + 'static {
    type ExpenseRepository: ExpenseStorage + Clone;
    type ApprovalRepository: ApprovalStorage + Clone;
    type BalanceRepository: BalanceStorage + Clone;
    type SettlementRepository: SettlementStorage + Clone;

    fn create_expense_repository(&self) -> Self::ExpenseRepository;
    fn create_approval_repository(&self) -> Self::ApprovalRepository;
    fn create_balance_repository(&self) -> Self::BalanceRepository;
    fn create_settlement_repository(&self) -> Self::SettlementRepository;
}
