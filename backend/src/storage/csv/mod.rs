//! # CSV Storage Module
//!
//! File-based storage implementation for the split ledger. Each group gets
//! its own subdirectory under the base data directory, holding one CSV file
//! per entity kind:
//!
//! ```text
//! <base>/group_<sanitized id>/
//!     expenses.csv
//!     approvals.csv
//!     balances.csv
//!     settlements.csv
//! ```
//!
//! Repositories read the whole file and rewrite it on mutation (truncate and
//! write), which keeps every file internally consistent after each
//! operation. The balances file holds at most one row per unordered user
//! pair; the upsert keeps it that way.

pub mod approval_repository;
pub mod balance_repository;
pub mod connection;
pub mod expense_repository;
pub mod settlement_repository;

#[cfg(test)]
pub mod test_utils;

pub use approval_repository::ApprovalRepository;
pub use balance_repository::BalanceRepository;
pub use connection::CsvConnection;
pub use expense_repository::ExpenseRepository;
pub use settlement_repository::SettlementRepository;
