//! Domain logic: expense splitting, the balance ledger, and the approval
//! and settlement workflows. Services are generic over a storage
//! [`Connection`](crate::storage::traits::Connection) so tests can run
//! against throwaway directories.

pub mod commands;
pub mod errors;
pub mod expense_service;
pub mod ledger_service;
pub mod models;
pub mod settlement_service;
pub mod split;

pub use errors::DomainError;
pub use expense_service::ExpenseService;
pub use ledger_service::LedgerService;
pub use settlement_service::SettlementService;
