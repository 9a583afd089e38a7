//! Storage layer: abstraction traits plus the CSV-file implementation.

pub mod csv;
pub mod traits;

pub use traits::{
    ApprovalStorage, BalanceStorage, Connection, ExpenseStorage, SettlementStorage,
};
