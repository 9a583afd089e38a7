//! Shared-expense ledger backend.
//!
//! Groups record expenses split between participants; every participant
//! must approve an expense before its shares are folded into the group's
//! pairwise balances, and debts are cleared through creditor-approved
//! settlements. State lives in per-group CSV files.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub mod domain;
pub mod rest;
pub mod storage;

pub use storage::csv::CsvConnection;

use domain::{ExpenseService, LedgerService, SettlementService};

/// All domain services wired over a single CSV connection.
pub struct Backend {
    pub expense_service: ExpenseService<CsvConnection>,
    pub settlement_service: SettlementService<CsvConnection>,
    pub ledger_service: LedgerService<CsvConnection>,
}

impl Backend {
    pub fn new(data_directory: &Path) -> Result<Self> {
        let connection = Arc::new(CsvConnection::new(data_directory)?);

        let ledger_service = LedgerService::new(connection.clone());
        let expense_service = ExpenseService::new(connection.clone(), ledger_service.clone());
        let settlement_service = SettlementService::new(connection, ledger_service.clone());

        Ok(Backend {
            expense_service,
            settlement_service,
            ledger_service,
        })
    }
}
