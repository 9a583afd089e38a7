//! Test utilities for the CSV storage layer.
//!
//! RAII-based tempdir fixtures so test data is removed even when a test
//! panics.

use anyhow::Result;
use tempfile::TempDir;

use super::{
    ApprovalRepository, BalanceRepository, CsvConnection, ExpenseRepository,
    SettlementRepository,
};
use crate::storage::traits::Connection;

/// Test environment backed by a temporary directory that is cleaned up when
/// the environment is dropped.
pub struct TestEnvironment {
    pub connection: CsvConnection,
    pub base_path: std::path::PathBuf,
    _temp_dir: TempDir, // Keep alive to prevent cleanup
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let connection = CsvConnection::new(temp_dir.path())?;
        Ok(Self {
            connection,
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }
}

/// Repository instances over a fresh test environment.
pub struct TestHelper {
    pub env: TestEnvironment,
    pub expense_repo: ExpenseRepository,
    pub approval_repo: ApprovalRepository,
    pub balance_repo: BalanceRepository,
    pub settlement_repo: SettlementRepository,
}

impl TestHelper {
    pub fn new() -> Result<Self> {
        let env = TestEnvironment::new()?;
        let expense_repo = env.connection.create_expense_repository();
        let approval_repo = env.connection.create_approval_repository();
        let balance_repo = env.connection.create_balance_repository();
        let settlement_repo = env.connection.create_settlement_repository();
        Ok(Self {
            env,
            expense_repo,
            approval_repo,
            balance_repo,
            settlement_repo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_cleans_up_on_drop() -> Result<()> {
        let base_path;
        {
            let env = TestEnvironment::new()?;
            base_path = env.base_path.clone();
            assert!(base_path.exists());
        }
        assert!(!base_path.exists());
        Ok(())
    }
}
