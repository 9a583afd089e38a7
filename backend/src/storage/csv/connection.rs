//! CSV storage connection: base directory handling and repository factories.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use super::{
    ApprovalRepository, BalanceRepository, ExpenseRepository, SettlementRepository,
};
use crate::storage::traits::Connection;

/// Connection to a CSV data directory.
///
/// Cloning is cheap and clones share the same underlying directory.
#[derive(Debug, Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

impl CsvConnection {
    /// Open (creating if necessary) the base data directory.
    pub fn new(base_directory: impl AsRef<Path>) -> Result<Self> {
        let base_directory = base_directory.as_ref().to_path_buf();
        fs::create_dir_all(&base_directory)?;
        Ok(Self { base_directory })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Generate a safe filesystem name from a group id.
    /// Converts "Trip 2024" -> "trip_2024", "flat#3" -> "flat_3", etc.
    pub fn generate_safe_directory_name(group_id: &str) -> String {
        let mut result = String::new();
        let mut last_was_underscore = false;
        for c in group_id.chars() {
            if c.is_ascii_alphanumeric() {
                result.push(c.to_ascii_lowercase());
                last_was_underscore = false;
            } else if !last_was_underscore {
                result.push('_');
                last_was_underscore = true;
            }
        }
        result.trim_matches('_').to_string()
    }

    /// Path of a group's data directory (may not exist yet).
    pub fn group_directory(&self, group_id: &str) -> PathBuf {
        self.base_directory
            .join(format!("group_{}", Self::generate_safe_directory_name(group_id)))
    }

    /// Create a group's data directory if needed and return its path.
    pub fn ensure_group_directory(&self, group_id: &str) -> Result<PathBuf> {
        let dir = self.group_directory(group_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// All existing group data directories, for cross-group lookups by
    /// entity id.
    pub fn list_group_directories(&self) -> Result<Vec<PathBuf>> {
        if !self.base_directory.exists() {
            return Ok(Vec::new());
        }
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.base_directory)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("group_"))
                    .unwrap_or(false)
            {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

impl Connection for CsvConnection {
    type ExpenseRepository = ExpenseRepository;
    type ApprovalRepository = ApprovalRepository;
    type BalanceRepository = BalanceRepository;
    type SettlementRepository = SettlementRepository;

    fn create_expense_repository(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.clone())
    }

    fn create_approval_repository(&self) -> ApprovalRepository {
        ApprovalRepository::new(self.clone())
    }

    fn create_balance_repository(&self) -> BalanceRepository {
        BalanceRepository::new(self.clone())
    }

    fn create_settlement_repository(&self) -> SettlementRepository {
        SettlementRepository::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_directory_names() {
        assert_eq!(CsvConnection::generate_safe_directory_name("Trip 2024"), "trip_2024");
        assert_eq!(CsvConnection::generate_safe_directory_name("flat#3"), "flat_3");
        assert_eq!(CsvConnection::generate_safe_directory_name("__a  b__"), "a_b");
    }

    #[test]
    fn group_directories_are_discovered() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let connection = CsvConnection::new(temp_dir.path())?;
        assert!(connection.list_group_directories()?.is_empty());

        connection.ensure_group_directory("trip")?;
        connection.ensure_group_directory("flat")?;
        assert_eq!(connection.list_group_directories()?.len(), 2);
        Ok(())
    }
}
