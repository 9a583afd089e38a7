//! CSV-based expense approval repository.
use anyhow::{anyhow, Result};
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::connection::CsvConnection;
use super::expense_repository::parse_timestamp;
use crate::domain::models::expense::ExpenseApproval;
use crate::storage::traits::ApprovalStorage;

const HEADER: [&str; 4] = ["expense_id", "user_id", "status", "responded_at"];

/// CSV-based approval repository. One `approvals.csv` per group directory,
/// holding the approval records of every expense in that group.
#[derive(Debug, Clone)]
pub struct ApprovalRepository {
    connection: CsvConnection,
}

impl ApprovalRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn approvals_file(&self, group_dir: &Path) -> PathBuf {
        group_dir.join("approvals.csv")
    }

    fn read_approvals(&self, group_id: &str) -> Result<Vec<ExpenseApproval>> {
        let file_path = self.approvals_file(&self.connection.group_directory(group_id));
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut approvals = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let get = |i: usize| record.get(i).unwrap_or("");

            let responded_at = match get(3) {
                "" => None,
                value => Some(parse_timestamp(value)?),
            };
            approvals.push(ExpenseApproval {
                expense_id: get(0).to_string(),
                user_id: get(1).to_string(),
                status: get(2).parse().map_err(|e: String| anyhow!(e))?,
                responded_at,
            });
        }
        Ok(approvals)
    }

    fn write_approvals(&self, group_id: &str, approvals: &[ExpenseApproval]) -> Result<()> {
        let group_dir = self.connection.ensure_group_directory(group_id)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.approvals_file(&group_dir))?;
        let mut csv_writer = Writer::from_writer(BufWriter::new(file));

        csv_writer.write_record(HEADER)?;
        for approval in approvals {
            csv_writer.write_record(&[
                approval.expense_id.as_str(),
                approval.user_id.as_str(),
                &approval.status.to_string(),
                &approval
                    .responded_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl ApprovalStorage for ApprovalRepository {
    fn store_approval(&self, group_id: &str, approval: &ExpenseApproval) -> Result<()> {
        let mut approvals = self.read_approvals(group_id)?;
        approvals.push(approval.clone());
        self.write_approvals(group_id, &approvals)
    }

    fn get_approval(
        &self,
        group_id: &str,
        expense_id: &str,
        user_id: &str,
    ) -> Result<Option<ExpenseApproval>> {
        let approvals = self.read_approvals(group_id)?;
        Ok(approvals
            .into_iter()
            .find(|a| a.expense_id == expense_id && a.user_id == user_id))
    }

    fn list_expense_approvals(
        &self,
        group_id: &str,
        expense_id: &str,
    ) -> Result<Vec<ExpenseApproval>> {
        let approvals = self.read_approvals(group_id)?;
        Ok(approvals
            .into_iter()
            .filter(|a| a.expense_id == expense_id)
            .collect())
    }

    fn update_approval(&self, group_id: &str, approval: &ExpenseApproval) -> Result<()> {
        let mut approvals = self.read_approvals(group_id)?;
        let slot = approvals
            .iter_mut()
            .find(|a| a.expense_id == approval.expense_id && a.user_id == approval.user_id)
            .ok_or_else(|| {
                anyhow!(
                    "Approval for expense {} by {} not found",
                    approval.expense_id,
                    approval.user_id
                )
            })?;
        *slot = approval.clone();
        self.write_approvals(group_id, &approvals)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::TestHelper;
    use super::*;
    use crate::domain::models::expense::ApprovalStatus;
    use chrono::Utc;

    fn pending(expense_id: &str, user_id: &str) -> ExpenseApproval {
        ExpenseApproval {
            expense_id: expense_id.to_string(),
            user_id: user_id.to_string(),
            status: ApprovalStatus::Pending,
            responded_at: None,
        }
    }

    #[test]
    fn store_list_and_update() -> Result<()> {
        let helper = TestHelper::new()?;
        helper.approval_repo.store_approval("trip", &pending("exp-1", "alice"))?;
        helper.approval_repo.store_approval("trip", &pending("exp-1", "bob"))?;
        helper.approval_repo.store_approval("trip", &pending("exp-2", "alice"))?;

        assert_eq!(helper.approval_repo.list_expense_approvals("trip", "exp-1")?.len(), 2);

        let mut vote = helper.approval_repo.get_approval("trip", "exp-1", "bob")?.unwrap();
        vote.status = ApprovalStatus::Accepted;
        vote.responded_at = Some(Utc::now());
        helper.approval_repo.update_approval("trip", &vote)?;

        let loaded = helper.approval_repo.get_approval("trip", "exp-1", "bob")?.unwrap();
        assert_eq!(loaded.status, ApprovalStatus::Accepted);
        assert!(loaded.responded_at.is_some());
        Ok(())
    }

    #[test]
    fn missing_approval_is_none() -> Result<()> {
        let helper = TestHelper::new()?;
        assert!(helper.approval_repo.get_approval("trip", "exp-1", "alice")?.is_none());
        Ok(())
    }
}
