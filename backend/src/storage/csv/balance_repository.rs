//! CSV-based balance repository.
//!
//! The balances file holds at most one row per unordered user pair; both
//! `get` and `upsert` normalize the pair key so callers can pass the two
//! users in either order.
use anyhow::Result;
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::connection::CsvConnection;
use crate::domain::models::balance::PairBalance;
use crate::storage::traits::BalanceStorage;

const HEADER: [&str; 4] = ["group_id", "user_low", "user_high", "amount"];

/// CSV-based balance repository. One `balances.csv` per group directory.
///
/// Distinct group ids can sanitize to the same directory name, so every
/// lookup also matches on the row's stored `group_id` rather than trusting
/// the file it was read from.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    connection: CsvConnection,
}

impl BalanceRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn balances_file(&self, group_dir: &Path) -> PathBuf {
        group_dir.join("balances.csv")
    }

    fn read_balances(&self, group_id: &str) -> Result<Vec<PairBalance>> {
        let file_path = self.balances_file(&self.connection.group_directory(group_id));
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut balances = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let get = |i: usize| record.get(i).unwrap_or("");
            balances.push(PairBalance {
                group_id: get(0).to_string(),
                user_low: get(1).to_string(),
                user_high: get(2).to_string(),
                amount: get(3).parse::<f64>().unwrap_or(0.0),
            });
        }
        Ok(balances)
    }

    fn write_balances(&self, group_id: &str, balances: &[PairBalance]) -> Result<()> {
        let group_dir = self.connection.ensure_group_directory(group_id)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.balances_file(&group_dir))?;
        let mut csv_writer = Writer::from_writer(BufWriter::new(file));

        csv_writer.write_record(HEADER)?;
        for balance in balances {
            csv_writer.write_record(&[
                balance.group_id.as_str(),
                balance.user_low.as_str(),
                balance.user_high.as_str(),
                &balance.amount.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl BalanceStorage for BalanceRepository {
    fn get_pair_balance(
        &self,
        group_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<PairBalance>> {
        let (low, high) = PairBalance::pair_key(user_a, user_b);
        let balances = self.read_balances(group_id)?;
        Ok(balances
            .into_iter()
            .find(|b| b.group_id == group_id && b.user_low == low && b.user_high == high))
    }

    fn upsert_pair_balance(&self, balance: &PairBalance) -> Result<()> {
        let mut balances = self.read_balances(&balance.group_id)?;
        match balances.iter_mut().find(|b| {
            b.group_id == balance.group_id
                && b.user_low == balance.user_low
                && b.user_high == balance.user_high
        }) {
            Some(slot) => *slot = balance.clone(),
            None => balances.push(balance.clone()),
        }
        self.write_balances(&balance.group_id, &balances)
    }

    fn delete_pair_balance(&self, group_id: &str, user_a: &str, user_b: &str) -> Result<()> {
        let (low, high) = PairBalance::pair_key(user_a, user_b);
        let mut balances = self.read_balances(group_id)?;
        balances.retain(|b| !(b.group_id == group_id && b.user_low == low && b.user_high == high));
        self.write_balances(group_id, &balances)
    }

    fn list_group_balances(&self, group_id: &str) -> Result<Vec<PairBalance>> {
        let balances = self.read_balances(group_id)?;
        Ok(balances
            .into_iter()
            .filter(|b| b.group_id == group_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::TestHelper;
    use super::*;

    fn pair(group_id: &str, a: &str, b: &str, amount: f64) -> PairBalance {
        let mut balance = PairBalance::zero(group_id, a, b);
        balance.amount = amount;
        balance
    }

    #[test]
    fn upsert_keeps_one_row_per_pair() -> Result<()> {
        let helper = TestHelper::new()?;
        helper.balance_repo.upsert_pair_balance(&pair("trip", "alice", "bob", 10.0))?;
        // Same pair in reverse order replaces rather than duplicates.
        helper.balance_repo.upsert_pair_balance(&pair("trip", "bob", "alice", 25.0))?;

        let balances = helper.balance_repo.list_group_balances("trip")?;
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].amount, 25.0);
        Ok(())
    }

    #[test]
    fn get_accepts_either_user_order() -> Result<()> {
        let helper = TestHelper::new()?;
        helper.balance_repo.upsert_pair_balance(&pair("trip", "alice", "bob", 10.0))?;

        let forward = helper.balance_repo.get_pair_balance("trip", "alice", "bob")?;
        let reverse = helper.balance_repo.get_pair_balance("trip", "bob", "alice")?;
        assert_eq!(forward, reverse);
        assert!(forward.is_some());
        Ok(())
    }

    #[test]
    fn groups_sharing_a_directory_keep_separate_rows() -> Result<()> {
        // "trip 1" and "trip#1" both sanitize to group_trip_1.
        let helper = TestHelper::new()?;
        helper.balance_repo.upsert_pair_balance(&pair("trip 1", "alice", "bob", 10.0))?;
        helper.balance_repo.upsert_pair_balance(&pair("trip#1", "alice", "bob", 25.0))?;

        let first = helper.balance_repo.list_group_balances("trip 1")?;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].amount, 10.0);
        let second = helper.balance_repo.get_pair_balance("trip#1", "bob", "alice")?.unwrap();
        assert_eq!(second.amount, 25.0);

        helper.balance_repo.delete_pair_balance("trip 1", "alice", "bob")?;
        assert!(helper.balance_repo.list_group_balances("trip 1")?.is_empty());
        assert_eq!(helper.balance_repo.list_group_balances("trip#1")?.len(), 1);
        Ok(())
    }

    #[test]
    fn delete_removes_the_row() -> Result<()> {
        let helper = TestHelper::new()?;
        helper.balance_repo.upsert_pair_balance(&pair("trip", "alice", "bob", 10.0))?;
        helper.balance_repo.delete_pair_balance("trip", "bob", "alice")?;
        assert!(helper.balance_repo.list_group_balances("trip")?.is_empty());
        Ok(())
    }
}
