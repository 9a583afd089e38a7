//! CSV-based settlement repository.
use anyhow::{anyhow, Result};
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::connection::CsvConnection;
use super::expense_repository::parse_timestamp;
use crate::domain::models::settlement::Settlement;
use crate::storage::traits::SettlementStorage;

const HEADER: [&str; 8] = [
    "id",
    "group_id",
    "from_user",
    "to_user",
    "amount",
    "status",
    "created_at",
    "responded_at",
];

/// CSV-based settlement repository. One `settlements.csv` per group
/// directory.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    connection: CsvConnection,
}

impl SettlementRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn settlements_file(&self, group_dir: &Path) -> PathBuf {
        group_dir.join("settlements.csv")
    }

    fn read_settlements(&self, file_path: &Path) -> Result<Vec<Settlement>> {
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut settlements = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let get = |i: usize| record.get(i).unwrap_or("");

            let responded_at = match get(7) {
                "" => None,
                value => Some(parse_timestamp(value)?),
            };
            settlements.push(Settlement {
                id: get(0).to_string(),
                group_id: get(1).to_string(),
                from_user: get(2).to_string(),
                to_user: get(3).to_string(),
                amount: get(4).parse::<f64>().unwrap_or(0.0),
                status: get(5).parse().map_err(|e: String| anyhow!(e))?,
                created_at: parse_timestamp(get(6))?,
                responded_at,
            });
        }
        Ok(settlements)
    }

    fn write_settlements(&self, group_id: &str, settlements: &[Settlement]) -> Result<()> {
        let group_dir = self.connection.ensure_group_directory(group_id)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.settlements_file(&group_dir))?;
        let mut csv_writer = Writer::from_writer(BufWriter::new(file));

        csv_writer.write_record(HEADER)?;
        for settlement in settlements {
            csv_writer.write_record(&[
                settlement.id.as_str(),
                settlement.group_id.as_str(),
                settlement.from_user.as_str(),
                settlement.to_user.as_str(),
                &settlement.amount.to_string(),
                &settlement.status.to_string(),
                &settlement.created_at.to_rfc3339(),
                &settlement
                    .responded_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl SettlementStorage for SettlementRepository {
    fn store_settlement(&self, settlement: &Settlement) -> Result<()> {
        let group_dir = self.connection.ensure_group_directory(&settlement.group_id)?;
        let mut settlements = self.read_settlements(&self.settlements_file(&group_dir))?;
        settlements.push(settlement.clone());
        self.write_settlements(&settlement.group_id, &settlements)
    }

    fn get_settlement(&self, settlement_id: &str) -> Result<Option<Settlement>> {
        for group_dir in self.connection.list_group_directories()? {
            let settlements = self.read_settlements(&self.settlements_file(&group_dir))?;
            if let Some(settlement) = settlements.into_iter().find(|s| s.id == settlement_id) {
                return Ok(Some(settlement));
            }
        }
        Ok(None)
    }

    fn update_settlement(&self, settlement: &Settlement) -> Result<()> {
        let group_dir = self.connection.group_directory(&settlement.group_id);
        let mut settlements = self.read_settlements(&self.settlements_file(&group_dir))?;
        let slot = settlements
            .iter_mut()
            .find(|s| s.id == settlement.id)
            .ok_or_else(|| anyhow!("Settlement {} not found for update", settlement.id))?;
        *slot = settlement.clone();
        self.write_settlements(&settlement.group_id, &settlements)
    }

    fn list_group_settlements(&self, group_id: &str) -> Result<Vec<Settlement>> {
        let group_dir = self.connection.group_directory(group_id);
        let settlements = self.read_settlements(&self.settlements_file(&group_dir))?;
        Ok(settlements
            .into_iter()
            .filter(|s| s.group_id == group_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::TestHelper;
    use super::*;
    use crate::domain::models::settlement::SettlementStatus;
    use chrono::Utc;

    fn sample(id: &str) -> Settlement {
        Settlement {
            id: id.to_string(),
            group_id: "trip".to_string(),
            from_user: "bob".to_string(),
            to_user: "alice".to_string(),
            amount: 12.5,
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
        }
    }

    #[test]
    fn store_get_update_round_trip() -> Result<()> {
        let helper = TestHelper::new()?;
        let mut settlement = sample("stl-1");
        helper.settlement_repo.store_settlement(&settlement)?;

        settlement.status = SettlementStatus::Accepted;
        settlement.responded_at = Some(Utc::now());
        helper.settlement_repo.update_settlement(&settlement)?;

        let loaded = helper.settlement_repo.get_settlement("stl-1")?.unwrap();
        assert_eq!(loaded.status, SettlementStatus::Accepted);
        assert!(loaded.responded_at.is_some());
        assert_eq!(helper.settlement_repo.list_group_settlements("trip")?.len(), 1);
        Ok(())
    }
}
