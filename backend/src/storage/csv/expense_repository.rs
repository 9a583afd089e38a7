//! CSV-based expense repository.
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::connection::CsvConnection;
use crate::domain::models::expense::{Expense, SplitInput};
use crate::storage::traits::ExpenseStorage;

const HEADER: [&str; 10] = [
    "id",
    "group_id",
    "description",
    "total_amount",
    "paid_by",
    "split_policy",
    "status",
    "created_by",
    "created_at",
    "split_inputs",
];

/// CSV-based expense repository. One `expenses.csv` per group directory.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    connection: CsvConnection,
}

impl ExpenseRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn expenses_file(&self, group_dir: &Path) -> PathBuf {
        group_dir.join("expenses.csv")
    }

    fn read_expenses(&self, file_path: &Path) -> Result<Vec<Expense>> {
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut expenses = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let get = |i: usize| record.get(i).unwrap_or("");

            let split_inputs: Vec<SplitInput> = serde_json::from_str(get(9))
                .with_context(|| format!("Bad split inputs for expense {}", get(0)))?;
            let participants = Expense::derive_participants(&split_inputs);

            expenses.push(Expense {
                id: get(0).to_string(),
                group_id: get(1).to_string(),
                description: get(2).to_string(),
                total_amount: get(3).parse::<f64>().unwrap_or(0.0),
                paid_by: get(4).to_string(),
                split_policy: get(5).parse().map_err(|e: String| anyhow!(e))?,
                status: get(6).parse().map_err(|e: String| anyhow!(e))?,
                created_by: get(7).to_string(),
                created_at: parse_timestamp(get(8))?,
                split_inputs,
                participants,
            });
        }
        Ok(expenses)
    }

    fn write_expenses(&self, group_id: &str, expenses: &[Expense]) -> Result<()> {
        let group_dir = self.connection.ensure_group_directory(group_id)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.expenses_file(&group_dir))?;
        let mut csv_writer = Writer::from_writer(BufWriter::new(file));

        csv_writer.write_record(HEADER)?;
        for expense in expenses {
            csv_writer.write_record(&[
                expense.id.as_str(),
                expense.group_id.as_str(),
                expense.description.as_str(),
                &expense.total_amount.to_string(),
                expense.paid_by.as_str(),
                &expense.split_policy.to_string(),
                &expense.status.to_string(),
                expense.created_by.as_str(),
                &expense.created_at.to_rfc3339(),
                &serde_json::to_string(&expense.split_inputs)?,
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

pub(super) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Bad timestamp '{}'", value))
}

impl ExpenseStorage for ExpenseRepository {
    fn store_expense(&self, expense: &Expense) -> Result<()> {
        let group_dir = self.connection.ensure_group_directory(&expense.group_id)?;
        let mut expenses = self.read_expenses(&self.expenses_file(&group_dir))?;
        expenses.push(expense.clone());
        self.write_expenses(&expense.group_id, &expenses)
    }

    fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>> {
        for group_dir in self.connection.list_group_directories()? {
            let expenses = self.read_expenses(&self.expenses_file(&group_dir))?;
            if let Some(expense) = expenses.into_iter().find(|e| e.id == expense_id) {
                return Ok(Some(expense));
            }
        }
        Ok(None)
    }

    fn update_expense(&self, expense: &Expense) -> Result<()> {
        let group_dir = self.connection.group_directory(&expense.group_id);
        let mut expenses = self.read_expenses(&self.expenses_file(&group_dir))?;
        let slot = expenses
            .iter_mut()
            .find(|e| e.id == expense.id)
            .ok_or_else(|| anyhow!("Expense {} not found for update", expense.id))?;
        *slot = expense.clone();
        self.write_expenses(&expense.group_id, &expenses)
    }

    fn list_group_expenses(&self, group_id: &str) -> Result<Vec<Expense>> {
        let group_dir = self.connection.group_directory(group_id);
        let expenses = self.read_expenses(&self.expenses_file(&group_dir))?;
        Ok(expenses
            .into_iter()
            .filter(|e| e.group_id == group_id)
            .collect())
    }
}
