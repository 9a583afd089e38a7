//! Domain model for a settlement claim.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            SettlementStatus::Pending => "PENDING",
            SettlementStatus::Accepted => "ACCEPTED",
            SettlementStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", token)
    }
}

impl FromStr for SettlementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SettlementStatus::Pending),
            "ACCEPTED" => Ok(SettlementStatus::Accepted),
            "REJECTED" => Ok(SettlementStatus::Rejected),
            other => Err(format!("Unknown settlement status: {}", other)),
        }
    }
}

/// A debtor's claim that `amount` was paid to `to_user` outside the system.
/// The claim has no ledger effect until the creditor accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub group_id: String,
    pub from_user: String,
    pub to_user: String,
    pub amount: f64,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Settlement {
    pub fn generate_id() -> String {
        super::generate_entity_id("stl")
    }
}
