//! Domain models for the split ledger.

pub mod balance;
pub mod expense;
pub mod settlement;

use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a unique entity ID.
/// Format: <prefix>-<timestamp_ms>-<random_suffix>
/// Example: exp-1625846400123-af3c
pub(crate) fn generate_entity_id(prefix: &str) -> String {
    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64;
    format!("{}-{}-{}", prefix, now_millis, generate_random_suffix(4))
}

/// Generate a random hex suffix for entity IDs.
fn generate_random_suffix(len: usize) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_nanos();
    format!("{:x}", now % (16_u128.pow(len as u32)))
        .chars()
        .take(len)
        .collect()
}
