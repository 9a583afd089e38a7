//! Domain model for pairwise balances.
//!
//! A balance is stored as a single row per unordered user pair with a signed
//! amount: positive means `user_low` owes `user_high`, negative the reverse.
//! This makes the "both directions exist at once" fault unrepresentable and
//! turns debt netting into a signed addition. The rest of the system only
//! ever sees the directional [`Balance`] view derived from the sign.

use serde::{Deserialize, Serialize};

/// Absolute tolerance used for split-sum validation and near-zero balance
/// pruning. Matches the original system's hardcoded threshold.
pub const AMOUNT_EPSILON: f64 = 0.01;

/// The single stored row for one unordered user pair in one group.
///
/// Invariant: `user_low < user_high` (lexicographic), and no row is kept
/// with `|amount| <= AMOUNT_EPSILON`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairBalance {
    pub group_id: String,
    pub user_low: String,
    pub user_high: String,
    pub amount: f64,
}

impl PairBalance {
    /// Order two user ids into the canonical (low, high) pair key.
    pub fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// An empty row for the pair containing `a` and `b`.
    pub fn zero(group_id: &str, a: &str, b: &str) -> Self {
        let (low, high) = Self::pair_key(a, b);
        Self {
            group_id: group_id.to_string(),
            user_low: low.to_string(),
            user_high: high.to_string(),
            amount: 0.0,
        }
    }

    /// Signed delta representing "`from` owes `to` an extra `amount`".
    pub fn signed_delta(&self, from: &str, amount: f64) -> f64 {
        if from == self.user_low {
            amount
        } else {
            -amount
        }
    }

    /// Outstanding amount `from` owes `to`, or 0.0 if the debt runs the
    /// other way (or the pair is settled).
    pub fn debt_from(&self, from: &str) -> f64 {
        let signed = if from == self.user_low {
            self.amount
        } else {
            -self.amount
        };
        if signed > AMOUNT_EPSILON {
            signed
        } else {
            0.0
        }
    }

    /// Whether the row is close enough to zero to be deleted.
    pub fn is_settled(&self) -> bool {
        self.amount.abs() <= AMOUNT_EPSILON
    }

    /// The directional view of this row, if any debt is outstanding.
    pub fn directional(&self) -> Option<Balance> {
        if self.is_settled() {
            return None;
        }
        let (from_user, to_user, amount) = if self.amount > 0.0 {
            (self.user_low.clone(), self.user_high.clone(), self.amount)
        } else {
            (self.user_high.clone(), self.user_low.clone(), -self.amount)
        };
        Some(Balance {
            group_id: self.group_id.clone(),
            from_user,
            to_user,
            amount,
        })
    }
}

/// Directional debt view: `from_user` owes `to_user` `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub group_id: String,
    pub from_user: String,
    pub to_user: String,
    pub amount: f64,
}
