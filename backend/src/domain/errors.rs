//! Domain error taxonomy for the split ledger.
//!
//! Every workflow failure is one of these variants so the REST layer can map
//! it to a status code without string matching. `Inconsistent` is the odd one
//! out: it means the ledger's own invariants were violated (NaN amounts,
//! impossible state) and is surfaced distinctly from ordinary validation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Bad input rejected before any state change (bad split sum, empty
    /// participant list, non-positive amount, ...).
    #[error("{0}")]
    Validation(String),

    /// Unknown expense, settlement, or balance.
    #[error("{0} not found")]
    NotFound(String),

    /// Acting on a non-pending entity, or voting twice.
    #[error("{0}")]
    AlreadyResolved(String),

    /// The actor is not entitled to perform this action.
    #[error("{0}")]
    Forbidden(String),

    /// Settlement amount exceeds the live balance.
    #[error("Settlement amount {requested:.2} exceeds outstanding balance {available:.2}")]
    ExceedsBalance { requested: f64, available: f64 },

    /// Action token outside {ACCEPT, REJECT}.
    #[error("Invalid action '{0}'. Use ACCEPT or REJECT")]
    InvalidAction(String),

    /// Ledger invariant violation. Not recoverable by the caller.
    #[error("Ledger inconsistency: {0}")]
    Inconsistent(String),

    /// Underlying storage failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
