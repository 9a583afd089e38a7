//! Split calculation and validation.
//!
//! Pure functions: given a total, a policy, and the per-participant split
//! inputs, work out what each participant owes, and check that the inputs
//! are internally consistent before an expense is ever persisted.

use crate::domain::errors::DomainError;
use crate::domain::models::balance::AMOUNT_EPSILON;
use crate::domain::models::expense::{SplitInput, SplitPolicy};

/// Compute each participant's share of `total_amount`, in split-input order.
///
/// EQUAL divides once and accepts any rounding drift (no remainder
/// redistribution). EXACT takes each value verbatim. PERCENTAGE scales each
/// value against the total.
pub fn compute_shares(
    total_amount: f64,
    policy: SplitPolicy,
    split_inputs: &[SplitInput],
) -> Vec<(String, f64)> {
    match policy {
        SplitPolicy::Equal => {
            let per_person = total_amount / split_inputs.len() as f64;
            split_inputs
                .iter()
                .map(|input| (input.user_id.clone(), per_person))
                .collect()
        }
        SplitPolicy::Exact => split_inputs
            .iter()
            .map(|input| (input.user_id.clone(), input.value))
            .collect(),
        SplitPolicy::Percentage => split_inputs
            .iter()
            .map(|input| (input.user_id.clone(), input.value / 100.0 * total_amount))
            .collect(),
    }
}

/// Validate split inputs against the policy.
///
/// Checks that hold for every policy: positive finite total, non-empty
/// inputs, no duplicate participant, finite non-negative values. EXACT
/// values must sum to the total and PERCENTAGE values to 100, both within
/// an absolute tolerance of [`AMOUNT_EPSILON`]. EQUAL has no numeric
/// constraint on the values.
pub fn validate_split(
    total_amount: f64,
    policy: SplitPolicy,
    split_inputs: &[SplitInput],
) -> Result<(), DomainError> {
    if !total_amount.is_finite() || total_amount <= 0.0 {
        return Err(DomainError::Validation(
            "Total amount must be positive".to_string(),
        ));
    }
    if split_inputs.is_empty() {
        return Err(DomainError::Validation(
            "Split inputs must name at least one participant".to_string(),
        ));
    }
    for (i, input) in split_inputs.iter().enumerate() {
        if input.user_id.is_empty() {
            return Err(DomainError::Validation(
                "Split input has an empty participant id".to_string(),
            ));
        }
        if !input.value.is_finite() || input.value < 0.0 {
            return Err(DomainError::Validation(format!(
                "Split value for {} must be a non-negative number",
                input.user_id
            )));
        }
        if split_inputs[..i].iter().any(|p| p.user_id == input.user_id) {
            return Err(DomainError::Validation(format!(
                "Duplicate participant {} in split inputs",
                input.user_id
            )));
        }
    }

    let sum: f64 = split_inputs.iter().map(|input| input.value).sum();
    match policy {
        SplitPolicy::Equal => Ok(()),
        SplitPolicy::Exact => {
            if (sum - total_amount).abs() > AMOUNT_EPSILON {
                Err(DomainError::Validation(
                    "Sum of exact amounts must equal total amount".to_string(),
                ))
            } else {
                Ok(())
            }
        }
        SplitPolicy::Percentage => {
            if (sum - 100.0).abs() > AMOUNT_EPSILON {
                Err(DomainError::Validation(
                    "Sum of percentages must equal 100".to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }
}
