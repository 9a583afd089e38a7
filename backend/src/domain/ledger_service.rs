//! Balance ledger engine.
//!
//! Folds approved expense shares into the per-group pairwise balance set and
//! applies settlements against it. Balances are stored as one signed row per
//! unordered user pair (see [`PairBalance`]), so netting an opposing debt is
//! a signed addition: the legacy merge / shrink / flip / cancel cases all
//! fall out of the sign of the result, and the "both directions exist at
//! once" fault cannot be represented at all.
//!
//! Every mutation of a group's balances runs under that group's lock for the
//! full read-modify-write, so concurrent approvals or settlements on the
//! same pair cannot interleave. The multi-participant application of one
//! approved expense holds the lock across all of its debts.

use log::{error, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::errors::DomainError;
use crate::domain::models::balance::{Balance, PairBalance};
use crate::storage::traits::{BalanceStorage, Connection};

/// Service responsible for all balance mutations and reads.
pub struct LedgerService<C: Connection> {
    balance_repository: C::BalanceRepository,
    group_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl<C: Connection> Clone for LedgerService<C> {
    fn clone(&self) -> Self {
        Self {
            balance_repository: self.balance_repository.clone(),
            group_locks: Arc::clone(&self.group_locks),
        }
    }
}

impl<C: Connection> LedgerService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            balance_repository: connection.create_balance_repository(),
            group_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The lock serializing all mutations for one group. The approval and
    /// settlement workflows hold it across their whole read-modify-write and
    /// then call the `_locked` entry points below.
    pub(crate) fn group_lock(&self, group_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.group_locks.lock().expect("group lock registry poisoned");
        Arc::clone(
            locks
                .entry(group_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Record that `from_user` owes `to_user` an additional `amount`,
    /// netting against any opposing debt between the pair.
    pub fn apply_debt(
        &self,
        group_id: &str,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> Result<(), DomainError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().expect("group lock poisoned");
        self.apply_debt_locked(group_id, from_user, to_user, amount)
    }

    /// Fold one approved expense into the group's balances: one debt per
    /// non-payer share, in share order, all under a single group lock so
    /// the expense lands atomically with respect to other group mutations.
    pub fn apply_approved_expense(
        &self,
        group_id: &str,
        payer: &str,
        shares: &[(String, f64)],
    ) -> Result<(), DomainError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().expect("group lock poisoned");
        self.apply_approved_expense_locked(group_id, payer, shares)
    }

    /// [`apply_approved_expense`](Self::apply_approved_expense) for callers
    /// already holding the group's lock.
    pub(crate) fn apply_approved_expense_locked(
        &self,
        group_id: &str,
        payer: &str,
        shares: &[(String, f64)],
    ) -> Result<(), DomainError> {
        for (user_id, share) in shares {
            if user_id == payer {
                // A person never owes themselves.
                continue;
            }
            self.apply_debt_locked(group_id, user_id, payer, *share)?;
        }
        Ok(())
    }

    /// Reduce the outstanding debt `from_user` -> `to_user` by `amount`.
    ///
    /// The settlement workflow validates the amount against the live balance
    /// before calling, but the check is repeated here under the group lock
    /// since the balance may have shrunk in between.
    pub fn apply_settlement(
        &self,
        group_id: &str,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> Result<(), DomainError> {
        let lock = self.group_lock(group_id);
        let _guard = lock.lock().expect("group lock poisoned");
        self.apply_settlement_locked(group_id, from_user, to_user, amount)
    }

    /// [`apply_settlement`](Self::apply_settlement) for callers already
    /// holding the group's lock.
    pub(crate) fn apply_settlement_locked(
        &self,
        group_id: &str,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> Result<(), DomainError> {
        let row = self
            .balance_repository
            .get_pair_balance(group_id, from_user, to_user)?;
        let row = match row {
            Some(row) => row,
            None => return Err(DomainError::NotFound("Balance".to_string())),
        };
        self.check_finite(&row)?;

        let available = row.debt_from(from_user);
        if available <= 0.0 {
            return Err(DomainError::NotFound("Balance".to_string()));
        }
        if amount > available {
            return Err(DomainError::ExceedsBalance {
                requested: amount,
                available,
            });
        }

        let mut updated = row.clone();
        updated.amount -= row.signed_delta(from_user, amount);
        info!(
            "Settlement in group {}: {} paid {} {:.2}, remaining pair amount {:.2}",
            group_id, from_user, to_user, amount, updated.amount
        );
        self.store_or_prune(updated)
    }

    /// Outstanding directional debt `from_user` -> `to_user`, if any.
    pub fn directional_balance(
        &self,
        group_id: &str,
        from_user: &str,
        to_user: &str,
    ) -> Result<Option<f64>, DomainError> {
        let row = self
            .balance_repository
            .get_pair_balance(group_id, from_user, to_user)?;
        match row {
            Some(row) => {
                self.check_finite(&row)?;
                let debt = row.debt_from(from_user);
                Ok(if debt > 0.0 { Some(debt) } else { None })
            }
            None => Ok(None),
        }
    }

    /// All outstanding directional balances in a group, ordered by debtor
    /// then creditor.
    pub fn list_balances(&self, group_id: &str) -> Result<Vec<Balance>, DomainError> {
        let rows = self.balance_repository.list_group_balances(group_id)?;
        let mut balances = Vec::new();
        for row in rows {
            self.check_finite(&row)?;
            if let Some(balance) = row.directional() {
                balances.push(balance);
            }
        }
        balances.sort_by(|a, b| {
            (a.from_user.as_str(), a.to_user.as_str())
                .cmp(&(b.from_user.as_str(), b.to_user.as_str()))
        });
        Ok(balances)
    }

    fn apply_debt_locked(
        &self,
        group_id: &str,
        from_user: &str,
        to_user: &str,
        amount: f64,
    ) -> Result<(), DomainError> {
        if from_user == to_user {
            return Err(DomainError::Validation(
                "Debtor and creditor must differ".to_string(),
            ));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(DomainError::Validation(
                "Debt amount must be a non-negative number".to_string(),
            ));
        }

        let row = self
            .balance_repository
            .get_pair_balance(group_id, from_user, to_user)?
            .unwrap_or_else(|| PairBalance::zero(group_id, from_user, to_user));
        self.check_finite(&row)?;

        let mut updated = row.clone();
        updated.amount += row.signed_delta(from_user, amount);
        self.check_finite(&updated)?;

        info!(
            "Debt in group {}: {} owes {} {:.2} more, pair ({}, {}) now {:.2}",
            group_id, from_user, to_user, amount, updated.user_low, updated.user_high,
            updated.amount
        );
        self.store_or_prune(updated)
    }

    /// Persist the row, or delete it when it has netted out to (near) zero.
    fn store_or_prune(&self, row: PairBalance) -> Result<(), DomainError> {
        if row.is_settled() {
            self.balance_repository
                .delete_pair_balance(&row.group_id, &row.user_low, &row.user_high)?;
        } else {
            self.balance_repository.upsert_pair_balance(&row)?;
        }
        Ok(())
    }

    fn check_finite(&self, row: &PairBalance) -> Result<(), DomainError> {
        if row.amount.is_finite() {
            return Ok(());
        }
        error!(
            "Balance for pair ({}, {}) in group {} is not a finite number: {}",
            row.user_low, row.user_high, row.group_id, row.amount
        );
        Err(DomainError::Inconsistent(format!(
            "Balance for pair ({}, {}) is not a finite number",
            row.user_low, row.user_high
        )))
    }
}
