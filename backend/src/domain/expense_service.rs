//! Expense creation and approval workflow.
//!
//! An expense is created Pending with one approval record per participant;
//! the creator self-approves at creation time. It becomes Approved only when
//! every participant has accepted, at which point the computed shares are
//! folded into the group's balances exactly once. A single rejection makes
//! the expense Rejected immediately; remaining votes become moot.

use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::domain::commands::expenses::{
    CreateExpenseCommand, ExpenseWithApprovals, RespondToExpenseCommand,
};
use crate::domain::commands::RespondAction;
use crate::domain::errors::DomainError;
use crate::domain::ledger_service::LedgerService;
use crate::domain::models::expense::{
    ApprovalStatus, Expense, ExpenseApproval, ExpenseStatus,
};
use crate::domain::split::{compute_shares, validate_split};
use crate::storage::traits::{ApprovalStorage, Connection, ExpenseStorage};

const MAX_DESCRIPTION_LEN: usize = 256;

pub struct ExpenseService<C: Connection> {
    expense_repository: C::ExpenseRepository,
    approval_repository: C::ApprovalRepository,
    ledger_service: LedgerService<C>,
}

impl<C: Connection> Clone for ExpenseService<C> {
    fn clone(&self) -> Self {
        Self {
            expense_repository: self.expense_repository.clone(),
            approval_repository: self.approval_repository.clone(),
            ledger_service: self.ledger_service.clone(),
        }
    }
}

impl<C: Connection> ExpenseService<C> {
    pub fn new(connection: Arc<C>, ledger_service: LedgerService<C>) -> Self {
        Self {
            expense_repository: connection.create_expense_repository(),
            approval_repository: connection.create_approval_repository(),
            ledger_service,
        }
    }

    /// Create a new pending expense with its approval records.
    ///
    /// The split is validated first; an expense that fails validation is
    /// never persisted. The creator's approval record is stored as Accepted
    /// right away, so an expense whose only participant is the creator
    /// reaches consensus immediately.
    pub fn create_expense(&self, command: CreateExpenseCommand) -> Result<Expense, DomainError> {
        if command.description.is_empty() || command.description.len() > MAX_DESCRIPTION_LEN {
            return Err(DomainError::Validation(format!(
                "Description must be between 1 and {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
        if command.paid_by.is_empty() {
            return Err(DomainError::Validation(
                "Expense must name a payer".to_string(),
            ));
        }
        validate_split(command.total_amount, command.split_policy, &command.split_inputs)?;

        // Creation and any immediate consensus run under the group lock so
        // concurrent votes in the group cannot interleave with the approval
        // file rewrite.
        let lock = self.ledger_service.group_lock(&command.group_id);
        let _guard = lock.lock().expect("group lock poisoned");

        let participants = Expense::derive_participants(&command.split_inputs);
        let mut expense = Expense {
            id: Expense::generate_id(),
            group_id: command.group_id,
            description: command.description,
            total_amount: command.total_amount,
            paid_by: command.paid_by,
            split_policy: command.split_policy,
            split_inputs: command.split_inputs,
            participants,
            status: ExpenseStatus::Pending,
            created_by: command.actor.clone(),
            created_at: Utc::now(),
        };
        self.expense_repository.store_expense(&expense)?;

        let mut approvals = Vec::with_capacity(expense.participants.len());
        for participant in &expense.participants {
            // Business policy: the creator approves their own expense.
            let approval = if participant == &command.actor {
                ExpenseApproval {
                    expense_id: expense.id.clone(),
                    user_id: participant.clone(),
                    status: ApprovalStatus::Accepted,
                    responded_at: Some(Utc::now()),
                }
            } else {
                ExpenseApproval {
                    expense_id: expense.id.clone(),
                    user_id: participant.clone(),
                    status: ApprovalStatus::Pending,
                    responded_at: None,
                }
            };
            self.approval_repository.store_approval(&expense.group_id, &approval)?;
            approvals.push(approval);
        }

        info!(
            "Created expense {} in group {} with {} participant(s)",
            expense.id,
            expense.group_id,
            expense.participants.len()
        );

        if approvals.iter().all(|a| a.status == ApprovalStatus::Accepted) {
            self.approve_and_apply(&mut expense)?;
        }
        Ok(expense)
    }

    /// Record one participant's ACCEPT/REJECT vote and advance the expense
    /// state machine. Returns the expense in its post-vote state.
    pub fn respond_to_expense(
        &self,
        command: RespondToExpenseCommand,
    ) -> Result<Expense, DomainError> {
        let action = RespondAction::from_token(&command.action)
            .ok_or_else(|| DomainError::InvalidAction(command.action.clone()))?;

        // First read only locates the expense's group.
        let expense = self
            .expense_repository
            .get_expense(&command.expense_id)?
            .ok_or_else(|| DomainError::NotFound("Expense".to_string()))?;
        let lock = self.ledger_service.group_lock(&expense.group_id);
        let _guard = lock.lock().expect("group lock poisoned");

        // Re-read under the lock: a concurrent vote may have resolved the
        // expense between the two reads.
        let mut expense = self
            .expense_repository
            .get_expense(&command.expense_id)?
            .ok_or_else(|| DomainError::NotFound("Expense".to_string()))?;

        if expense.status != ExpenseStatus::Pending {
            return Err(DomainError::AlreadyResolved(
                "Expense is not pending".to_string(),
            ));
        }
        if !expense.is_participant(&command.actor) {
            return Err(DomainError::Forbidden(
                "Only participants can respond to this expense".to_string(),
            ));
        }

        let mut approval = self
            .approval_repository
            .get_approval(&expense.group_id, &expense.id, &command.actor)?
            .ok_or_else(|| DomainError::NotFound("Approval record".to_string()))?;
        if approval.status != ApprovalStatus::Pending {
            return Err(DomainError::AlreadyResolved(
                "You have already responded to this expense".to_string(),
            ));
        }

        approval.responded_at = Some(Utc::now());
        match action {
            RespondAction::Reject => {
                approval.status = ApprovalStatus::Rejected;
                self.approval_repository.update_approval(&expense.group_id, &approval)?;

                // One rejection is terminal; remaining votes are moot.
                expense.status = ExpenseStatus::Rejected;
                self.expense_repository.update_expense(&expense)?;
                info!("Expense {} rejected by {}", expense.id, command.actor);
            }
            RespondAction::Accept => {
                approval.status = ApprovalStatus::Accepted;
                self.approval_repository.update_approval(&expense.group_id, &approval)?;

                let approvals = self
                    .approval_repository
                    .list_expense_approvals(&expense.group_id, &expense.id)?;
                let all_accepted = approvals
                    .iter()
                    .all(|a| a.status == ApprovalStatus::Accepted);
                if all_accepted {
                    self.approve_and_apply(&mut expense)?;
                } else {
                    info!(
                        "Expense {} accepted by {}, waiting for other participants",
                        expense.id, command.actor
                    );
                }
            }
        }
        Ok(expense)
    }

    /// All expenses in a group with their approval records, newest first.
    pub fn list_group_expenses(
        &self,
        group_id: &str,
    ) -> Result<Vec<ExpenseWithApprovals>, DomainError> {
        let mut expenses = self.expense_repository.list_group_expenses(group_id)?;
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut result = Vec::with_capacity(expenses.len());
        for expense in expenses {
            let approvals = self
                .approval_repository
                .list_expense_approvals(group_id, &expense.id)?;
            result.push(ExpenseWithApprovals { expense, approvals });
        }
        Ok(result)
    }

    /// Consensus point: fold the shares into the group's balances, then mark
    /// the expense Approved. The ledger runs first so a storage failure
    /// leaves the expense Pending rather than Approved with unapplied
    /// shares. Caller must hold the group's lock, which also makes the
    /// all-accepted check and the ledger application one atomic step.
    fn approve_and_apply(&self, expense: &mut Expense) -> Result<(), DomainError> {
        let shares = compute_shares(
            expense.total_amount,
            expense.split_policy,
            &expense.split_inputs,
        );
        info!(
            "Expense {} approved, applying {} share(s) to group {} balances",
            expense.id,
            shares.len(),
            expense.group_id
        );
        self.ledger_service
            .apply_approved_expense_locked(&expense.group_id, &expense.paid_by, &shares)?;

        expense.status = ExpenseStatus::Approved;
        Ok(self.expense_repository.update_expense(expense)?)
    }
}
