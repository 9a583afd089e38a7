//! Settlement request/response workflow.
//!
//! A debtor requests to pay back part (or all) of what they owe; only the
//! creditor can accept or reject. The whole response runs under the group
//! lock, and accepting re-checks the debt there before the ledger is
//! touched, since balances may have moved between request and response.

use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::domain::commands::settlements::{
    RequestSettlementCommand, RespondToSettlementCommand,
};
use crate::domain::commands::RespondAction;
use crate::domain::errors::DomainError;
use crate::domain::ledger_service::LedgerService;
use crate::domain::models::settlement::{Settlement, SettlementStatus};
use crate::storage::traits::{Connection, SettlementStorage};

pub struct SettlementService<C: Connection> {
    settlement_repository: C::SettlementRepository,
    ledger_service: LedgerService<C>,
}

impl<C: Connection> Clone for SettlementService<C> {
    fn clone(&self) -> Self {
        Self {
            settlement_repository: self.settlement_repository.clone(),
            ledger_service: self.ledger_service.clone(),
        }
    }
}

impl<C: Connection> SettlementService<C> {
    pub fn new(connection: Arc<C>, ledger_service: LedgerService<C>) -> Self {
        Self {
            settlement_repository: connection.create_settlement_repository(),
            ledger_service,
        }
    }

    /// Record a pending settlement request from a debtor to their creditor.
    ///
    /// The amount is checked against the current debt so obviously bogus
    /// requests fail fast; the authoritative check happens again when the
    /// creditor accepts.
    pub fn request_settlement(
        &self,
        command: RequestSettlementCommand,
    ) -> Result<Settlement, DomainError> {
        if !command.amount.is_finite() || command.amount <= 0.0 {
            return Err(DomainError::Validation(
                "Settlement amount must be positive".to_string(),
            ));
        }
        if command.actor == command.to_user {
            return Err(DomainError::Validation(
                "Cannot settle a debt with yourself".to_string(),
            ));
        }

        let available = self
            .ledger_service
            .directional_balance(&command.group_id, &command.actor, &command.to_user)?
            .ok_or_else(|| DomainError::NotFound("Balance".to_string()))?;
        if command.amount > available {
            return Err(DomainError::ExceedsBalance {
                requested: command.amount,
                available,
            });
        }

        let settlement = Settlement {
            id: Settlement::generate_id(),
            group_id: command.group_id,
            from_user: command.actor,
            to_user: command.to_user,
            amount: command.amount,
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
        };
        self.settlement_repository.store_settlement(&settlement)?;
        info!(
            "Settlement {} requested: {} pays {} {:.2} in group {}",
            settlement.id,
            settlement.from_user,
            settlement.to_user,
            settlement.amount,
            settlement.group_id
        );
        Ok(settlement)
    }

    /// Let the creditor accept or reject a pending settlement. Acceptance
    /// applies the payment to the ledger before the settlement is marked
    /// Accepted, so a failed ledger update leaves it Pending.
    pub fn respond_to_settlement(
        &self,
        command: RespondToSettlementCommand,
    ) -> Result<Settlement, DomainError> {
        let action = RespondAction::from_token(&command.action)
            .ok_or_else(|| DomainError::InvalidAction(command.action.clone()))?;

        // First read only locates the settlement's group.
        let settlement = self
            .settlement_repository
            .get_settlement(&command.settlement_id)?
            .ok_or_else(|| DomainError::NotFound("Settlement".to_string()))?;
        let lock = self.ledger_service.group_lock(&settlement.group_id);
        let _guard = lock.lock().expect("group lock poisoned");

        // Re-read under the lock: a concurrent response may have resolved
        // the settlement between the two reads.
        let mut settlement = self
            .settlement_repository
            .get_settlement(&command.settlement_id)?
            .ok_or_else(|| DomainError::NotFound("Settlement".to_string()))?;

        if command.actor != settlement.to_user {
            return Err(DomainError::Forbidden(
                "Only the creditor can respond to this settlement".to_string(),
            ));
        }
        if settlement.status != SettlementStatus::Pending {
            return Err(DomainError::AlreadyResolved(
                "Settlement is not pending".to_string(),
            ));
        }

        match action {
            RespondAction::Accept => {
                self.ledger_service.apply_settlement_locked(
                    &settlement.group_id,
                    &settlement.from_user,
                    &settlement.to_user,
                    settlement.amount,
                )?;
                settlement.status = SettlementStatus::Accepted;
                info!(
                    "Settlement {} accepted, {:.2} cleared between {} and {}",
                    settlement.id, settlement.amount, settlement.from_user, settlement.to_user
                );
            }
            RespondAction::Reject => {
                settlement.status = SettlementStatus::Rejected;
                info!("Settlement {} rejected by {}", settlement.id, command.actor);
            }
        }
        settlement.responded_at = Some(Utc::now());
        self.settlement_repository.update_settlement(&settlement)?;
        Ok(settlement)
    }

    /// All settlements in a group, newest first.
    pub fn list_group_settlements(&self, group_id: &str) -> Result<Vec<Settlement>, DomainError> {
        let mut settlements = self.settlement_repository.list_group_settlements(group_id)?;
        settlements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(settlements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::TestHelper;
    use crate::storage::csv::CsvConnection;

    struct Services {
        settlement_service: SettlementService<CsvConnection>,
        ledger_service: LedgerService<CsvConnection>,
        _helper: TestHelper,
    }

    fn create_test_services() -> Services {
        let helper = TestHelper::new().unwrap();
        let connection = Arc::new(helper.env.connection.clone());
        let ledger_service = LedgerService::new(connection.clone());
        let settlement_service = SettlementService::new(connection, ledger_service.clone());
        Services {
            settlement_service,
            ledger_service,
            _helper: helper,
        }
    }

    fn request(services: &Services, from: &str, to: &str, amount: f64) -> Result<Settlement, DomainError> {
        services.settlement_service.request_settlement(RequestSettlementCommand {
            group_id: "trip".to_string(),
            actor: from.to_string(),
            to_user: to.to_string(),
            amount,
        })
    }

    fn respond(
        services: &Services,
        settlement_id: &str,
        actor: &str,
        action: &str,
    ) -> Result<Settlement, DomainError> {
        services.settlement_service.respond_to_settlement(RespondToSettlementCommand {
            settlement_id: settlement_id.to_string(),
            actor: actor.to_string(),
            action: action.to_string(),
        })
    }

    #[test]
    fn partial_settlement_reduces_debt() {
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();

        let settlement = request(&services, "bob", "alice", 20.0).unwrap();
        assert_eq!(settlement.status, SettlementStatus::Pending);

        let accepted = respond(&services, &settlement.id, "alice", "ACCEPT").unwrap();
        assert_eq!(accepted.status, SettlementStatus::Accepted);
        assert!(accepted.responded_at.is_some());
        assert_eq!(
            services.ledger_service.directional_balance("trip", "bob", "alice").unwrap(),
            Some(30.0)
        );
    }

    #[test]
    fn full_settlement_clears_the_balance() {
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();

        let settlement = request(&services, "bob", "alice", 50.0).unwrap();
        respond(&services, &settlement.id, "alice", "ACCEPT").unwrap();

        assert!(services.ledger_service.list_balances("trip").unwrap().is_empty());
    }

    #[test]
    fn request_over_debt_is_rejected() {
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();

        let result = request(&services, "bob", "alice", 50.01);
        assert!(matches!(result, Err(DomainError::ExceedsBalance { .. })));
    }

    #[test]
    fn request_without_debt_is_not_found() {
        let services = create_test_services();
        let result = request(&services, "bob", "alice", 10.0);
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[test]
    fn creditor_cannot_request_from_their_debtor() {
        // alice is owed 50 by bob; she has no debt in the other direction.
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();

        let result = request(&services, "alice", "bob", 10.0);
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[test]
    fn only_the_creditor_can_respond() {
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();
        let settlement = request(&services, "bob", "alice", 20.0).unwrap();

        let by_debtor = respond(&services, &settlement.id, "bob", "ACCEPT");
        assert!(matches!(by_debtor, Err(DomainError::Forbidden(_))));
        let by_stranger = respond(&services, &settlement.id, "mallory", "ACCEPT");
        assert!(matches!(by_stranger, Err(DomainError::Forbidden(_))));
    }

    #[test]
    fn rejection_leaves_the_ledger_untouched() {
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();
        let settlement = request(&services, "bob", "alice", 20.0).unwrap();

        let rejected = respond(&services, &settlement.id, "alice", "REJECT").unwrap();
        assert_eq!(rejected.status, SettlementStatus::Rejected);
        assert_eq!(
            services.ledger_service.directional_balance("trip", "bob", "alice").unwrap(),
            Some(50.0)
        );
    }

    #[test]
    fn resolved_settlement_cannot_be_responded_to_again() {
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();
        let settlement = request(&services, "bob", "alice", 20.0).unwrap();
        respond(&services, &settlement.id, "alice", "ACCEPT").unwrap();

        let again = respond(&services, &settlement.id, "alice", "ACCEPT");
        assert!(matches!(again, Err(DomainError::AlreadyResolved(_))));
    }

    #[test]
    fn concurrent_accepts_apply_the_settlement_once() {
        // Two racing creditor ACCEPTs: exactly one wins, the other sees the
        // settlement already resolved, and the debt shrinks only once.
        for _ in 0..10 {
            let services = create_test_services();
            services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();
            let settlement = request(&services, "bob", "alice", 20.0).unwrap();

            let barrier = Arc::new(std::sync::Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let service = services.settlement_service.clone();
                    let barrier = Arc::clone(&barrier);
                    let settlement_id = settlement.id.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        service.respond_to_settlement(RespondToSettlementCommand {
                            settlement_id,
                            actor: "alice".to_string(),
                            action: "ACCEPT".to_string(),
                        })
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(results
                .iter()
                .any(|r| matches!(r, Err(DomainError::AlreadyResolved(_)))));
            assert_eq!(
                services.ledger_service.directional_balance("trip", "bob", "alice").unwrap(),
                Some(30.0)
            );
        }
    }

    #[test]
    fn acceptance_fails_when_debt_shrank_after_the_request() {
        // bob owes 50, requests 50, then settles 30 out of band; accepting
        // the stale 50 request must fail and leave it pending.
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();
        let settlement = request(&services, "bob", "alice", 50.0).unwrap();
        services.ledger_service.apply_settlement("trip", "bob", "alice", 30.0).unwrap();

        let result = respond(&services, &settlement.id, "alice", "ACCEPT");
        assert!(matches!(result, Err(DomainError::ExceedsBalance { .. })));

        let listed = services.settlement_service.list_group_settlements("trip").unwrap();
        assert_eq!(listed[0].status, SettlementStatus::Pending);
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();

        assert!(matches!(request(&services, "bob", "alice", 0.0), Err(DomainError::Validation(_))));
        assert!(matches!(request(&services, "bob", "alice", -5.0), Err(DomainError::Validation(_))));
        assert!(matches!(request(&services, "bob", "bob", 5.0), Err(DomainError::Validation(_))));
    }

    #[test]
    fn settlements_list_newest_first() {
        let services = create_test_services();
        services.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();

        request(&services, "bob", "alice", 5.0).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = request(&services, "bob", "alice", 10.0).unwrap();

        let listed = services.settlement_service.list_group_settlements("trip").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
    }
}
