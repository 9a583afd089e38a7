//! Commands for the settlement workflow.

/// A debtor (`actor`) claims to have paid `to_user` outside the system.
#[derive(Debug, Clone)]
pub struct RequestSettlementCommand {
    pub group_id: String,
    pub actor: String,
    pub to_user: String,
    pub amount: f64,
}

/// The creditor's ACCEPT/REJECT response to a pending settlement.
#[derive(Debug, Clone)]
pub struct RespondToSettlementCommand {
    pub settlement_id: String,
    pub actor: String,
    pub action: String,
}
