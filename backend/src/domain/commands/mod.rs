//! Command and result types consumed by the domain services.

pub mod expenses;
pub mod settlements;

/// Parsed ACCEPT/REJECT token from a respond request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespondAction {
    Accept,
    Reject,
}

impl RespondAction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ACCEPT" => Some(RespondAction::Accept),
            "REJECT" => Some(RespondAction::Reject),
            _ => None,
        }
    }
}
