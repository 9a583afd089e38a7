//! HTTP layer: route table, handlers, and wire-type conversions.
//!
//! Handlers stay thin. They translate wire requests into domain commands,
//! call a service, and map `DomainError` variants onto status codes. No
//! business rules live here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::domain::commands::expenses::{CreateExpenseCommand, RespondToExpenseCommand};
use crate::domain::commands::settlements::{
    RequestSettlementCommand, RespondToSettlementCommand,
};
use crate::domain::errors::DomainError;
use crate::domain::models;
use crate::domain::{ExpenseService, LedgerService, SettlementService};
use crate::storage::csv::CsvConnection;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub expense_service: ExpenseService<CsvConnection>,
    pub settlement_service: SettlementService<CsvConnection>,
    pub ledger_service: LedgerService<CsvConnection>,
}

impl AppState {
    pub fn new(backend: &crate::Backend) -> Self {
        Self {
            expense_service: backend.expense_service.clone(),
            settlement_service: backend.settlement_service.clone(),
            ledger_service: backend.ledger_service.clone(),
        }
    }
}

/// Build the API router. Paths are rooted at `/api`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/groups/:group_id/expenses",
            post(create_expense).get(list_expenses),
        )
        .route("/api/expenses/:expense_id/respond", post(respond_to_expense))
        .route("/api/groups/:group_id/balances", get(list_balances))
        .route(
            "/api/groups/:group_id/settlements",
            post(request_settlement).get(list_settlements),
        )
        .route(
            "/api/settlements/:settlement_id/respond",
            post(respond_to_settlement),
        )
        .with_state(state)
}

/// POST /api/groups/:group_id/expenses
pub async fn create_expense(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(request): Json<shared::CreateExpenseRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/groups/{}/expenses - {} by {}",
        group_id, request.description, request.user_id
    );

    let command = CreateExpenseCommand {
        group_id,
        actor: request.user_id,
        description: request.description,
        total_amount: request.total_amount,
        paid_by: request.paid_by,
        split_policy: split_policy_from_wire(request.split_policy),
        split_inputs: request
            .split_inputs
            .into_iter()
            .map(split_input_from_wire)
            .collect(),
    };
    match state.expense_service.create_expense(command) {
        Ok(expense) => (StatusCode::CREATED, Json(expense_to_wire(&expense))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/groups/:group_id/expenses
pub async fn list_expenses(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/groups/{}/expenses", group_id);

    match state.expense_service.list_group_expenses(&group_id) {
        Ok(expenses) => {
            let response = shared::ExpenseListResponse {
                expenses: expenses
                    .iter()
                    .map(|e| shared::ExpenseWithApprovals {
                        expense: expense_to_wire(&e.expense),
                        approvals: e.approvals.iter().map(approval_to_wire).collect(),
                    })
                    .collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/expenses/:expense_id/respond
pub async fn respond_to_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<String>,
    Json(request): Json<shared::RespondRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/expenses/{}/respond - {} by {}",
        expense_id, request.action, request.user_id
    );

    let command = RespondToExpenseCommand {
        expense_id,
        actor: request.user_id,
        action: request.action,
    };
    match state.expense_service.respond_to_expense(command) {
        Ok(expense) => (StatusCode::OK, Json(expense_to_wire(&expense))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/groups/:group_id/balances
pub async fn list_balances(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/groups/{}/balances", group_id);

    match state.ledger_service.list_balances(&group_id) {
        Ok(balances) => {
            let response = shared::BalanceListResponse {
                balances: balances.iter().map(balance_to_wire).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/groups/:group_id/settlements
pub async fn request_settlement(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(request): Json<shared::RequestSettlementRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/groups/{}/settlements - {} -> {} ({:.2})",
        group_id, request.user_id, request.to_user, request.amount
    );

    let command = RequestSettlementCommand {
        group_id,
        actor: request.user_id,
        to_user: request.to_user,
        amount: request.amount,
    };
    match state.settlement_service.request_settlement(command) {
        Ok(settlement) => {
            (StatusCode::CREATED, Json(settlement_to_wire(&settlement))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/settlements/:settlement_id/respond
pub async fn respond_to_settlement(
    State(state): State<AppState>,
    Path(settlement_id): Path<String>,
    Json(request): Json<shared::RespondRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/settlements/{}/respond - {} by {}",
        settlement_id, request.action, request.user_id
    );

    let command = RespondToSettlementCommand {
        settlement_id,
        actor: request.user_id,
        action: request.action,
    };
    match state.settlement_service.respond_to_settlement(command) {
        Ok(settlement) => (StatusCode::OK, Json(settlement_to_wire(&settlement))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/groups/:group_id/settlements
pub async fn list_settlements(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/groups/{}/settlements", group_id);

    match state.settlement_service.list_group_settlements(&group_id) {
        Ok(settlements) => {
            let response = shared::SettlementListResponse {
                settlements: settlements.iter().map(settlement_to_wire).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

fn error_response(error: DomainError) -> Response {
    let status = match &error {
        DomainError::Validation(_)
        | DomainError::InvalidAction(_)
        | DomainError::ExceedsBalance { .. } => StatusCode::BAD_REQUEST,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::AlreadyResolved(_) => StatusCode::CONFLICT,
        DomainError::Inconsistent(_) | DomainError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {:?}", error);
        "Internal server error".to_string()
    } else {
        error.to_string()
    };
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn split_policy_from_wire(policy: shared::SplitPolicy) -> models::expense::SplitPolicy {
    match policy {
        shared::SplitPolicy::Equal => models::expense::SplitPolicy::Equal,
        shared::SplitPolicy::Exact => models::expense::SplitPolicy::Exact,
        shared::SplitPolicy::Percentage => models::expense::SplitPolicy::Percentage,
    }
}

fn split_policy_to_wire(policy: models::expense::SplitPolicy) -> shared::SplitPolicy {
    match policy {
        models::expense::SplitPolicy::Equal => shared::SplitPolicy::Equal,
        models::expense::SplitPolicy::Exact => shared::SplitPolicy::Exact,
        models::expense::SplitPolicy::Percentage => shared::SplitPolicy::Percentage,
    }
}

fn split_input_from_wire(input: shared::SplitInput) -> models::expense::SplitInput {
    models::expense::SplitInput {
        user_id: input.user_id,
        value: input.value,
    }
}

fn expense_to_wire(expense: &models::expense::Expense) -> shared::Expense {
    shared::Expense {
        id: expense.id.clone(),
        group_id: expense.group_id.clone(),
        description: expense.description.clone(),
        total_amount: expense.total_amount,
        paid_by: expense.paid_by.clone(),
        split_policy: split_policy_to_wire(expense.split_policy),
        split_inputs: expense
            .split_inputs
            .iter()
            .map(|i| shared::SplitInput {
                user_id: i.user_id.clone(),
                value: i.value,
            })
            .collect(),
        participants: expense.participants.clone(),
        status: match expense.status {
            models::expense::ExpenseStatus::Pending => shared::ExpenseStatus::Pending,
            models::expense::ExpenseStatus::Approved => shared::ExpenseStatus::Approved,
            models::expense::ExpenseStatus::Rejected => shared::ExpenseStatus::Rejected,
        },
        created_by: expense.created_by.clone(),
        created_at: expense.created_at.to_rfc3339(),
    }
}

fn approval_to_wire(approval: &models::expense::ExpenseApproval) -> shared::ExpenseApproval {
    shared::ExpenseApproval {
        expense_id: approval.expense_id.clone(),
        user_id: approval.user_id.clone(),
        status: match approval.status {
            models::expense::ApprovalStatus::Pending => shared::ApprovalStatus::Pending,
            models::expense::ApprovalStatus::Accepted => shared::ApprovalStatus::Accepted,
            models::expense::ApprovalStatus::Rejected => shared::ApprovalStatus::Rejected,
        },
        responded_at: approval.responded_at.map(|t| t.to_rfc3339()),
    }
}

fn balance_to_wire(balance: &models::balance::Balance) -> shared::Balance {
    shared::Balance {
        group_id: balance.group_id.clone(),
        from_user: balance.from_user.clone(),
        to_user: balance.to_user.clone(),
        amount: balance.amount,
    }
}

fn settlement_to_wire(settlement: &models::settlement::Settlement) -> shared::Settlement {
    shared::Settlement {
        id: settlement.id.clone(),
        group_id: settlement.group_id.clone(),
        from_user: settlement.from_user.clone(),
        to_user: settlement.to_user.clone(),
        amount: settlement.amount,
        status: match settlement.status {
            models::settlement::SettlementStatus::Pending => shared::SettlementStatus::Pending,
            models::settlement::SettlementStatus::Accepted => shared::SettlementStatus::Accepted,
            models::settlement::SettlementStatus::Rejected => shared::SettlementStatus::Rejected,
        },
        created_at: settlement.created_at.to_rfc3339(),
        responded_at: settlement.responded_at.map(|t| t.to_rfc3339()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backend;
    use tempfile::TempDir;

    fn setup_test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend = Backend::new(temp_dir.path()).expect("Failed to create backend");
        (AppState::new(&backend), temp_dir)
    }

    fn equal_request(user_id: &str, total: f64, users: &[&str]) -> shared::CreateExpenseRequest {
        shared::CreateExpenseRequest {
            user_id: user_id.to_string(),
            description: "Dinner".to_string(),
            total_amount: total,
            paid_by: user_id.to_string(),
            split_policy: shared::SplitPolicy::Equal,
            split_inputs: users
                .iter()
                .map(|u| shared::SplitInput {
                    user_id: u.to_string(),
                    value: 0.0,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn create_expense_returns_created() {
        let (state, _dir) = setup_test_state();

        let response = create_expense(
            State(state),
            Path("trip".to_string()),
            Json(equal_request("alice", 90.0, &["alice", "bob"])),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn invalid_split_returns_bad_request() {
        let (state, _dir) = setup_test_state();

        let request = shared::CreateExpenseRequest {
            user_id: "alice".to_string(),
            description: "Dinner".to_string(),
            total_amount: 100.0,
            paid_by: "alice".to_string(),
            split_policy: shared::SplitPolicy::Exact,
            split_inputs: vec![
                shared::SplitInput { user_id: "alice".to_string(), value: 40.0 },
                shared::SplitInput { user_id: "bob".to_string(), value: 50.0 },
            ],
        };
        let response = create_expense(State(state), Path("trip".to_string()), Json(request))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_expense_returns_not_found() {
        let (state, _dir) = setup_test_state();

        let response = respond_to_expense(
            State(state),
            Path("exp-missing".to_string()),
            Json(shared::RespondRequest {
                user_id: "bob".to_string(),
                action: "ACCEPT".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn accept_flow_produces_balances() {
        let (state, _dir) = setup_test_state();

        create_expense(
            State(state.clone()),
            Path("trip".to_string()),
            Json(equal_request("alice", 90.0, &["alice", "bob"])),
        )
        .await
        .into_response();

        let listed = state.expense_service.list_group_expenses("trip").unwrap();
        let expense_id = listed[0].expense.id.clone();

        let response = respond_to_expense(
            State(state.clone()),
            Path(expense_id.clone()),
            Json(shared::RespondRequest {
                user_id: "bob".to_string(),
                action: "ACCEPT".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let balances = list_balances(State(state.clone()), Path("trip".to_string()))
            .await
            .into_response();
        assert_eq!(balances.status(), StatusCode::OK);
        assert_eq!(
            state.ledger_service.directional_balance("trip", "bob", "alice").unwrap(),
            Some(45.0)
        );

        // A second vote from bob conflicts with the resolved expense.
        let again = respond_to_expense(
            State(state),
            Path(expense_id),
            Json(shared::RespondRequest {
                user_id: "bob".to_string(),
                action: "ACCEPT".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn settlement_flow_over_http_handlers() {
        let (state, _dir) = setup_test_state();
        state.ledger_service.apply_debt("trip", "bob", "alice", 50.0).unwrap();

        let created = request_settlement(
            State(state.clone()),
            Path("trip".to_string()),
            Json(shared::RequestSettlementRequest {
                user_id: "bob".to_string(),
                to_user: "alice".to_string(),
                amount: 60.0,
            }),
        )
        .await
        .into_response();
        assert_eq!(created.status(), StatusCode::BAD_REQUEST);

        let created = request_settlement(
            State(state.clone()),
            Path("trip".to_string()),
            Json(shared::RequestSettlementRequest {
                user_id: "bob".to_string(),
                to_user: "alice".to_string(),
                amount: 20.0,
            }),
        )
        .await
        .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);

        let settlements = state.settlement_service.list_group_settlements("trip").unwrap();
        let settlement_id = settlements[0].id.clone();

        // The debtor may not respond to their own request.
        let by_debtor = respond_to_settlement(
            State(state.clone()),
            Path(settlement_id.clone()),
            Json(shared::RespondRequest {
                user_id: "bob".to_string(),
                action: "ACCEPT".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(by_debtor.status(), StatusCode::FORBIDDEN);

        let accepted = respond_to_settlement(
            State(state.clone()),
            Path(settlement_id),
            Json(shared::RespondRequest {
                user_id: "alice".to_string(),
                action: "ACCEPT".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(accepted.status(), StatusCode::OK);
        assert_eq!(
            state.ledger_service.directional_balance("trip", "bob", "alice").unwrap(),
            Some(30.0)
        );
    }
}
