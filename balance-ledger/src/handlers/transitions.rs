//! Transition endpoints. Authentication and authorization are enforced by
//! the hosting layer before requests reach these handlers.

use crate::models::{Address, EventEnvelope, Transition};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct DepositRequest {
    #[validate(length(min = 1, max = 255, message = "to must be 1-255 characters"))]
    pub to: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawRequest {
    #[validate(length(min = 1, max = 255, message = "from must be 1-255 characters"))]
    pub from: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferRequest {
    #[validate(length(min = 1, max = 255, message = "from must be 1-255 characters"))]
    pub from: String,
    #[validate(length(min = 1, max = 255, message = "to must be 1-255 characters"))]
    pub to: String,
    pub send_amount: Decimal,
    pub receive_amount: Decimal,
}

/// Body shared by lock and unlock.
#[derive(Debug, Deserialize, Validate)]
pub struct BalanceLockRequest {
    #[validate(length(min = 1, max = 255, message = "address must be 1-255 characters"))]
    pub address: String,
    pub amount: Decimal,
}

#[tracing::instrument(skip(state))]
pub async fn get_address(
    State(state): State<AppState>,
    Path(address_id): Path<String>,
) -> Result<Json<Address>, AppError> {
    Ok(Json(state.ledger.address(&address_id).await?))
}

/// Apply the per-operation request checks to a tagged transition.
fn validate_transition(transition: &Transition) -> Result<(), validator::ValidationErrors> {
    match transition.clone() {
        Transition::Deposit { to, amount } => DepositRequest { to, amount }.validate(),
        Transition::Withdraw { from, amount } => WithdrawRequest { from, amount }.validate(),
        Transition::Transfer {
            from,
            to,
            send_amount,
            receive_amount,
        } => TransferRequest {
            from,
            to,
            send_amount,
            receive_amount,
        }
        .validate(),
        Transition::Lock { address, amount } | Transition::Unlock { address, amount } => {
            BalanceLockRequest { address, amount }.validate()
        }
    }
}

#[tracing::instrument(skip(state, request))]
pub async fn apply_transition(
    State(state): State<AppState>,
    Json(request): Json<Transition>,
) -> Result<Json<EventEnvelope>, AppError> {
    validate_transition(&request)?;
    Ok(Json(state.ledger.apply(request).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    request.validate()?;
    Ok(Json(state.ledger.deposit(&request.to, request.amount).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn withdraw(
    State(state): State<AppState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    request.validate()?;
    Ok(Json(
        state.ledger.withdraw(&request.from, request.amount).await?,
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    request.validate()?;
    let event = state
        .ledger
        .transfer(
            &request.from,
            &request.to,
            request.send_amount,
            request.receive_amount,
        )
        .await?;
    Ok(Json(event))
}

#[tracing::instrument(skip(state, request))]
pub async fn lock(
    State(state): State<AppState>,
    Json(request): Json<BalanceLockRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    request.validate()?;
    Ok(Json(
        state.ledger.lock(&request.address, request.amount).await?,
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn unlock(
    State(state): State<AppState>,
    Json(request): Json<BalanceLockRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    request.validate()?;
    Ok(Json(
        state.ledger.unlock(&request.address, request.amount).await?,
    ))
}
