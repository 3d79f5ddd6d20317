//! The five HTTP endpoints (§6).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use nanorelay_core::{PaymentId, StateBlock};
use nanorelay_engine::LifecycleController;

use crate::error::ApiError;

pub type SharedController = Arc<LifecycleController>;

#[derive(Deserialize)]
pub struct NewPaymentRequest {
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "Amount")]
    amount: String,
}

#[derive(Serialize)]
pub struct NewPaymentResponse {
    id: String,
    account: String,
}

pub async fn new_payment(
    State(ctl): State<SharedController>,
    Json(req): Json<NewPaymentRequest>,
) -> Result<Json<NewPaymentResponse>, ApiError> {
    let (id, account) = ctl.new_payment(&req.account, &req.amount).await?;
    Ok(Json(NewPaymentResponse {
        id: id.as_str().to_string(),
        account: account.to_display(),
    }))
}

#[derive(Deserialize)]
pub struct WaitRequest {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Timeout")]
    timeout: Option<u64>,
}

#[derive(Serialize)]
pub struct WaitResponse {
    id: String,
    block_hash: String,
}

pub async fn wait_payment(
    State(ctl): State<SharedController>,
    Json(req): Json<WaitRequest>,
) -> Result<Json<WaitResponse>, ApiError> {
    let id = PaymentId(req.id);
    let timeout = req.timeout.map(Duration::from_secs);
    let hash = ctl.wait_payment(&id, timeout).await?;
    Ok(Json(WaitResponse {
        id: id.as_str().to_string(),
        block_hash: hash.to_hex(),
    }))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Serialize)]
pub struct CancelResponse {}

pub async fn cancel_payment(
    State(ctl): State<SharedController>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, ApiError> {
    let id = PaymentId(req.id);
    ctl.cancel_payment(&id).await?;
    Ok(Json(CancelResponse {}))
}

#[derive(Deserialize)]
pub struct PayQuery {
    id: String,
}

#[derive(Serialize)]
pub struct PayResponse {
    id: String,
    block_hash: String,
}

pub async fn pay(
    State(ctl): State<SharedController>,
    Query(query): Query<PayQuery>,
    body: axum::body::Bytes,
) -> Result<Json<PayResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError(nanorelay_core::PaymentError::upstream(
            "paste this URL into a wallet which supports payment URLs",
        )));
    }
    let block: StateBlock = serde_json::from_slice(&body)
        .map_err(|e| nanorelay_core::PaymentError::validation(format!("malformed block JSON: {e}")))?;

    let id = PaymentId(query.id);
    let hash = ctl.handoff_payment(&id, block).await?;
    Ok(Json(PayResponse {
        id: id.as_str().to_string(),
        block_hash: hash.to_hex(),
    }))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    id: String,
    block_hash: String,
}

pub async fn status_payment(
    State(ctl): State<SharedController>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = PaymentId(req.id);
    let hash = ctl.status_payment(&id)?;
    Ok(Json(StatusResponse {
        id: id.as_str().to_string(),
        block_hash: hash.map(|h| h.to_hex()).unwrap_or_default(),
    }))
}
