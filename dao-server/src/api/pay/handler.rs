//! Payment webhook handler

use axum::{
    Form, Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::pay::PayNotifyForm;
use crate::utils::AppResult;
use shared::ApiResponse;

#[derive(Deserialize)]
pub struct NotifyQuery {
    pub method: String,
}

/// POST /v1/pay/notify - gateway settlement callback
pub async fn notify(
    State(state): State<ServerState>,
    Query(query): Query<NotifyQuery>,
    Form(form): Form<PayNotifyForm>,
) -> AppResult<Json<ApiResponse<()>>> {
    tracing::info!(
        method = %query.method,
        order_id = %form.order_id,
        status = %form.tx_status,
        "Payment notification received"
    );
    state
        .facade
        .handle_pay_notify(&query.method, &form.order_id, &form.tx_id, form.succeeded())
        .await?;
    Ok(Json(ApiResponse::ok(())))
}
