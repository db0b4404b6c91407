//! Payment collaborator callbacks and payment-status reads.
//!
//! The gateway-facing integration (signatures, intents, retries) lives in
//! the payment collaborator itself. This module only accepts its abstract
//! callback - "this order's charge succeeded/failed" - and exposes the
//! resulting payment status to shoppers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use clementine_core::{OrderId, PaymentStatus};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Build the payments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payments/webhook", post(webhook))
        .route("/api/payments/status/{order_id}", get(status))
}

/// Payment collaborator callback body.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    /// `payment.succeeded` or `payment.failed`; other events are ignored.
    pub event: String,
    pub order_id: i32,
}

/// Webhook acknowledgement body.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Payment status response body.
#[derive(Debug, Serialize)]
pub struct PaymentStatusView {
    pub order_id: OrderId,
    pub payment_status: PaymentStatus,
}

/// Handle a payment callback.
///
/// Always acknowledges with 200 so the collaborator does not retry
/// forever; failures (unknown order, illegal transition) are logged.
#[instrument(skip(state))]
async fn webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Json<WebhookAck> {
    let order_id = OrderId::new(event.order_id);
    let outcome = match event.event.as_str() {
        "payment.succeeded" => state.orders().payment_confirmed(order_id).await.map(|_| ()),
        "payment.failed" => state.orders().payment_failed(order_id).await.map(|_| ()),
        other => {
            tracing::debug!(event = other, "ignoring unknown payment event");
            Ok(())
        }
    };

    if let Err(err) = outcome {
        tracing::warn!(order_id = %order_id, error = %err, "payment webhook not applied");
    }

    Json(WebhookAck { received: true })
}

/// Get an order's payment status (owner or admin).
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn status(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<PaymentStatusView>> {
    let order = state
        .orders()
        .order(requester, OrderId::new(order_id))
        .await?;
    Ok(Json(PaymentStatusView {
        order_id: order.id,
        payment_status: order.payment_status,
    }))
}
