//! Gateway callback endpoint.
//!
//! Answers 200 for anything that reached it, including callbacks it
//! rejected, so gateways stop redelivering them. The body carries the
//! outcome for operators reading gateway dashboards.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::application::handlers::payment::{HandleGatewayWebhookCommand, WebhookOutcome};
use crate::domain::ordering::Gateway;

use super::AppState;

/// Header Stripe signs its events in.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
/// Header the redirect gateways sign their callbacks in.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Webhook routes, mounted under `/api/webhooks`.
///
/// # Routes
/// - `POST /:gateway` - Signed payment status callback
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/:gateway", post(handle_gateway_webhook))
}

/// POST /api/webhooks/:gateway
pub async fn handle_gateway_webhook(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let gateway = match gateway.parse::<Gateway>() {
        Ok(gateway) => gateway,
        Err(_) => {
            tracing::warn!(gateway = %gateway, "Webhook for unknown gateway");
            return Json(WebhookOutcome::Rejected {
                reason: format!("unknown gateway: {}", gateway),
            });
        }
    };

    let signature = signature_header(&headers, gateway);
    let outcome = state
        .webhook_handler()
        .handle(HandleGatewayWebhookCommand {
            gateway,
            payload: body.to_vec(),
            signature,
        })
        .await;
    Json(outcome)
}

fn signature_header(headers: &HeaderMap, gateway: Gateway) -> Option<String> {
    let name = match gateway {
        Gateway::Stripe => STRIPE_SIGNATURE_HEADER,
        _ => WEBHOOK_SIGNATURE_HEADER,
    };
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn stripe_reads_its_own_header() {
        let mut headers = HeaderMap::new();
        headers.insert(STRIPE_SIGNATURE_HEADER, HeaderValue::from_static("t=1,v1=abc"));
        headers.insert(WEBHOOK_SIGNATURE_HEADER, HeaderValue::from_static("other"));

        assert_eq!(
            signature_header(&headers, Gateway::Stripe).as_deref(),
            Some("t=1,v1=abc")
        );
        assert_eq!(
            signature_header(&headers, Gateway::Bkash).as_deref(),
            Some("other")
        );
    }

    #[test]
    fn missing_header_is_none() {
        assert!(signature_header(&HeaderMap::new(), Gateway::Nagad).is_none());
    }
}
