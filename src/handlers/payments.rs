use crate::{
    auth::StaffUser,
    errors::ApiError,
    handlers::common::{map_service_error, success_response},
    services::payments::{CallbackOutcome, GatewayCallback},
    AppState,
};
use axum::{
    extract::{Form, Path, State},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::payment;

/// Creates the router for payment endpoints
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/gateway/callback", post(gateway_callback))
        .route("/by-order/:order_id", get(get_payment_for_order))
}

/// Receive the gateway's asynchronous transaction result.
///
/// The gateway posts form-encoded fields; the response is a confirmation view
/// rendered for the buyer's browser, not a JSON API. Replayed callbacks are
/// answered from the stored outcome without re-applying state.
#[utoipa::path(
    post,
    path = "/api/v1/payments/gateway/callback",
    request_body = String,
    responses(
        (status = 200, description = "Confirmation view (HTML)"),
        (status = 400, description = "Malformed callback", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn gateway_callback(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let callback = GatewayCallback::from_form(form).map_err(map_service_error)?;
    let outcome = state
        .services
        .payments
        .handle_callback(callback)
        .await
        .map_err(map_service_error)?;

    Ok(Html(render_confirmation(&outcome)))
}

/// Staff: inspect the payment attached to an order.
async fn get_payment_for_order(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = payment::Entity::find()
        .filter(payment::Column::OrderId.eq(order_id))
        .one(&*state.db)
        .await
        .map_err(|e| ApiError::ServiceError(crate::errors::ServiceError::db_error(e)))?
        .ok_or_else(|| ApiError::NotFound(format!("No payment for order {}", order_id)))?;

    Ok(success_response(payment))
}

/// Minimal confirmation page carrying `{orderId, status, message}` for the
/// buyer, mirroring what the storefront renders after the gateway redirect.
fn render_confirmation(outcome: &CallbackOutcome) -> String {
    let status = if outcome.success { "SUCCESS" } else { "FAILED" };
    let order_id = outcome
        .order_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Payment {status}</title></head>\n<body>\n  <h1 data-status=\"{status}\">Payment {status}</h1>\n  <p data-order-id=\"{order_id}\">Order: {order_id}</p>\n  <p>{message}</p>\n</body>\n</html>\n",
        status = status,
        order_id = order_id,
        message = outcome.message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_view_reflects_outcome() {
        let ok = render_confirmation(&CallbackOutcome {
            order_id: Some(Uuid::nil()),
            success: true,
            message: "Payment completed".into(),
        });
        assert!(ok.contains("data-status=\"SUCCESS\""));
        assert!(ok.contains(&Uuid::nil().to_string()));

        let failed = render_confirmation(&CallbackOutcome {
            order_id: None,
            success: false,
            message: "Unknown payment".into(),
        });
        assert!(failed.contains("data-status=\"FAILED\""));
        assert!(failed.contains("Order: -"));
    }
}
