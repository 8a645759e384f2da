use crate::{
    auth::SessionUser,
    errors::ApiError,
    handlers::common::{created_response, map_service_error},
    services::orders::CreateOrderRequest,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};

/// Creates the router for checkout
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", post(submit_checkout))
}

/// Submit a cart for checkout.
///
/// Validates the cart against the live catalog, persists the order with its
/// flattened cart rows and signed payment request atomically, and returns the
/// gateway redirect payload.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created; body carries the gateway redirect payload"),
        (status = 400, description = "Validation failure or invalid catalog reference", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn submit_checkout(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .services
        .orders
        .create_order(session.id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(response))
}
