use crate::{
    auth::StaffUser,
    entities::order::OrderStatus,
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::orders::{UpdatePriorityRequest, UpdateTrackingRequest},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for the staff order console
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/tracking", put(update_tracking))
        .route("/:id/priority", put(update_priority))
        .route("/:id/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_per_page")]
    per_page: u64,
    status: Option<OrderStatus>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// List orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(crate::handlers::common::PaginationParams),
    responses(
        (status = 200, description = "Paginated orders"),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not staff", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .services
        .orders
        .list_orders(query.page, query.per_page, query.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(response))
}

/// Fetch one order with its embedded cart snapshot.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order"),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))?;

    Ok(success_response(order))
}

async fn update_tracking(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTrackingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .orders
        .update_tracking(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn update_priority(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePriorityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_priority(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

async fn update_status(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
