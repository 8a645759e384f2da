use crate::{
    auth::{SessionUser, StaffUser},
    errors::ApiError,
    handlers::common::{created_response, map_service_error, success_response},
    services::users::CreateUserInput,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

/// Router for account endpoints
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/me/downloads", get(my_downloads))
}

/// Staff: provision an account.
async fn create_user(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Json(payload): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .create_user(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(user))
}

/// The caller's accumulated download entitlements.
#[utoipa::path(
    get,
    path = "/api/v1/users/me/downloads",
    responses(
        (status = 200, description = "Entitlement list", body = [crate::models::cart::Entitlement]),
        (status = 401, description = "Not logged in", body = crate::errors::ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn my_downloads(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
) -> Result<impl IntoResponse, ApiError> {
    let downloads = state
        .services
        .users
        .list_downloads(session.id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(downloads))
}
