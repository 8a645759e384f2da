use crate::{
    auth::StaffUser,
    errors::ApiError,
    handlers::common::{created_response, map_service_error, success_response},
    services::products::{CreatePackageInput, CreateProductTypeInput, CreateVariationInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Router for product-type administration
pub fn product_type_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product_type).get(list_product_types))
        .route("/:id/variations", post(create_variation).get(list_variations))
}

/// Router for package administration
pub fn package_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_package).get(list_packages))
        .route("/:id", get(get_package))
        .route("/:id/enabled", put(set_package_enabled))
}

async fn create_product_type(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Json(payload): Json<CreateProductTypeInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product_type = state
        .services
        .products
        .create_product_type(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product_type))
}

async fn list_product_types(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
) -> Result<impl IntoResponse, ApiError> {
    let product_types = state
        .services
        .products
        .list_product_types()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product_types))
}

async fn create_variation(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(product_type_id): Path<Uuid>,
    Json(payload): Json<CreateVariationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let variation = state
        .services
        .products
        .create_variation(product_type_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(variation))
}

async fn list_variations(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(product_type_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let variations = state
        .services
        .products
        .list_variations(product_type_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(variations))
}

async fn create_package(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Json(payload): Json<CreatePackageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let package = state
        .services
        .products
        .create_package(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(package))
}

#[derive(Debug, Deserialize)]
struct PackageListQuery {
    institution_id: Option<Uuid>,
}

async fn list_packages(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Query(query): Query<PackageListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let packages = state
        .services
        .products
        .list_packages(query.institution_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(packages))
}

async fn get_package(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let package = state
        .services
        .products
        .get_package(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(package))
}

#[derive(Debug, Deserialize)]
struct SetEnabledRequest {
    enabled: bool,
}

async fn set_package_enabled(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetEnabledRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let package = state
        .services
        .products
        .set_package_enabled(id, payload.enabled)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(package))
}
