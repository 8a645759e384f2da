use crate::{
    auth::StaffUser,
    errors::ApiError,
    handlers::common::{created_response, map_service_error, success_response, PaginationParams},
    services::catalog::{CreateAcademicYearInput, CreateInstitutionInput, UpdateInstitutionInput},
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

/// Router for institution and academic-year administration
pub fn institution_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_institution).get(list_institutions))
        .route("/:id", get(get_institution).put(update_institution))
        .route("/:id/enabled", put(set_enabled))
        .route(
            "/:id/academic-years",
            post(create_academic_year).get(list_academic_years),
        )
}

/// Router for academic-year toggles addressed by their own id
pub fn academic_year_routes() -> Router<AppState> {
    Router::new().route("/:id/enabled", put(set_academic_year_enabled))
}

async fn create_institution(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Json(payload): Json<CreateInstitutionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let institution = state
        .services
        .catalog
        .create_institution(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(institution))
}

async fn list_institutions(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let institutions = state
        .services
        .catalog
        .list_institutions(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(institutions))
}

async fn get_institution(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let institution = state
        .services
        .catalog
        .get_institution(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(institution))
}

async fn update_institution(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInstitutionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let institution = state
        .services
        .catalog
        .update_institution(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(institution))
}

#[derive(Debug, Deserialize)]
struct SetEnabledRequest {
    enabled: bool,
}

async fn set_enabled(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetEnabledRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let institution = state
        .services
        .catalog
        .set_institution_enabled(id, payload.enabled)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(institution))
}

#[derive(Debug, Deserialize)]
struct CreateAcademicYearBody {
    label: String,
    starts_on: chrono::NaiveDate,
    ends_on: chrono::NaiveDate,
}

async fn create_academic_year(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(institution_id): Path<Uuid>,
    Json(payload): Json<CreateAcademicYearBody>,
) -> Result<impl IntoResponse, ApiError> {
    let year = state
        .services
        .catalog
        .create_academic_year(CreateAcademicYearInput {
            institution_id,
            label: payload.label,
            starts_on: payload.starts_on,
            ends_on: payload.ends_on,
        })
        .await
        .map_err(map_service_error)?;
    Ok(created_response(year))
}

async fn list_academic_years(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(institution_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let years = state
        .services
        .catalog
        .list_academic_years(Some(institution_id))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(years))
}

async fn set_academic_year_enabled(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetEnabledRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let year = state
        .services
        .catalog
        .set_academic_year_enabled(id, payload.enabled)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(year))
}
