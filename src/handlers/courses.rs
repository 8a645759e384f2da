use crate::{
    auth::{SessionUser, StaffUser},
    errors::ApiError,
    handlers::common::{created_response, map_service_error, success_response},
    services::catalog::{CreateCourseInput, UpdateCourseInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Router for course administration and the parent-facing gallery
pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course).get(list_courses))
        .route("/:id", get(get_course).put(update_course))
        .route("/:id/enabled", put(set_enabled))
        .route("/:id/gallery", post(open_gallery))
}

async fn create_course(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Json(payload): Json<CreateCourseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state
        .services
        .catalog
        .create_course(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(course))
}

#[derive(Debug, Deserialize)]
struct CourseListQuery {
    academic_year_id: Option<Uuid>,
}

async fn list_courses(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Query(query): Query<CourseListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state
        .services
        .catalog
        .list_courses(query.academic_year_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(courses))
}

async fn get_course(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state
        .services
        .catalog
        .get_course(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(course))
}

async fn update_course(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state
        .services
        .catalog
        .update_course(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(course))
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
    let course = state
        .services
        .catalog
        .set_course_enabled(id, payload.enabled)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(course))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpenGalleryRequest {
    #[validate(length(min = 1, message = "Access code is required"))]
    access_code: String,
}

/// Unlock a course gallery with its access code.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/gallery",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Albums, photos and purchasable products for the course"),
        (status = 403, description = "Access code mismatch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown or disabled course", body = crate::errors::ErrorResponse),
        (status = 410, description = "Gallery window closed", body = crate::errors::ErrorResponse)
    ),
    tag = "Gallery"
)]
pub async fn open_gallery(
    State(state): State<AppState>,
    SessionUser(_session): SessionUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OpenGalleryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;
    let gallery = state
        .services
        .catalog
        .gallery(id, &payload.access_code)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(gallery))
}
