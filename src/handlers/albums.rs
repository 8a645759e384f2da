use crate::{
    auth::StaffUser,
    errors::ApiError,
    handlers::common::{created_response, map_service_error, no_content_response,
        success_response},
    services::catalog::{AddPhotoInput, CreateAlbumInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, post, put},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use uuid::Uuid;

/// Router for album and photo administration
pub fn album_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_album).get(list_albums))
        .route("/:id/enabled", put(set_enabled))
        .route("/:id/photos", post(add_photo).get(list_photos))
}

/// Router for photo deletion addressed by photo id
pub fn photo_routes() -> Router<AppState> {
    Router::new().route("/:id", delete(delete_photo))
}

async fn create_album(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Json(payload): Json<CreateAlbumInput>,
) -> Result<impl IntoResponse, ApiError> {
    let album = state
        .services
        .catalog
        .create_album(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(album))
}

#[derive(Debug, Deserialize)]
struct AlbumListQuery {
    course_id: Option<Uuid>,
}

async fn list_albums(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Query(query): Query<AlbumListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let albums = state
        .services
        .catalog
        .list_albums(query.course_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(albums))
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
    let album = state
        .services
        .catalog
        .set_album_enabled(id, payload.enabled)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(album))
}

#[derive(Debug, Deserialize)]
struct AddPhotoBody {
    name: String,
    /// Image bytes, base64-encoded by the uploading console.
    body_base64: String,
}

async fn add_photo(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(album_id): Path<Uuid>,
    Json(payload): Json<AddPhotoBody>,
) -> Result<impl IntoResponse, ApiError> {
    let body = STANDARD.decode(payload.body_base64.as_bytes()).map_err(|_| {
        ApiError::BadRequest {
            message: "body_base64 is not valid base64".to_string(),
            error_code: Some("INVALID_IMAGE".to_string()),
        }
    })?;

    let photo = state
        .services
        .catalog
        .add_photo(
            album_id,
            AddPhotoInput {
                name: payload.name,
                body,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(photo))
}

async fn list_photos(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(album_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let photos = state
        .services
        .catalog
        .list_photos(album_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(photos))
}

async fn delete_photo(
    State(state): State<AppState>,
    StaffUser(_session): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_photo(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
