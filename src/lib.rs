//! Classpix API Library
//!
//! Backend for a multi-tenant school-photography platform: institutions own
//! academic years, courses and photo albums; parents unlock class galleries,
//! check out carts of photo products and packages through a payment gateway,
//! and accumulate download entitlements; staff administer the catalog and
//! orders.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod storage;

use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<axum::Json<ApiResponse<T>>, errors::ServiceError>;

/// The versioned API surface.
///
/// Parent surface: checkout, gallery unlock, downloads. Staff surface:
/// catalog, products and order administration. The gateway callback is
/// unauthenticated by design — the gateway is not a cookie-bearing client.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/health", handlers::health::health_routes())
        .nest("/checkout", handlers::checkout::checkout_routes())
        .nest("/payments", handlers::payments::payment_routes())
        .nest("/orders", handlers::orders::order_routes())
        .nest("/institutions", handlers::institutions::institution_routes())
        .nest(
            "/academic-years",
            handlers::institutions::academic_year_routes(),
        )
        .nest("/courses", handlers::courses::course_routes())
        .nest("/albums", handlers::albums::album_routes())
        .nest("/photos", handlers::albums::photo_routes())
        .nest("/product-types", handlers::products::product_type_routes())
        .nest("/packages", handlers::products::package_routes())
        .nest("/users", handlers::users::user_routes())
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn success_response_carries_data_and_timestamp() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        DateTime::parse_from_rfc3339(&response.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("oops"));
    }
}
