mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::json;

use classpix_api::{
    entities::user::UserRole,
    services::catalog::UpdateCourseInput,
};

#[tokio::test]
async fn correct_access_code_opens_the_gallery() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app
        .create_user("Aisyah", "aisyah@example.com", UserRole::Parent)
        .await;
    let cookie = app.cookie_for(&parent);

    // Put one photo in the album so the gallery has content.
    app.state
        .services
        .catalog
        .add_photo(
            seeded.album_id,
            classpix_api::services::catalog::AddPhotoInput {
                name: "front-row".to_string(),
                body: vec![0xFF, 0xD8, 0xFF],
            },
        )
        .await
        .unwrap();

    let (status, body) = app
        .request_json(
            Method::POST,
            &format!("/api/v1/courses/{}/gallery", seeded.course_id),
            Some(&cookie),
            Some(json!({ "access_code": seeded.access_code })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["course_name"], "5 Bestari");
    let albums = body["albums"].as_array().unwrap();
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0]["photos"].as_array().unwrap().len(), 1);
    // The gallery serves watermarked previews, never originals.
    let preview = albums[0]["photos"][0]["preview_url"].as_str().unwrap();
    assert!(preview.contains("previews/"));
}

#[tokio::test]
async fn wrong_access_code_is_forbidden() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app
        .create_user("Aisyah", "aisyah@example.com", UserRole::Parent)
        .await;
    let cookie = app.cookie_for(&parent);

    let (status, _) = app
        .request_json(
            Method::POST,
            &format!("/api/v1/courses/{}/gallery", seeded.course_id),
            Some(&cookie),
            Some(json!({ "access_code": "WRONG123" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn closed_validity_window_is_gone() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app
        .create_user("Aisyah", "aisyah@example.com", UserRole::Parent)
        .await;
    let cookie = app.cookie_for(&parent);

    app.state
        .services
        .catalog
        .update_course(
            seeded.course_id,
            UpdateCourseInput {
                name: None,
                access_code: None,
                valid_from: Some(Utc::now() - Duration::days(60)),
                valid_until: Some(Utc::now() - Duration::days(30)),
            },
        )
        .await
        .unwrap();

    let (status, _) = app
        .request_json(
            Method::POST,
            &format!("/api/v1/courses/{}/gallery", seeded.course_id),
            Some(&cookie),
            Some(json!({ "access_code": seeded.access_code })),
        )
        .await;

    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn disabled_course_reads_as_not_found() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app
        .create_user("Aisyah", "aisyah@example.com", UserRole::Parent)
        .await;
    let cookie = app.cookie_for(&parent);

    app.state
        .services
        .catalog
        .set_course_enabled(seeded.course_id, false)
        .await
        .unwrap();

    let (status, _) = app
        .request_json(
            Method::POST,
            &format!("/api/v1/courses/{}/gallery", seeded.course_id),
            Some(&cookie),
            Some(json!({ "access_code": seeded.access_code })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_surface_is_staff_gated() {
    let app = TestApp::new().await;
    let parent = app
        .create_user("Aisyah", "aisyah@example.com", UserRole::Parent)
        .await;
    let staff = app
        .create_user("Mei Ling", "meiling@classpix.io", UserRole::Staff)
        .await;

    let payload = json!({ "name": "SMK Bukit Indah", "contact_email": "office@smkbi.edu.my" });

    // Parents cannot administer institutions.
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/institutions",
            Some(&app.cookie_for(&parent)),
            Some(payload.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // No cookie at all: unauthorized.
    let (status, _) = app
        .request_json(Method::POST, "/api/v1/institutions", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Staff can.
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/institutions",
            Some(&app.cookie_for(&staff)),
            Some(payload),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "SMK Bukit Indah");
}

#[tokio::test]
async fn duplicate_user_email_reports_the_field() {
    let app = TestApp::new().await;
    let staff = app
        .create_user("Mei Ling", "meiling@classpix.io", UserRole::Staff)
        .await;
    app.create_user("Aisyah", "aisyah@example.com", UserRole::Parent)
        .await;

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/users",
            Some(&app.cookie_for(&staff)),
            Some(json!({
                "name": "Imposter",
                "email": "aisyah@example.com",
                "phone": null,
                "role": "parent"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(
        body["message"].as_str().unwrap().contains("email"),
        "message should name the duplicate field: {body}"
    );
}
