use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use classpix_api::{
    auth::{encode_session, Session},
    config::AppConfig,
    db,
    entities::user::{self, UserRole},
    events::{self, EventSender},
    handlers::AppServices,
    models::cart::{CartUnit, PackageItem, PackageUnit, PhotoRef, ProductUnit, VariationChoice},
    services::{
        catalog::{CreateAcademicYearInput, CreateAlbumInput, CreateCourseInput,
            CreateInstitutionInput},
        ip_lookup::FixedIp,
        users::CreateUserInput,
    },
    storage::InMemoryPhotoStorage,
    AppState,
};

/// Fixed caller IP injected instead of the external echo service.
pub const TEST_CALLER_IP: &str = "203.0.113.7";

/// Helper harness spinning up the full router over a temporary SQLite
/// database. No external services are touched.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

/// Ids of a seeded institution/year/course/album chain.
#[derive(Debug, Clone)]
pub struct SeededCatalog {
    pub institution_id: Uuid,
    pub academic_year_id: Uuid,
    pub course_id: Uuid,
    pub album_id: Uuid,
    pub access_code: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = TempDir::new().expect("create temp dir for test database");
        let db_path = db_dir.path().join("classpix_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_session_secret_with_plenty_of_entropy_0123456789_ABCDEFGHIJKLmn".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.gateway.merchant_password = "test-merchant-password".to_string();
        cfg.gateway.service_id = "CLXTEST1".to_string();
        cfg.storage.signing_secret = "test-download-signing-secret".to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let storage = Arc::new(InMemoryPhotoStorage::new(&cfg.storage));
        let services = AppServices::new(
            db_arc.clone(),
            &cfg,
            storage,
            Arc::new(FixedIp(TEST_CALLER_IP.to_string())),
            Arc::new(event_sender.clone()),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", classpix_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            state,
            router,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Mints a signed session cookie for a user.
    pub fn cookie_for(&self, user: &user::Model) -> String {
        let session = Session {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            is_logged_in: true,
        };
        format!(
            "cx_session={}",
            encode_session(&self.state.config.session_secret, &session)
        )
    }

    pub async fn create_user(&self, name: &str, email: &str, role: UserRole) -> user::Model {
        self.state
            .services
            .users
            .create_user(CreateUserInput {
                name: name.to_string(),
                email: email.to_string(),
                phone: Some("+60123456789".to_string()),
                role,
            })
            .await
            .expect("create test user")
    }

    /// Seeds an enabled institution → academic year → course → album chain.
    pub async fn seed_catalog(&self) -> SeededCatalog {
        let catalog = &self.state.services.catalog;
        let now = Utc::now();

        let institution = catalog
            .create_institution(CreateInstitutionInput {
                name: "SK Taman Melati".to_string(),
                contact_email: Some("office@sktm.edu.my".to_string()),
            })
            .await
            .expect("seed institution");

        let year = catalog
            .create_academic_year(CreateAcademicYearInput {
                institution_id: institution.id,
                label: "2026/2027".to_string(),
                starts_on: now.date_naive(),
                ends_on: now.date_naive() + Duration::days(300),
            })
            .await
            .expect("seed academic year");

        let course = catalog
            .create_course(CreateCourseInput {
                institution_id: institution.id,
                academic_year_id: year.id,
                name: "5 Bestari".to_string(),
                access_code: Some("CLASS5B".to_string()),
                valid_from: now - Duration::days(1),
                valid_until: now + Duration::days(30),
            })
            .await
            .expect("seed course");

        let album = catalog
            .create_album(CreateAlbumInput {
                course_id: course.id,
                name: "Class portraits".to_string(),
                product_type_id: None,
            })
            .await
            .expect("seed album");

        SeededCatalog {
            institution_id: institution.id,
            academic_year_id: year.id,
            course_id: course.id,
            album_id: album.id,
            access_code: course.access_code,
        }
    }

    /// Adds another enabled album to the seeded course.
    pub async fn seed_album(&self, seeded: &SeededCatalog, name: &str) -> Uuid {
        self.state
            .services
            .catalog
            .create_album(CreateAlbumInput {
                course_id: seeded.course_id,
                name: name.to_string(),
                product_type_id: None,
            })
            .await
            .expect("seed extra album")
            .id
    }

    /// Sends a JSON request, returning status and parsed body.
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request should produce a response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Posts a form-encoded body (the gateway callback), returning status and
    /// the raw response text.
    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request should produce a response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }
}

fn urlencode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            b' ' => "+".to_string(),
            other => format!("%{:02X}", other),
        })
        .collect()
}

/// A product cart unit against the seeded catalog. `downloadable` drives the
/// digital-copy option flag.
pub fn product_unit(seeded: &SeededCatalog, downloadable: bool) -> CartUnit {
    CartUnit::Product(ProductUnit {
        institution_id: seeded.institution_id,
        academic_year_id: seeded.academic_year_id,
        course_id: seeded.course_id,
        album_id: seeded.album_id,
        photo: photo_ref("class-portrait"),
        options: vec![
            VariationChoice {
                variation_id: Uuid::new_v4(),
                name: "8x10 print".to_string(),
                price: dec!(15.00),
                is_downloadable: false,
            },
            VariationChoice {
                variation_id: Uuid::new_v4(),
                name: "digital copy".to_string(),
                price: dec!(5.00),
                is_downloadable: downloadable,
            },
        ],
    })
}

/// A package cart unit bundling the given albums with `photos_per_album`
/// photos each.
pub fn package_unit(
    seeded: &SeededCatalog,
    album_ids: &[Uuid],
    photos_per_album: usize,
    downloadable: bool,
) -> CartUnit {
    CartUnit::Package(PackageUnit {
        package_id: Uuid::new_v4(),
        name: "Graduation bundle".to_string(),
        price: dec!(120.00),
        is_downloadable: downloadable,
        items: album_ids
            .iter()
            .enumerate()
            .map(|(i, album_id)| PackageItem {
                institution_id: seeded.institution_id,
                academic_year_id: seeded.academic_year_id,
                course_id: seeded.course_id,
                album_id: *album_id,
                photos: (0..photos_per_album)
                    .map(|p| photo_ref(&format!("album{i}-photo{p}")))
                    .collect(),
                options: Vec::new(),
            })
            .collect(),
    })
}

pub fn photo_ref(name: &str) -> PhotoRef {
    PhotoRef {
        id: Uuid::new_v4(),
        name: name.to_string(),
        url: format!("https://cdn.classpix.io/previews/{name}.jpg"),
        storage_key: format!("originals/{name}.jpg"),
    }
}

/// A complete, valid checkout body for the given cart.
pub fn checkout_body(cart: &[CartUnit], price: &str, shipping_fee: &str) -> Value {
    json!({
        "shipping_address": "12 Jalan Sekolah, 53100 Kuala Lumpur",
        "cart": cart,
        "payment_method": "gateway",
        "shipment_method": "courier",
        "shipping_fee": shipping_fee,
        "price": price,
        "remark": null,
        "cust_name": "Aisyah Rahman",
        "cust_email": "aisyah@example.com",
        "cust_phone": "+60123456789",
        "priority": 0
    })
}
