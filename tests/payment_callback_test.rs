mod common;

use axum::http::{Method, StatusCode};
use common::{checkout_body, package_unit, product_unit, TestApp};
use sea_orm::EntityTrait;
use serde_json::Value;
use uuid::Uuid;

use classpix_api::{
    entities::{
        order::{self, OrderStatus},
        payment::{self, PaymentStatus},
        user::{self, UserRole},
    },
    models::cart::{CartUnit, Entitlement},
};

const CALLBACK_URI: &str = "/api/v1/payments/gateway/callback";

/// Runs a checkout and returns (order_no, payment_id, parent).
async fn checkout(
    app: &TestApp,
    cart: Vec<CartUnit>,
    price: &str,
) -> (String, String, user::Model) {
    let parent = app
        .create_user("Aisyah", "aisyah@example.com", UserRole::Parent)
        .await;
    let cookie = app.cookie_for(&parent);
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/checkout",
            Some(&cookie),
            Some(checkout_body(&cart, price, "5.00")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "checkout failed: {body}");
    (
        body["data"]["order_no"].as_str().unwrap().to_string(),
        body["data"]["payment_id"].as_str().unwrap().to_string(),
        parent,
    )
}

async fn downloads_of(app: &TestApp, user_id: Uuid) -> Vec<Entitlement> {
    app.state
        .services
        .users
        .list_downloads(user_id)
        .await
        .unwrap()
}

async fn single_order(app: &TestApp) -> order::Model {
    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    orders.into_iter().next().unwrap()
}

async fn single_payment(app: &TestApp) -> payment::Model {
    let payments = payment::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(payments.len(), 1);
    payments.into_iter().next().unwrap()
}

#[tokio::test]
async fn successful_callback_completes_order_and_grants_package_entitlements() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let album_b = app.seed_album(&seeded, "Sports day").await;
    let album_c = app.seed_album(&seeded, "Graduation").await;

    // Downloadable package: 3 albums of 2 photos each.
    let cart = vec![package_unit(
        &seeded,
        &[seeded.album_id, album_b, album_c],
        2,
        true,
    )];
    let (order_no, payment_id, parent) = checkout(&app, cart, "120.00").await;

    let (status, html) = app
        .post_form(
            CALLBACK_URI,
            &[
                ("OrderNumber", order_no.as_str()),
                ("PaymentID", payment_id.as_str()),
                ("TxnStatus", "0"),
                ("TxnID", "TXN-778899"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("data-status=\"SUCCESS\""));

    let order = single_order(&app).await;
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.transaction_no.as_deref(), Some("TXN-778899"));
    assert_eq!(order.success_payment_id.as_deref(), Some(payment_id.as_str()));

    let payment = single_payment(&app).await;
    assert_eq!(payment.status, PaymentStatus::Succeeded);
    assert_eq!(payment.transaction_no.as_deref(), Some("TXN-778899"));
    assert!(payment.payment_detail.is_some());

    // Exactly 6 new entitlements, each with a signed download URL.
    let downloads = downloads_of(&app, parent.id).await;
    assert_eq!(downloads.len(), 6);
    assert!(downloads
        .iter()
        .all(|e| e.download_url.contains("signature=")));
}

#[tokio::test]
async fn successful_callback_without_downloadable_option_grants_nothing() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let cart = vec![product_unit(&seeded, false)];
    let (order_no, payment_id, parent) = checkout(&app, cart, "20.00").await;

    let (status, html) = app
        .post_form(
            CALLBACK_URI,
            &[
                ("OrderNumber", order_no.as_str()),
                ("PaymentID", payment_id.as_str()),
                ("TxnStatus", "0"),
                ("TxnID", "TXN-1"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("data-status=\"SUCCESS\""));

    // Order still completes; entitlements stay empty.
    assert_eq!(single_order(&app).await.status, OrderStatus::Completed);
    assert!(downloads_of(&app, parent.id).await.is_empty());
}

#[tokio::test]
async fn failed_callback_records_detail_and_leaves_order_untouched() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let cart = vec![product_unit(&seeded, true)];
    let (order_no, payment_id, parent) = checkout(&app, cart, "20.00").await;

    let (status, html) = app
        .post_form(
            CALLBACK_URI,
            &[
                ("OrderNumber", order_no.as_str()),
                ("PaymentID", payment_id.as_str()),
                ("TxnStatus", "1"),
                ("TxnID", "TXN-FAIL"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("data-status=\"FAILED\""));

    let order = single_order(&app).await;
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.transaction_no.is_none());

    let payment = single_payment(&app).await;
    assert_eq!(payment.status, PaymentStatus::Failed);
    let detail = payment.payment_detail.expect("callback body stored");
    assert_eq!(detail["TxnStatus"], "1");
    assert_eq!(detail["TxnID"], "TXN-FAIL");

    assert!(downloads_of(&app, parent.id).await.is_empty());
}

#[tokio::test]
async fn replayed_success_callback_is_idempotent() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let album_b = app.seed_album(&seeded, "Sports day").await;

    let cart = vec![package_unit(&seeded, &[seeded.album_id, album_b], 2, true)];
    let (order_no, payment_id, parent) = checkout(&app, cart, "120.00").await;

    let fields = [
        ("OrderNumber", order_no.as_str()),
        ("PaymentID", payment_id.as_str()),
        ("TxnStatus", "0"),
        ("TxnID", "TXN-REPLAY"),
    ];

    let (first_status, first_html) = app.post_form(CALLBACK_URI, &fields).await;
    assert_eq!(first_status, StatusCode::OK);
    assert!(first_html.contains("data-status=\"SUCCESS\""));
    let after_first = downloads_of(&app, parent.id).await;
    assert_eq!(after_first.len(), 4);

    // The gateway retries: same payment id, same status.
    let (second_status, second_html) = app.post_form(CALLBACK_URI, &fields).await;
    assert_eq!(second_status, StatusCode::OK);
    assert!(second_html.contains("data-status=\"SUCCESS\""));

    // Order stays completed, entitlement list does not grow.
    assert_eq!(single_order(&app).await.status, OrderStatus::Completed);
    let after_second = downloads_of(&app, parent.id).await;
    assert_eq!(after_second.len(), 4);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn unrecognized_status_code_mutates_nothing() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    let cart = vec![product_unit(&seeded, true)];
    let (order_no, payment_id, parent) = checkout(&app, cart, "20.00").await;

    let (status, html) = app
        .post_form(
            CALLBACK_URI,
            &[
                ("OrderNumber", order_no.as_str()),
                ("PaymentID", payment_id.as_str()),
                ("TxnStatus", "7"),
                ("TxnID", "TXN-ODD"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("data-status=\"FAILED\""));

    // Neither payment nor order moved; a later genuine callback still lands.
    assert_eq!(single_payment(&app).await.status, PaymentStatus::Pending);
    assert_eq!(single_order(&app).await.status, OrderStatus::Pending);
    assert!(downloads_of(&app, parent.id).await.is_empty());
}

#[tokio::test]
async fn unknown_payment_id_renders_failed_view_without_writes() {
    let app = TestApp::new().await;
    app.seed_catalog().await;

    let (status, html) = app
        .post_form(
            CALLBACK_URI,
            &[
                ("OrderNumber", "00000001"),
                ("PaymentID", "00000001_2026010112000000"),
                ("TxnStatus", "0"),
                ("TxnID", "TXN-GHOST"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("data-status=\"FAILED\""));
    assert!(html.contains("Order: -"));
}

#[tokio::test]
async fn malformed_callback_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post_form(
            CALLBACK_URI,
            &[("OrderNumber", "00000001"), ("TxnStatus", "0")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn entitlements_deduplicate_against_prior_purchases() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;

    // Two orders for the same parent; the second cart shares one photo with
    // the first via a deterministic photo id.
    let shared = common::photo_ref("shared");
    let mut first_unit = match product_unit(&seeded, true) {
        CartUnit::Product(mut p) => {
            p.photo = shared.clone();
            CartUnit::Product(p)
        }
        _ => unreachable!(),
    };
    let parent = app
        .create_user("Aisyah", "aisyah@example.com", UserRole::Parent)
        .await;
    let cookie = app.cookie_for(&parent);

    for txn_id in ["TXN-A", "TXN-B"] {
        let (status, body) = app
            .request_json(
                Method::POST,
                "/api/v1/checkout",
                Some(&cookie),
                Some(checkout_body(
                    std::slice::from_ref(&first_unit),
                    "20.00",
                    "5.00",
                )),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let payment_id = body["data"]["payment_id"].as_str().unwrap().to_string();
        let order_no = body["data"]["order_no"].as_str().unwrap().to_string();

        let (status, _) = app
            .post_form(
                CALLBACK_URI,
                &[
                    ("OrderNumber", order_no.as_str()),
                    ("PaymentID", payment_id.as_str()),
                    ("TxnStatus", "0"),
                    ("TxnID", txn_id),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        // Keep the same photo in the second order's cart.
        if let CartUnit::Product(p) = &mut first_unit {
            p.photo = shared.clone();
        }
    }

    // Same photo purchased twice: one entitlement.
    let downloads = downloads_of(&app, parent.id).await;
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].photo_id, shared.id);

    let value: Value = serde_json::to_value(&downloads).unwrap();
    assert!(value[0].get("photoId").is_some(), "camelCase contract");
    assert!(value[0].get("downloadUrl").is_some());
}
