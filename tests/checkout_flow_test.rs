mod common;

use axum::http::{Method, StatusCode};
use common::{checkout_body, product_unit, TestApp, TEST_CALLER_IP};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};

use classpix_api::{
    entities::{order, order_cart, payment, user::UserRole},
    services::payments::{sign_request, SignatureInput},
};

#[tokio::test]
async fn checkout_creates_order_cart_rows_and_payment() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app.create_user("Aisyah", "aisyah@example.com", UserRole::Parent).await;
    let cookie = app.cookie_for(&parent);

    let cart = vec![product_unit(&seeded, true)];
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/checkout",
            Some(&cookie),
            Some(checkout_body(&cart, "20.00", "5.00")),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    let data = &body["data"];
    let order_no = data["order_no"].as_str().expect("order_no present");
    let payment_id = data["payment_id"].as_str().expect("payment_id present");

    // The payment id embeds the generated order number.
    assert!(payment_id.starts_with(&format!("{order_no}_")));

    // Exactly one payment row, tied to the order and still pending.
    let payments = payment::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].payment_id, payment_id);
    assert_eq!(payments[0].amount, dec!(25.00));

    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_no, order_no);
    assert_eq!(orders[0].status, classpix_api::entities::order::OrderStatus::Pending);
    assert_eq!(payments[0].order_id, orders[0].id);

    // One flattened cart row per unit.
    let cart_rows = order_cart::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(cart_rows.len(), 1);
    assert_eq!(cart_rows[0].order_id, orders[0].id);
    assert!(cart_rows[0].grants_download);
}

#[tokio::test]
async fn gateway_payload_uses_wire_format_and_reproducible_signature() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app.create_user("Aisyah", "aisyah@example.com", UserRole::Parent).await;
    let cookie = app.cookie_for(&parent);

    let cart = vec![product_unit(&seeded, false)];
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/checkout",
            Some(&cookie),
            Some(checkout_body(&cart, "15.00", "7.25")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let fields = &body["data"]["gateway"]["fields"];
    assert_eq!(fields["Amount"], "22.25");
    assert_eq!(fields["CurrencyCode"], "MYR");
    assert_eq!(fields["CustEmail"], "aisyah@example.com");

    // The signature must be reproducible from the shared secret and the same
    // field ordering the gateway uses.
    let gateway = &app.state.config.gateway;
    let expected = sign_request(&SignatureInput {
        merchant_password: &gateway.merchant_password,
        service_id: &gateway.service_id,
        payment_id: fields["PaymentID"].as_str().unwrap(),
        return_url: &gateway.return_url,
        callback_url: &gateway.callback_url,
        amount: dec!(22.25),
        currency_code: &gateway.currency_code,
        caller_ip: TEST_CALLER_IP,
    });
    assert_eq!(fields["Signature"], expected.as_str());
}

#[tokio::test]
async fn disabled_album_fails_with_no_rows_written() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app.create_user("Aisyah", "aisyah@example.com", UserRole::Parent).await;
    let cookie = app.cookie_for(&parent);

    app.state
        .services
        .catalog
        .set_album_enabled(seeded.album_id, false)
        .await
        .unwrap();

    let cart = vec![product_unit(&seeded, true)];
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/checkout",
            Some(&cookie),
            Some(checkout_body(&cart, "20.00", "5.00")),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Album");

    // Transactional atomicity: nothing persisted.
    let db = &*app.state.db;
    assert_eq!(order::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(order_cart::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(payment::Entity::find().count(db).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_course_reference_is_rejected() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app.create_user("Aisyah", "aisyah@example.com", UserRole::Parent).await;
    let cookie = app.cookie_for(&parent);

    let mut seeded_bad = seeded.clone();
    seeded_bad.course_id = uuid::Uuid::new_v4();
    let cart = vec![product_unit(&seeded_bad, true)];

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/checkout",
            Some(&cookie),
            Some(checkout_body(&cart, "20.00", "5.00")),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Course");
    assert_eq!(order::Entity::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_required_field_fails_before_any_write() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app.create_user("Aisyah", "aisyah@example.com", UserRole::Parent).await;
    let cookie = app.cookie_for(&parent);

    let cart = vec![product_unit(&seeded, true)];
    let mut body = checkout_body(&cart, "20.00", "5.00");
    body.as_object_mut().unwrap().remove("cust_phone");

    let (status, _) = app
        .request_json(Method::POST, "/api/v1/checkout", Some(&cookie), Some(body))
        .await;

    assert!(status.is_client_error());
    assert_eq!(order::Entity::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let app = TestApp::new().await;
    app.seed_catalog().await;
    let parent = app.create_user("Aisyah", "aisyah@example.com", UserRole::Parent).await;
    let cookie = app.cookie_for(&parent);

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/v1/checkout",
            Some(&cookie),
            Some(checkout_body(&[], "0.00", "0.00")),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
}

#[tokio::test]
async fn checkout_requires_a_session() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let cart = vec![product_unit(&seeded, true)];

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/v1/checkout",
            None,
            Some(checkout_body(&cart, "20.00", "5.00")),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn order_numbers_are_sequential() {
    let app = TestApp::new().await;
    let seeded = app.seed_catalog().await;
    let parent = app.create_user("Aisyah", "aisyah@example.com", UserRole::Parent).await;
    let cookie = app.cookie_for(&parent);

    let mut numbers = Vec::new();
    for _ in 0..2 {
        let cart = vec![product_unit(&seeded, true)];
        let (status, body) = app
            .request_json(
                Method::POST,
                "/api/v1/checkout",
                Some(&cookie),
                Some(checkout_body(&cart, "20.00", "5.00")),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        numbers.push(body["data"]["order_no"].as_str().unwrap().to_string());
    }

    assert_eq!(numbers[0], "00000001");
    assert_eq!(numbers[1], "00000002");
}
