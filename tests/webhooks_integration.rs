use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use sqlx::Row;
use uuid::Uuid;

use goldery_api::api::webhooks::chargily_webhook;

mod support;

const WEBHOOK_SECRET: &str = "test_sk_webhook";

fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn paid_event(transaction_id: &str, user_id: i32) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "type": "checkout.paid",
        "data": {
            "id": transaction_id,
            "status": "paid",
            "amount": 2500.00,
            "currency": "dzd",
            "metadata": {
                "user_id": user_id,
                "plan_name": "Professional"
            }
        }
    }))
    .expect("serialize event")
}

async fn payment_count(pool: &sqlx::PgPool, transaction_id: &str) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_one(pool)
        .await
        .expect("count payments")
        .get("n")
}

#[actix_web::test]
async fn paid_checkout_webhook_activates_subscription() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    let state = web::Data::new(support::build_state(pool.clone(), WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state.clone()).service(chargily_webhook)).await;

    let transaction_id = format!("checkout_{}", Uuid::new_v4());
    let body = paid_event(&transaction_id, user_id);

    let req = TestRequest::post()
        .uri("/chargily/webhook")
        .insert_header(("signature", sign(WEBHOOK_SECRET, &body)))
        .insert_header(("content-type", "application/json"))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    assert_eq!(payment_count(pool, &transaction_id).await, 1);

    let sub_row = sqlx::query(
        r#"SELECT s.status, s.plan_name
           FROM subscriptions s
           JOIN payments p ON p.subscription_id = s.id
           WHERE p.transaction_id = $1"#,
    )
    .bind(&transaction_id)
    .fetch_one(pool)
    .await
    .expect("select subscription");
    assert_eq!(sub_row.get::<String, _>("status"), "active");
    assert_eq!(sub_row.get::<String, _>("plan_name"), "Professional");

    let is_subscribed: bool = sqlx::query("SELECT is_subscribed FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("select user")
        .get("is_subscribed");
    assert!(is_subscribed);
}

#[actix_web::test]
async fn invalid_signature_is_rejected_without_writes() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    let state = web::Data::new(support::build_state(pool.clone(), WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state.clone()).service(chargily_webhook)).await;

    let transaction_id = format!("checkout_{}", Uuid::new_v4());
    let body = paid_event(&transaction_id, user_id);

    let req = TestRequest::post()
        .uri("/chargily/webhook")
        .insert_header(("signature", sign("wrong_secret", &body)))
        .insert_header(("content-type", "application/json"))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    assert_eq!(payment_count(pool, &transaction_id).await, 0);

    let subscriptions: i64 = sqlx::query("SELECT COUNT(*) AS n FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("count subscriptions")
        .get("n");
    assert_eq!(subscriptions, 0);
}

#[actix_web::test]
async fn redelivered_webhook_is_acknowledged_once_processed() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    let state = web::Data::new(support::build_state(pool.clone(), WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state.clone()).service(chargily_webhook)).await;

    let transaction_id = format!("checkout_{}", Uuid::new_v4());
    let body = paid_event(&transaction_id, user_id);
    let signature = sign(WEBHOOK_SECRET, &body);

    for _ in 0..2 {
        let req = TestRequest::post()
            .uri("/chargily/webhook")
            .insert_header(("signature", signature.clone()))
            .insert_header(("content-type", "application/json"))
            .set_payload(body.clone())
            .to_request();

        // Both deliveries are acknowledged so the gateway stops retrying.
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    assert_eq!(payment_count(pool, &transaction_id).await, 1);
}

#[actix_web::test]
async fn unpaid_checkout_event_is_ignored() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    let state = web::Data::new(support::build_state(pool.clone(), WEBHOOK_SECRET));
    let app = test::init_service(App::new().app_data(state.clone()).service(chargily_webhook)).await;

    let transaction_id = format!("checkout_{}", Uuid::new_v4());
    let body = serde_json::to_vec(&json!({
        "type": "checkout.paid",
        "data": {
            "id": transaction_id,
            "status": "pending",
            "metadata": { "user_id": user_id }
        }
    }))
    .expect("serialize event");

    let req = TestRequest::post()
        .uri("/chargily/webhook")
        .insert_header(("signature", sign(WEBHOOK_SECRET, &body)))
        .insert_header(("content-type", "application/json"))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    assert_eq!(payment_count(pool, &transaction_id).await, 0);
}
