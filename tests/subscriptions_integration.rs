use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use goldery_api::api::chargily::{Checkout, CheckoutMetadata};
use goldery_api::subscription::{
    activate_subscription, expire_subscriptions, ActivationOutcome,
};

mod support;

fn paid_checkout(transaction_id: &str, user_id: i32) -> Checkout {
    Checkout {
        id: Some(transaction_id.to_string()),
        status: Some("paid".to_string()),
        amount: Some(dec!(2500.00)),
        currency: Some("dzd".to_string()),
        metadata: CheckoutMetadata {
            user_id: Some(user_id as i64),
            plan_name: Some("Professional".to_string()),
        },
    }
}

async fn payment_count(pool: &PgPool, transaction_id: &str) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_one(pool)
        .await
        .expect("count payments")
        .get("n")
}

async fn is_subscribed(pool: &PgPool, user_id: i32) -> bool {
    sqlx::query("SELECT is_subscribed FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("select user")
        .get("is_subscribed")
}

async fn insert_active_subscription(
    pool: &PgPool,
    user_id: i32,
    ends_in: Duration,
) -> i32 {
    let now = Utc::now();
    sqlx::query(
        r#"INSERT INTO subscriptions (user_id, plan_name, status, starts_at, ends_at)
           VALUES ($1, 'Professional', 'active', $2, $3)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(now - Duration::days(30))
    .bind(now + ends_in)
    .fetch_one(pool)
    .await
    .expect("insert subscription")
    .get("id")
}

#[actix_web::test]
async fn duplicate_activation_is_a_noop() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    let transaction_id = format!("checkout_{}", Uuid::new_v4());
    let checkout = paid_checkout(&transaction_id, user_id);

    let first = activate_subscription(pool, user_id, &checkout)
        .await
        .expect("first activation");
    assert!(matches!(first, ActivationOutcome::Activated { .. }));

    let second = activate_subscription(pool, user_id, &checkout)
        .await
        .expect("second activation");
    assert_eq!(second, ActivationOutcome::AlreadyProcessed);

    assert_eq!(payment_count(pool, &transaction_id).await, 1);

    let subscriptions: i64 =
        sqlx::query("SELECT COUNT(*) AS n FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .expect("count subscriptions")
            .get("n");
    assert_eq!(subscriptions, 1);

    assert!(is_subscribed(pool, user_id).await);
}

#[actix_web::test]
async fn concurrent_activations_create_one_payment() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    let transaction_id = format!("checkout_{}", Uuid::new_v4());
    let checkout = paid_checkout(&transaction_id, user_id);

    // Webhook delivery and the success-redirect poll racing each other.
    let (first, second) = tokio::join!(
        activate_subscription(pool, user_id, &checkout),
        activate_subscription(pool, user_id, &checkout),
    );

    first.expect("first call");
    second.expect("second call");

    assert_eq!(payment_count(pool, &transaction_id).await, 1);
}

#[actix_web::test]
async fn checkout_without_transaction_id_is_rejected() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    let checkout = Checkout {
        id: None,
        status: Some("paid".to_string()),
        amount: None,
        currency: None,
        metadata: CheckoutMetadata::default(),
    };

    let outcome = activate_subscription(pool, user_id, &checkout)
        .await
        .expect("activation call");
    assert_eq!(outcome, ActivationOutcome::Rejected);

    let subscriptions: i64 =
        sqlx::query("SELECT COUNT(*) AS n FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .expect("count subscriptions")
            .get("n");
    assert_eq!(subscriptions, 0);
    assert!(!is_subscribed(pool, user_id).await);
}

#[actix_web::test]
async fn sweep_expires_overdue_subscription_and_demotes_user() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    let subscription_id =
        insert_active_subscription(pool, user_id, Duration::days(-1)).await;
    sqlx::query("UPDATE users SET is_subscribed = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("promote user");

    let expired = expire_subscriptions(pool).await.expect("first sweep");
    assert_eq!(expired, 1);

    let status: String = sqlx::query("SELECT status FROM subscriptions WHERE id = $1")
        .bind(subscription_id)
        .fetch_one(pool)
        .await
        .expect("select subscription")
        .get("status");
    assert_eq!(status, "expired");
    assert!(!is_subscribed(pool, user_id).await);

    // Re-running with nothing new to expire is a no-op.
    let expired_again = expire_subscriptions(pool).await.expect("second sweep");
    assert_eq!(expired_again, 0);
}

#[actix_web::test]
async fn sweep_keeps_user_with_another_active_subscription() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;
    let user_id = support::create_user(pool).await;

    insert_active_subscription(pool, user_id, Duration::days(-1)).await;
    insert_active_subscription(pool, user_id, Duration::days(20)).await;
    sqlx::query("UPDATE users SET is_subscribed = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("promote user");

    let expired = expire_subscriptions(pool).await.expect("sweep");
    assert_eq!(expired, 1);

    // The unexpired subscription still covers the user.
    assert!(is_subscribed(pool, user_id).await);

    let active: i64 = sqlx::query(
        "SELECT COUNT(*) AS n FROM subscriptions WHERE user_id = $1 AND status = 'active'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("count active")
    .get("n");
    assert_eq!(active, 1);
}
