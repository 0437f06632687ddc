// src/subscription.rs
//
// Subscription lifecycle: activation from gateway checkout data, idempotent
// by transaction id, and the periodic expiration sweep.

use chrono::{Months, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::api::chargily::Checkout;

pub const DEFAULT_PLAN_NAME: &str = "Professional";

#[derive(Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Subscription and payment pair created, user promoted.
    Activated { subscription_id: i32 },
    /// This transaction id was already processed; nothing changed.
    AlreadyProcessed,
    /// The checkout carried no transaction id; nothing changed.
    Rejected,
}

/// Activates a subscription+payment pair from gateway checkout data.
///
/// Safe to call concurrently from the webhook and the success-redirect poll
/// for the same transaction: the unique constraint on
/// `payments.transaction_id` resolves the check-then-act race, and the loser
/// reports `AlreadyProcessed` instead of an error.
pub async fn activate_subscription(
    pool: &PgPool,
    user_id: i32,
    checkout: &Checkout,
) -> Result<ActivationOutcome, sqlx::Error> {
    let Some(transaction_id) = checkout.id.as_deref() else {
        log::error!("subscription activation rejected: transaction id missing");
        return Ok(ActivationOutcome::Rejected);
    };

    // Fast path for redeliveries; the unique constraint below is the real
    // guard.
    let existing = sqlx::query("SELECT id FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        log::info!("subscription already activated transaction_id={transaction_id}");
        return Ok(ActivationOutcome::AlreadyProcessed);
    }

    let plan_name = checkout
        .metadata
        .plan_name
        .as_deref()
        .unwrap_or(DEFAULT_PLAN_NAME);
    let amount = checkout.amount.unwrap_or(Decimal::ZERO);
    let currency = checkout.currency.as_deref().unwrap_or("DZD");

    let now = Utc::now();
    let ends_at = now + Months::new(1);

    let mut tx = pool.begin().await?;

    let subscription_id: i32 = sqlx::query(
        r#"INSERT INTO subscriptions (user_id, plan_name, status, starts_at, ends_at)
           VALUES ($1, $2, 'active', $3, $4)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(plan_name)
    .bind(now)
    .bind(ends_at)
    .fetch_one(&mut *tx)
    .await?
    .get("id");

    let inserted = sqlx::query(
        r#"INSERT INTO payments
               (user_id, subscription_id, amount, currency, status, payment_method, transaction_id)
           VALUES ($1, $2, $3, $4, 'succeeded', 'chargily', $5)
           ON CONFLICT (transaction_id) DO NOTHING"#,
    )
    .bind(user_id)
    .bind(subscription_id)
    .bind(amount)
    .bind(currency)
    .bind(transaction_id)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        // A concurrent activation won the race; drop our half-built pair.
        tx.rollback().await?;
        log::info!("subscription already activated transaction_id={transaction_id} (concurrent)");
        return Ok(ActivationOutcome::AlreadyProcessed);
    }

    sqlx::query("UPDATE users SET is_subscribed = TRUE WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!(
        "subscription activated user_id={user_id} transaction_id={transaction_id} plan={plan_name}"
    );

    Ok(ActivationOutcome::Activated { subscription_id })
}

/// Expires every active subscription whose term has passed, then demotes
/// users left without an active, unexpired subscription. Stateless and
/// idempotent; safe to run at any interval.
pub async fn expire_subscriptions(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let expired = sqlx::query(
        r#"UPDATE subscriptions
           SET status = 'expired'
           WHERE status = 'active' AND ends_at < NOW()
           RETURNING user_id"#,
    )
    .fetch_all(&mut *tx)
    .await?;

    let mut user_ids: Vec<i32> = expired.iter().map(|r| r.get("user_id")).collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    if !user_ids.is_empty() {
        sqlx::query(
            r#"UPDATE users
               SET is_subscribed = FALSE
               WHERE id = ANY($1)
                 AND NOT EXISTS (
                     SELECT 1 FROM subscriptions s
                     WHERE s.user_id = users.id
                       AND s.status = 'active'
                       AND s.ends_at > NOW()
                 )"#,
        )
        .bind(&user_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let count = expired.len() as u64;
    log::info!("expired {count} subscription(s)");

    Ok(count)
}
