// src/db.rs

use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::models::{AdminStats, BillingEntry, CurrencyRate, MetalPrice, Payment, Subscription};
use crate::pricing::MarketSnapshot;

pub async fn latest_metal_price(
    pool: &PgPool,
    metal: &str,
) -> Result<Option<MetalPrice>, sqlx::Error> {
    sqlx::query_as::<_, MetalPrice>(
        r#"SELECT id, metal, price, currency, unit, created_at
           FROM metal_prices
           WHERE metal = $1
           ORDER BY created_at DESC, id DESC
           LIMIT 1"#,
    )
    .bind(metal)
    .fetch_optional(pool)
    .await
}

pub async fn latest_currency_rate(
    pool: &PgPool,
    pair: &str,
) -> Result<Option<CurrencyRate>, sqlx::Error> {
    sqlx::query_as::<_, CurrencyRate>(
        r#"SELECT id, pair, rate, created_at
           FROM currency_rates
           WHERE pair = $1
           ORDER BY created_at DESC, id DESC
           LIMIT 1"#,
    )
    .bind(pair)
    .fetch_optional(pool)
    .await
}

pub async fn insert_metal_price(
    pool: &PgPool,
    metal: &str,
    price: Decimal,
    currency: &str,
    unit: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO metal_prices (metal, price, currency, unit)
           VALUES ($1, $2, $3, $4)"#,
    )
    .bind(metal)
    .bind(price)
    .bind(currency)
    .bind(unit)
    .execute(pool)
    .await?;

    Ok(())
}

/// Rates are append-only; "current" is the latest row per pair.
pub async fn insert_currency_rate(
    pool: &PgPool,
    pair: &str,
    rate: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO currency_rates (pair, rate) VALUES ($1, $2)")
        .bind(pair)
        .bind(rate)
        .execute(pool)
        .await?;

    Ok(())
}

/// Assembles the pricing engine input from the latest observations. Missing
/// rows come back as `None`; the engine substitutes its defaults.
pub async fn market_snapshot(pool: &PgPool) -> Result<MarketSnapshot, sqlx::Error> {
    let gold = latest_metal_price(pool, "gold").await?;
    let silver = latest_metal_price(pool, "silver").await?;
    let copper = latest_metal_price(pool, "copper").await?;
    let usd_dzd = latest_currency_rate(pool, "USD/DZD").await?;
    let eur_dzd = latest_currency_rate(pool, "EUR/DZD").await?;

    Ok(MarketSnapshot {
        gold_observed_at: gold.as_ref().map(|p| p.created_at),
        gold: gold.map(|p| p.price),
        silver: silver.map(|p| p.price),
        copper: copper.map(|p| p.price),
        usd_dzd: usd_dzd.map(|r| r.rate),
        eur_dzd: eur_dzd.map(|r| r.rate),
    })
}

pub async fn metal_price_history(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<MetalPrice>, sqlx::Error> {
    sqlx::query_as::<_, MetalPrice>(
        r#"SELECT id, metal, price, currency, unit, created_at
           FROM metal_prices
           ORDER BY created_at DESC, id DESC
           LIMIT $1"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn user_exists(pool: &PgPool, user_id: i32) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}

pub async fn user_role(pool: &PgPool, user_id: i32) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get("role")))
}

pub async fn set_user_role(pool: &PgPool, user_id: i32, role: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
        .bind(role)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn user_is_subscribed(pool: &PgPool, user_id: i32) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT is_subscribed FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get("is_subscribed")).unwrap_or(false))
}

/// The latest active, unexpired subscription. This is the source of truth
/// that the `users.is_subscribed` cache mirrors.
pub async fn current_subscription(
    pool: &PgPool,
    user_id: i32,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"SELECT id, user_id, plan_name, status, starts_at, ends_at, cancelled_at, created_at
           FROM subscriptions
           WHERE user_id = $1 AND status = 'active' AND ends_at > NOW()
           ORDER BY created_at DESC, id DESC
           LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_subscriptions(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"SELECT id, user_id, plan_name, status, starts_at, ends_at, cancelled_at, created_at
           FROM subscriptions
           WHERE user_id = $1
           ORDER BY created_at DESC, id DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_payments(pool: &PgPool, user_id: i32) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"SELECT id, user_id, subscription_id, amount, currency, status,
                  payment_method, transaction_id, created_at
           FROM payments
           WHERE user_id = $1
           ORDER BY created_at DESC, id DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Platform-wide payment list for the admin billing page.
pub async fn billing_overview(pool: &PgPool, limit: i64) -> Result<Vec<BillingEntry>, sqlx::Error> {
    sqlx::query_as::<_, BillingEntry>(
        r#"SELECT p.id, p.user_id, u.email, p.amount, p.currency, p.status,
                  p.payment_method, p.transaction_id, p.created_at
           FROM payments p
           JOIN users u ON u.id = p.user_id
           ORDER BY p.created_at DESC, p.id DESC
           LIMIT $1"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn admin_stats(pool: &PgPool) -> Result<AdminStats, sqlx::Error> {
    sqlx::query_as::<_, AdminStats>(
        r#"SELECT
               (SELECT COUNT(*) FROM users) AS total_users,
               (SELECT COUNT(*) FROM users WHERE is_subscribed) AS subscribed_users,
               (SELECT COALESCE(SUM(amount), 0) FROM payments
                 WHERE status IN ('succeeded', 'paid')) AS total_revenue,
               (SELECT COUNT(*) FROM subscriptions WHERE status = 'active')
                   AS active_subscriptions"#,
    )
    .fetch_one(pool)
    .await
}
