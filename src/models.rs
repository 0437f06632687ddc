// src/models.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// One spot price observation. Rows are never mutated; the latest row per
/// metal is the current value.
#[derive(Debug, Serialize, FromRow)]
pub struct MetalPrice {
    pub id: i32,
    pub metal: String,
    pub price: Decimal,
    pub currency: String,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CurrencyRate {
    pub id: i32,
    pub pair: String,
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
}

/// `is_subscribed` is a cache of "has an active, unexpired subscription",
/// written only by subscription activation and the expiration sweep.
#[derive(Debug, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: Option<String>,
    pub email: String,
    pub role: String,
    pub is_subscribed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Subscription {
    pub id: i32,
    pub user_id: i32,
    pub plan_name: String,
    pub status: String, // active | expired | cancelled
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Payment {
    pub id: i32,
    pub user_id: i32,
    pub subscription_id: i32,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub payment_method: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

/// Admin billing view: payment joined with the payer's email.
#[derive(Debug, Serialize, FromRow)]
pub struct BillingEntry {
    pub id: i32,
    pub user_id: i32,
    pub email: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub payment_method: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AdminStats {
    pub total_users: i64,
    pub subscribed_users: i64,
    pub total_revenue: Decimal,
    pub active_subscriptions: i64,
}
