// src/api/admin.rs
//
// Admin-only surface: platform stats, billing overview, role management,
// manual price/rate overrides and the scheduled task triggers.

use actix_web::{get, post, put, web, HttpResponse, Responder};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::metals::{self, Metal};
use crate::subscription;
use crate::{db, AppState};

async fn ensure_admin(state: &AppState, user_id: i32) -> Result<(), HttpResponse> {
    match db::user_role(&state.pool, user_id).await {
        Ok(Some(role)) if role == "admin" => Ok(()),
        Ok(_) => Err(HttpResponse::Forbidden().json(json!({"error": "admin access required"}))),
        Err(e) => {
            log::error!("admin role lookup error: {e}");
            Err(HttpResponse::InternalServerError().finish())
        }
    }
}

#[get("/admin/dashboard")]
pub async fn admin_dashboard(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    if let Err(resp) = ensure_admin(&state, *user_id).await {
        return resp;
    }

    let stats = match db::admin_stats(&state.pool).await {
        Ok(s) => s,
        Err(e) => {
            log::error!("admin stats db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let snapshot = match db::market_snapshot(&state.pool).await {
        Ok(s) => s,
        Err(e) => {
            log::error!("admin snapshot db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(json!({
        "stats": stats,
        "latest_prices": {
            "gold": snapshot.gold.unwrap_or(Decimal::ZERO),
            "silver": snapshot.silver.unwrap_or(Decimal::ZERO),
            "copper": snapshot.copper.unwrap_or(Decimal::ZERO),
        },
        "latest_rates": {
            "usd_dzd": snapshot.usd_dzd.unwrap_or(Decimal::ZERO),
            "eur_dzd": snapshot.eur_dzd.unwrap_or(Decimal::ZERO),
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct BillingQuery {
    pub limit: Option<i64>,
}

#[get("/admin/billing")]
pub async fn billing_index(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    query: web::Query<BillingQuery>,
) -> impl Responder {
    if let Err(resp) = ensure_admin(&state, *user_id).await {
        return resp;
    }

    let limit = query.limit.unwrap_or(100).clamp(1, 500);

    match db::billing_overview(&state.pool, limit).await {
        Ok(payments) => HttpResponse::Ok().json(payments),
        Err(e) => {
            log::error!("admin billing db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: String,
}

#[put("/admin/users/{id}")]
pub async fn update_user_role(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<i32>,
    payload: web::Json<UpdateUserRequest>,
) -> impl Responder {
    if let Err(resp) = ensure_admin(&state, *user_id).await {
        return resp;
    }

    if !matches!(payload.role.as_str(), "admin" | "user") {
        return HttpResponse::BadRequest().json(json!({"error": "invalid role"}));
    }

    match db::set_user_role(&state.pool, path.into_inner(), &payload.role).await {
        Ok(0) => HttpResponse::NotFound().json(json!({"error": "user not found"})),
        Ok(_) => HttpResponse::Ok().json(json!({"message": "User updated"})),
        Err(e) => {
            log::error!("admin user update db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Manual spot price override; stored as a regular observation.
#[derive(Debug, Deserialize)]
pub struct StoreMetalRequest {
    pub metal: String,
    pub price: Decimal,
    pub currency: String,
    pub unit: String,
}

#[post("/admin/prices/metal")]
pub async fn store_metal_price(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    payload: web::Json<StoreMetalRequest>,
) -> impl Responder {
    if let Err(resp) = ensure_admin(&state, *user_id).await {
        return resp;
    }

    let Some(metal) = Metal::parse(&payload.metal) else {
        return HttpResponse::BadRequest().json(json!({"error": "metal must be gold, silver or copper"}));
    };

    if payload.price < Decimal::ZERO
        || payload.currency.is_empty()
        || payload.currency.len() > 10
        || payload.unit.is_empty()
        || payload.unit.len() > 20
    {
        return HttpResponse::BadRequest().json(json!({"error": "invalid price data"}));
    }

    match db::insert_metal_price(
        &state.pool,
        metal.as_str(),
        payload.price,
        &payload.currency,
        &payload.unit,
    )
    .await
    {
        Ok(()) => HttpResponse::Ok().json(json!({"message": "Custom metal price stored"})),
        Err(e) => {
            log::error!("admin metal price insert error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Manual currency rate override; appended like any other observation.
#[derive(Debug, Deserialize)]
pub struct StoreCurrencyRequest {
    pub pair: String,
    pub rate: Decimal,
}

#[post("/admin/prices/currency")]
pub async fn store_currency_rate(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    payload: web::Json<StoreCurrencyRequest>,
) -> impl Responder {
    if let Err(resp) = ensure_admin(&state, *user_id).await {
        return resp;
    }

    if payload.pair.is_empty() || payload.pair.len() > 15 || payload.rate < Decimal::ZERO {
        return HttpResponse::BadRequest().json(json!({"error": "invalid rate data"}));
    }

    match db::insert_currency_rate(&state.pool, &payload.pair, payload.rate).await {
        Ok(()) => HttpResponse::Ok().json(json!({"message": "Custom currency rate stored"})),
        Err(e) => {
            log::error!("admin currency rate insert error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Scheduled trigger: refresh spot prices and rates. Idempotent, safe at any
/// interval; typically driven hourly by cron.
#[post("/admin/tasks/refresh-prices")]
pub async fn refresh_prices_task(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    if let Err(resp) = ensure_admin(&state, *user_id).await {
        return resp;
    }

    match metals::refresh_prices(&state.metals, state.rates.as_ref(), &state.pool).await {
        Ok(updated) => HttpResponse::Ok().json(json!({
            "message": "Prices updated",
            "metals_updated": updated,
        })),
        Err(e) => {
            log::error!("price refresh failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Scheduled trigger: expire overdue subscriptions. Idempotent; typically
/// driven daily by cron.
#[post("/admin/tasks/expire-subscriptions")]
pub async fn expire_subscriptions_task(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    if let Err(resp) = ensure_admin(&state, *user_id).await {
        return resp;
    }

    match subscription::expire_subscriptions(&state.pool).await {
        Ok(expired) => HttpResponse::Ok().json(json!({
            "message": "Expired subscriptions checked",
            "expired": expired,
        })),
        Err(e) => {
            log::error!("expiration sweep failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
