// src/api/prices.rs

use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::pricing;
use crate::{db, AppState};

/// The retail price board plus the caller's subscription flag.
#[get("/dashboard")]
pub async fn dashboard(state: web::Data<AppState>, user_id: web::ReqData<i32>) -> impl Responder {
    let user_id = *user_id;

    let snapshot = match db::market_snapshot(&state.pool).await {
        Ok(s) => s,
        Err(e) => {
            log::error!("dashboard snapshot error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let is_subscribed = match db::user_is_subscribed(&state.pool, user_id).await {
        Ok(flag) => flag,
        Err(e) => {
            log::error!("dashboard subscription flag error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let board = pricing::build_price_board(&snapshot, Utc::now());

    HttpResponse::Ok().json(json!({
        "data": board,
        "is_subscribed": is_subscribed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[get("/metals/history")]
pub async fn metals_history(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    match db::metal_price_history(&state.pool, limit).await {
        Ok(prices) => HttpResponse::Ok().json(prices),
        Err(e) => {
            log::error!("metals history db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
