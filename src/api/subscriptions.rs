// src/api/subscriptions.rs

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::{db, AppState};

/// The caller's current subscription, if any active one exists.
#[get("/subscription")]
pub async fn current_subscription(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    match db::current_subscription(&state.pool, *user_id).await {
        Ok(subscription) => HttpResponse::Ok().json(json!({
            "current_subscription": subscription,
        })),
        Err(e) => {
            log::error!("current subscription db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/subscription/history")]
pub async fn subscription_history(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    let user_id = *user_id;

    let subscriptions = match db::list_subscriptions(&state.pool, user_id).await {
        Ok(s) => s,
        Err(e) => {
            log::error!("subscription history db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let payments = match db::list_payments(&state.pool, user_id).await {
        Ok(p) => p,
        Err(e) => {
            log::error!("payment history db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(json!({
        "subscriptions": subscriptions,
        "payments": payments,
    }))
}
