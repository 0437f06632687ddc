// src/api/status.rs
//
// Gateway redirect targets. The success handler re-checks the checkout with
// Chargily and activates as a fallback, because webhook delivery is not
// guaranteed to arrive before the user is redirected back.

use actix_web::{get, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::subscription;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub checkout_id: Option<String>,
}

#[get("/subscription/success")]
pub async fn payment_success(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    query: web::Query<SuccessQuery>,
) -> impl Responder {
    let user_id = *user_id;

    if let Some(checkout_id) = query.checkout_id.as_deref() {
        if let Some(checkout) = state.chargily.get_checkout(checkout_id).await {
            if checkout.is_paid() {
                // Same idempotency guard as the webhook path; a duplicate is
                // a no-op, and a storage error here is invisible to the user
                // because the webhook remains the source of truth.
                if let Err(e) =
                    subscription::activate_subscription(&state.pool, user_id, &checkout).await
                {
                    log::error!("success redirect activation error: {e}");
                }
            }
        }
    }

    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Thank you! Your payment has been processed successfully.",
    }))
}

#[get("/subscription/failure")]
pub async fn payment_failure() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "failure",
        "message": "Payment failed or was cancelled.",
    }))
}
