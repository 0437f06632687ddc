// src/api/payments.rs

use actix_web::{post, web, HttpResponse, Responder};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::json;

use crate::api::chargily::CheckoutMetadata;
use crate::subscription::DEFAULT_PLAN_NAME;
use crate::AppState;

/// Monthly plan catalog, prices in DZD. Policy numbers.
fn plan_price(plan: &str) -> Option<Decimal> {
    match plan {
        "Professional" => Some(dec!(2500.00)),
        "Premium" => Some(dec!(4500.00)),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan: Option<String>,
}

/// Starts a hosted checkout for a subscription plan and returns the payment
/// link. The checkout metadata carries the user id and plan name so the
/// webhook can attribute the payment.
#[post("/subscription/checkout")]
pub async fn create_checkout(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    payload: web::Json<CheckoutRequest>,
) -> impl Responder {
    let user_id = *user_id;
    let plan = payload.plan.as_deref().unwrap_or(DEFAULT_PLAN_NAME);

    let Some(price) = plan_price(plan) else {
        return HttpResponse::BadRequest().json(json!({"error": "invalid plan"}));
    };

    let metadata = CheckoutMetadata {
        user_id: Some(user_id as i64),
        plan_name: Some(plan.to_string()),
    };

    log::info!("creating chargily checkout user_id={user_id} plan={plan}");

    match state
        .chargily
        .create_payment_link(&format!("{plan} plan subscription"), price, &metadata)
        .await
    {
        Some(link) => HttpResponse::Ok().json(json!({
            "checkout_id": link.id,
            "checkout_url": link.url,
        })),
        // The client already logged the cause; the user just gets a retry
        // prompt.
        None => HttpResponse::BadGateway().json(json!({
            "error": "Could not start the payment, please try again."
        })),
    }
}
