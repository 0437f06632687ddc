// src/api/webhooks.rs

use actix_web::{post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::chargily::Checkout;
use crate::subscription;
use crate::{db, AppState};

/// Chargily webhook envelope. Only `checkout.paid` events carrying a paid
/// checkout trigger activation; everything else is acknowledged and dropped.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Checkout,
}

#[utoipa::path(
    post,
    path = "/chargily/webhook",
    tag = "webhooks",
    request_body = WebhookEvent,
    responses(
        (status = 200, description = "Webhook handled"),
        (status = 400, description = "Invalid signature"),
        (status = 500, description = "Storage error, gateway should redeliver")
    )
)]
#[post("/chargily/webhook")]
pub async fn chargily_webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let signature = req
        .headers()
        .get("signature")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !state.chargily.verify_signature(&body, signature) {
        log::warn!("chargily webhook signature verification failed");
        return HttpResponse::BadRequest().json(json!({"message": "Invalid signature"}));
    }

    // Once the signature checks out the event is always acknowledged, even
    // when malformed or a duplicate, so the gateway stops redelivering.
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("chargily webhook payload rejected: {e}");
            return HttpResponse::Ok().json(json!({"message": "Webhook handled"}));
        }
    };

    log::info!("chargily webhook received type={}", event.event_type);

    if event.event_type == "checkout.paid" {
        if !event.data.is_paid() {
            log::warn!(
                "chargily webhook ignored: checkout status not paid ({:?})",
                event.data.status
            );
            return HttpResponse::Ok().json(json!({"message": "Webhook handled"}));
        }

        let user_id = event
            .data
            .metadata
            .user_id
            .and_then(|id| i32::try_from(id).ok());

        let Some(user_id) = user_id else {
            log::warn!("chargily webhook ignored: no resolvable user id");
            return HttpResponse::Ok().json(json!({"message": "Webhook handled"}));
        };

        let known = match db::user_exists(&state.pool, user_id).await {
            Ok(known) => known,
            Err(e) => {
                log::error!("chargily webhook user lookup error: {e}");
                return HttpResponse::InternalServerError().finish();
            }
        };

        if !known {
            log::warn!("chargily webhook ignored: unknown user_id={user_id}");
            return HttpResponse::Ok().json(json!({"message": "Webhook handled"}));
        }

        if let Err(e) = subscription::activate_subscription(&state.pool, user_id, &event.data).await
        {
            log::error!("chargily webhook activation error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    }

    HttpResponse::Ok().json(json!({"message": "Webhook handled"}))
}
