use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::webhooks::chargily_webhook
    ),
    components(
        schemas(
            crate::api::auth::RegisterRequest,
            crate::api::auth::LoginRequest,
            crate::api::auth::AuthResponse,
            crate::api::webhooks::WebhookEvent,
            crate::api::chargily::Checkout,
            crate::api::chargily::CheckoutMetadata
        )
    ),
    tags(
        (name = "auth", description = "Authentication"),
        (name = "webhooks", description = "Callbacks from Chargily")
    )
)]
pub struct ApiDoc;
