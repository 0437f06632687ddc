// src/main.rs
use std::env;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use goldery_api::api::chargily::{ChargilyClient, ChargilyConfig, CHARGILY_TEST_API_BASE};
use goldery_api::metals::{MetalsClient, ParallelMarketSource, DEFAULT_METALS_API_BASE};
use goldery_api::{api, docs, AppState};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let app_base_url =
        env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

    let chargily = ChargilyClient::new(ChargilyConfig {
        base_url: env::var("CHARGILY_API_BASE")
            .unwrap_or_else(|_| CHARGILY_TEST_API_BASE.to_string()),
        secret_key: env::var("CHARGILY_SECRET_KEY").expect("CHARGILY_SECRET_KEY required"),
        success_url: format!("{app_base_url}/api/subscription/success"),
        failure_url: format!("{app_base_url}/api/subscription/failure"),
        timeout: Duration::from_secs(10),
    })
    .expect("chargily http client");

    let metals = MetalsClient::new(
        env::var("METALS_API_BASE").unwrap_or_else(|_| DEFAULT_METALS_API_BASE.to_string()),
        Duration::from_secs(10),
    )
    .expect("metals http client");

    let state = web::Data::new(AppState {
        pool,
        chargily,
        metals,
        rates: Arc::new(ParallelMarketSource),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Public routes
            .service(api::auth::register)
            .service(api::auth::login)
            .service(api::webhooks::chargily_webhook)
            // Authenticated routes
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware)
                    .service(api::prices::dashboard)
                    .service(api::prices::metals_history)
                    .service(api::payments::create_checkout)
                    .service(api::subscriptions::current_subscription)
                    .service(api::subscriptions::subscription_history)
                    .service(api::status::payment_success)
                    .service(api::status::payment_failure)
                    .service(api::admin::admin_dashboard)
                    .service(api::admin::billing_index)
                    .service(api::admin::update_user_role)
                    .service(api::admin::store_metal_price)
                    .service(api::admin::store_currency_rate)
                    .service(api::admin::refresh_prices_task)
                    .service(api::admin::expire_subscriptions_task),
            )
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
