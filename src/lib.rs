pub mod api;
pub mod db;
pub mod docs;
pub mod metals;
pub mod models;
pub mod pricing;
pub mod subscription;

use std::sync::Arc;

use sqlx::PgPool;

use crate::api::chargily::ChargilyClient;
use crate::metals::{MetalsClient, RateSource};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub chargily: ChargilyClient,
    pub metals: MetalsClient,
    pub rates: Arc<dyn RateSource>,
}
