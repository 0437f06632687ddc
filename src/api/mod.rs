pub mod admin;
pub mod auth;
pub mod chargily;
pub mod payments;
pub mod prices;
pub mod status;
pub mod subscriptions;
pub mod webhooks;
