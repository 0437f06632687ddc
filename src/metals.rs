// src/metals.rs
//
// Market data fetcher: spot prices come from the gold-api.com price API,
// currency pair rates from a pluggable RateSource.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use crate::db;
use crate::pricing::{DEFAULT_EUR_DZD, DEFAULT_USD_DZD};

pub const DEFAULT_METALS_API_BASE: &str = "https://api.gold-api.com";

/// Currency pairs tracked by the fetcher.
pub const RATE_PAIRS: [&str; 2] = ["USD/DZD", "EUR/DZD"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metal {
    Gold,
    Silver,
    Copper,
}

impl Metal {
    pub const ALL: [Metal; 3] = [Metal::Gold, Metal::Silver, Metal::Copper];

    pub fn as_str(self) -> &'static str {
        match self {
            Metal::Gold => "gold",
            Metal::Silver => "silver",
            Metal::Copper => "copper",
        }
    }

    /// Symbol used by the external price API.
    pub fn symbol(self) -> &'static str {
        match self {
            Metal::Gold => "XAU",
            Metal::Silver => "XAG",
            Metal::Copper => "XCU",
        }
    }

    /// Quote unit: troy ounce for precious metals, pound for copper.
    pub fn unit(self) -> &'static str {
        match self {
            Metal::Gold | Metal::Silver => "ounce",
            Metal::Copper => "pound",
        }
    }

    pub fn parse(s: &str) -> Option<Metal> {
        match s {
            "gold" => Some(Metal::Gold),
            "silver" => Some(Metal::Silver),
            "copper" => Some(Metal::Copper),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum FetchError {
    Http(reqwest::Error),
    Api { status: u16 },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "http error: {e}"),
            FetchError::Api { status } => write!(f, "price api error status={status}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Decimal,
}

#[derive(Clone)]
pub struct MetalsClient {
    http: HttpClient,
    base_url: String,
}

impl MetalsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: HttpClient::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
        })
    }

    async fn spot_price(&self, metal: Metal) -> Result<Decimal, FetchError> {
        let resp = self
            .http
            .get(format!("{}/price/{}", self.base_url, metal.symbol()))
            .send()
            .await
            .map_err(FetchError::Http)?;

        if !resp.status().is_success() {
            return Err(FetchError::Api {
                status: resp.status().as_u16(),
            });
        }

        let body: PriceResponse = resp.json().await.map_err(FetchError::Http)?;
        Ok(body.price)
    }
}

/// Source of currency pair rates. No live feed is integrated yet; a real
/// integration implements this trait and replaces `ParallelMarketSource`
/// without touching any caller.
pub trait RateSource: Send + Sync {
    fn next_rate(&self, pair: &str, last: Option<Decimal>) -> Decimal;
}

/// Placeholder parallel-market quote: wanders around the last known value
/// within +/- 1.00 DZD. Not real market data.
pub struct ParallelMarketSource;

fn default_rate(pair: &str) -> Decimal {
    match pair {
        "EUR/DZD" => DEFAULT_EUR_DZD,
        _ => DEFAULT_USD_DZD,
    }
}

impl RateSource for ParallelMarketSource {
    fn next_rate(&self, pair: &str, last: Option<Decimal>) -> Decimal {
        let centimes: i64 = rand::thread_rng().gen_range(-100..=100);
        last.unwrap_or_else(|| default_rate(pair)) + Decimal::new(centimes, 2)
    }
}

/// Refreshes spot prices and currency rates. A failed fetch for one metal is
/// logged and does not stop the others; storage errors bubble up so the next
/// scheduled run retries. Returns how many metals were updated.
pub async fn refresh_prices(
    client: &MetalsClient,
    rates: &dyn RateSource,
    pool: &PgPool,
) -> Result<u32, sqlx::Error> {
    let mut updated = 0;

    for metal in Metal::ALL {
        match client.spot_price(metal).await {
            Ok(price) => {
                db::insert_metal_price(pool, metal.as_str(), price, "USD", metal.unit()).await?;
                updated += 1;
            }
            Err(e) => {
                log::error!("failed to fetch {} price: {e}", metal.as_str());
            }
        }
    }

    for pair in RATE_PAIRS {
        let last = db::latest_currency_rate(pool, pair).await?.map(|r| r.rate);
        db::insert_currency_rate(pool, pair, rates.next_rate(pair, last)).await?;
    }

    Ok(updated)
}
