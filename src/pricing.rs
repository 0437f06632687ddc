// src/pricing.rs
//
// Turns the latest market observations into the retail price board shown to
// jewelers: per-karat gold prices in DZD for local and italian sourcing,
// plus silver per gram. Pure computation, no I/O.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

/// Grams per troy ounce.
pub const GRAMS_PER_TROY_OUNCE: Decimal = dec!(31.1035);

// Fallbacks when the repository holds no observation yet. The board must
// always render, so absent data substitutes these instead of failing.
pub const DEFAULT_GOLD_USD: Decimal = dec!(2030.50);
pub const DEFAULT_SILVER_USD: Decimal = dec!(23.00);
pub const DEFAULT_COPPER_USD: Decimal = dec!(3.80);
pub const DEFAULT_USD_DZD: Decimal = dec!(220.00);
pub const DEFAULT_EUR_DZD: Decimal = dec!(242.00);

/// Karat tiers on the board, highest purity first.
pub const KARATS: [u32; 4] = [24, 21, 19, 18];

/// Latest observations pulled from the price repository. `None` means the
/// repository has no row for that key.
#[derive(Debug, Default)]
pub struct MarketSnapshot {
    pub gold: Option<Decimal>,
    pub silver: Option<Decimal>,
    pub copper: Option<Decimal>,
    pub usd_dzd: Option<Decimal>,
    pub eur_dzd: Option<Decimal>,
    pub gold_observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SpotPrices {
    pub gold: Decimal,
    pub silver: Decimal,
    pub copper: Decimal,
    pub last_updated: String,
}

#[derive(Debug, Serialize)]
pub struct ExchangeRates {
    pub usd_dzd: Decimal,
    pub eur_dzd: Decimal,
}

#[derive(Debug, Serialize)]
pub struct GoldTier {
    pub karat: u32,
    pub raw: Decimal,
    pub local: Decimal,
    pub italian: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SilverPrice {
    pub gram: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PriceBoard {
    pub spot: SpotPrices,
    pub rates: ExchangeRates,
    pub gold_dzd: Vec<GoldTier>,
    pub silver_dzd: SilverPrice,
}

/// Rounds a DZD amount to 2 decimals, half-up.
pub fn round_dzd(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Fixed making charge (labor) per gram: (local, italian). Policy numbers,
/// not derived from market data. Italian charges are >= local at every tier.
fn making_charges(karat: u32) -> (Decimal, Decimal) {
    match karat {
        24 => (dec!(0), dec!(1000)),
        21 => (dec!(300), dec!(900)),
        19 => (dec!(250), dec!(850)),
        _ => (dec!(200), dec!(800)),
    }
}

/// Builds the retail price board from a snapshot. Deterministic for a fixed
/// `now`; rounding happens only at the output positions.
pub fn build_price_board(snapshot: &MarketSnapshot, now: DateTime<Utc>) -> PriceBoard {
    let gold = snapshot.gold.unwrap_or(DEFAULT_GOLD_USD);
    let silver = snapshot.silver.unwrap_or(DEFAULT_SILVER_USD);
    let copper = snapshot.copper.unwrap_or(DEFAULT_COPPER_USD);
    let usd_dzd = snapshot.usd_dzd.unwrap_or(DEFAULT_USD_DZD);
    let eur_dzd = snapshot.eur_dzd.unwrap_or(DEFAULT_EUR_DZD);

    let price_per_gram_24k = gold / GRAMS_PER_TROY_OUNCE * usd_dzd;

    let gold_dzd = KARATS
        .iter()
        .map(|&karat| {
            let raw = price_per_gram_24k * Decimal::from(karat) / dec!(24);
            let (local, italian) = making_charges(karat);
            GoldTier {
                karat,
                raw: round_dzd(raw),
                local: round_dzd(raw + local),
                italian: round_dzd(raw + italian),
            }
        })
        .collect();

    PriceBoard {
        spot: SpotPrices {
            gold,
            silver,
            copper,
            last_updated: relative_time(snapshot.gold_observed_at, now),
        },
        rates: ExchangeRates { usd_dzd, eur_dzd },
        gold_dzd,
        silver_dzd: SilverPrice {
            gram: round_dzd(silver / GRAMS_PER_TROY_OUNCE * usd_dzd),
        },
    }
}

/// Human-relative age of an observation, or "No data" when none exists.
pub fn relative_time(observed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(then) = observed_at else {
        return "No data".to_string();
    };

    let seconds = (now - then).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{} minute{} ago", minutes, plural(minutes))
    } else if hours < 24 {
        format!("{} hour{} ago", hours, plural(hours))
    } else {
        format!("{} day{} ago", days, plural(days))
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
