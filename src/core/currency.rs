//! Currency rate abstractions and core types

use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One of the three per-currency enrichment values filled after the primary fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Metric {
    RateToSecondary,
    ChangeVsBase,
    ChangeVsSecondary,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::RateToSecondary,
        Metric::ChangeVsBase,
        Metric::ChangeVsSecondary,
    ];
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Metric::RateToSecondary => "rate_to_secondary",
                Metric::ChangeVsBase => "change_vs_base",
                Metric::ChangeVsSecondary => "change_vs_secondary",
            }
        )
    }
}

/// A currency quoted against the batch's base currency, enriched with its
/// secondary rate and one-day changes.
///
/// Auxiliary values default to zero. `failed` lists the metrics whose fetch
/// did not settle successfully, so a real zero can be told apart from a gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub code: String,
    pub rate_to_base: f64,
    pub rate_to_secondary: f64,
    pub change_vs_base: f64,
    pub change_vs_secondary: f64,
    #[serde(default)]
    pub failed: Vec<Metric>,
}

impl CurrencyRate {
    pub fn new(code: impl Into<String>, rate_to_base: f64) -> Self {
        Self {
            code: code.into(),
            rate_to_base,
            rate_to_secondary: 0.0,
            change_vs_base: 0.0,
            change_vs_secondary: 0.0,
            failed: Vec::new(),
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::RateToSecondary => self.rate_to_secondary,
            Metric::ChangeVsBase => self.change_vs_base,
            Metric::ChangeVsSecondary => self.change_vs_secondary,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::RateToSecondary => self.rate_to_secondary = value,
            Metric::ChangeVsBase => self.change_vs_base = value,
            Metric::ChangeVsSecondary => self.change_vs_secondary = value,
        }
    }

    pub fn has_failed(&self, metric: Metric) -> bool {
        self.failed.contains(&metric)
    }
}

/// Source of the primary quote list for a base currency.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Returns `(code, rate)` pairs in response order. Codes are unique three-letter identifiers.
    async fn fetch_quotes(&self, base_currency: &str) -> Result<Vec<(String, f64)>>;
}

/// Source of the per-currency auxiliary metrics.
#[async_trait]
pub trait MetricProvider: Send + Sync {
    /// The fixed secondary reference currency this provider quotes against.
    fn secondary_currency(&self) -> &str;

    /// Rate of `code` against the provider's secondary reference currency.
    async fn fetch_secondary_rate(&self, code: &str) -> Result<f64>;

    /// Percentage change of `code` against `reference` over the last day.
    async fn fetch_change(&self, code: &str, reference: &str) -> Result<f64>;
}
