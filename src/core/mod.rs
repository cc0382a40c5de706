//! Core business logic abstractions

pub mod aggregator;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;

// Re-export main types for cleaner imports
pub use aggregator::RateAggregator;
pub use currency::{CurrencyRate, Metric, MetricProvider, QuoteProvider};
pub use error::{ClassifiedError, ErrorKind, FxError, classify};
