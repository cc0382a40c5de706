//! Builds the per-currency rate records for one base currency.
//!
//! One primary fetch lists the currencies; each of them is then enriched by
//! three independent auxiliary fetches run concurrently. A failed auxiliary
//! fetch only leaves its own field at zero. A failed primary fetch yields an
//! empty batch.
use crate::core::currency::{CurrencyRate, Metric, MetricProvider, QuoteProvider};
use crate::core::error::Result;
use futures::future::{self, Future};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

pub struct RateAggregator {
    quotes: Arc<dyn QuoteProvider>,
    metrics: Arc<dyn MetricProvider>,
    max_concurrency: Option<usize>,
}

impl RateAggregator {
    pub fn new(quotes: Arc<dyn QuoteProvider>, metrics: Arc<dyn MetricProvider>) -> Self {
        Self {
            quotes,
            metrics,
            max_concurrency: None,
        }
    }

    /// Caps the number of auxiliary fetches in flight. `None` runs all of them at once.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn secondary_currency(&self) -> &str {
        self.metrics.secondary_currency()
    }

    /// Fetches and enriches every currency quoted against `base_currency`.
    pub async fn aggregate(&self, base_currency: &str) -> Vec<CurrencyRate> {
        self.aggregate_with(base_currency, &|_: usize| (), future::pending())
            .await
    }

    /// Same as [`aggregate`](Self::aggregate), reporting each settled auxiliary
    /// fetch through `on_settled` and stopping early once `cancel` resolves.
    /// `on_settled` receives the total number of auxiliary fetches in the batch.
    ///
    /// Cancellation abandons the fetches still pending. Values already received
    /// are kept and the remaining ones stay at zero, flagged as failed.
    #[instrument(
        name = "Aggregate",
        skip(self, on_settled, cancel),
        fields(base = %base_currency)
    )]
    pub async fn aggregate_with<F>(
        &self,
        base_currency: &str,
        on_settled: &(dyn Fn(usize) + Send + Sync),
        cancel: F,
    ) -> Vec<CurrencyRate>
    where
        F: Future<Output = ()>,
    {
        let quotes = match self.quotes.fetch_quotes(base_currency).await {
            Ok(quotes) => quotes,
            Err(e) => {
                error!(error = %e, "Primary quote fetch failed");
                return Vec::new();
            }
        };

        let mut records: Vec<CurrencyRate> = quotes
            .into_iter()
            .map(|(code, rate)| CurrencyRate::new(code, rate))
            .collect();
        debug!("Primary fetch returned {} currencies", records.len());

        if records.is_empty() {
            return records;
        }

        let metrics = &*self.metrics;
        let secondary = metrics.secondary_currency();
        let task_count = records.len() * Metric::ALL.len();
        let limit = self
            .max_concurrency
            .filter(|n| *n > 0)
            .unwrap_or(task_count);

        let tasks = records
            .iter()
            .enumerate()
            .flat_map(|(index, record)| {
                Metric::ALL
                    .into_iter()
                    .map(move |metric| (index, record.code.clone(), metric))
            })
            .map(|(index, code, metric)| async move {
                let result =
                    fetch_metric(metrics, &code, metric, base_currency, secondary).await;
                on_settled(task_count);
                (index, metric, result)
            });

        let settled: Vec<(usize, Metric, Result<f64>)> = stream::iter(tasks)
            .buffer_unordered(limit)
            .take_until(cancel)
            .collect()
            .await;

        if settled.len() < task_count {
            warn!(
                settled = settled.len(),
                total = task_count,
                "Aggregation cancelled before all auxiliary fetches settled"
            );
        }

        let mut done = vec![[false; 3]; records.len()];
        for (index, metric, result) in settled {
            let record = &mut records[index];
            done[index][metric as usize] = true;
            match result {
                Ok(value) => record.set(metric, value),
                Err(e) => {
                    warn!(
                        code = %record.code,
                        metric = %metric,
                        error = %e,
                        "Auxiliary fetch failed, leaving default"
                    );
                    record.failed.push(metric);
                }
            }
        }

        for (record, done) in records.iter_mut().zip(done) {
            for metric in Metric::ALL {
                if !done[metric as usize] {
                    record.failed.push(metric);
                }
            }
            record.failed.sort();
        }

        records
    }
}

async fn fetch_metric(
    metrics: &dyn MetricProvider,
    code: &str,
    metric: Metric,
    base_currency: &str,
    secondary_currency: &str,
) -> Result<f64> {
    match metric {
        Metric::RateToSecondary => metrics.fetch_secondary_rate(code).await,
        Metric::ChangeVsBase => metrics.fetch_change(code, base_currency).await,
        Metric::ChangeVsSecondary => metrics.fetch_change(code, secondary_currency).await,
    }
}
