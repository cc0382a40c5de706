use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::{MetricProvider, QuoteProvider};
use crate::core::error::{FxError, Result, classify};

/// Client for the exchangerate.host `live`, `convert` and `change` endpoints.
pub struct ExchangeRateHostProvider {
    base_url: String,
    access_key: String,
    secondary_currency: String,
    timeout: Duration,
}

impl ExchangeRateHostProvider {
    pub fn new(base_url: &str, access_key: &str, secondary_currency: &str) -> Self {
        ExchangeRateHostProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
            secondary_currency: secondary_currency.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("Requesting {} with {:?}", endpoint, query);

        let mut params = vec![("access_key", self.access_key.as_str())];
        params.extend_from_slice(query);
        let url =
            reqwest::Url::parse_with_params(&format!("{}/{}", self.base_url, endpoint), &params)
                .map_err(|e| FxError::Transport(format!("Invalid URL for {endpoint}: {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent("fxrates/1.0")
            .timeout(self.timeout)
            .build()?;

        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FxError::Transport(format!(
                "HTTP error: {} for endpoint: {}",
                response.status(),
                endpoint
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            FxError::DataShape(format!(
                "Failed to parse JSON response for {endpoint}: {e}"
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    #[serde(default)]
    info: Option<String>,
}

/// Fields common to every response body.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(flatten)]
    body: T,
}

impl<T> Envelope<T> {
    fn into_body(self) -> Result<T> {
        if let Some(err) = self.error {
            debug!(code = err.code, info = ?err.info, "Upstream reported an error");
            return Err(classify(err.code).into());
        }
        if !self.success {
            return Err(FxError::DataShape(
                "response is neither successful nor carries an error".to_string(),
            ));
        }
        Ok(self.body)
    }
}

#[derive(Debug, Deserialize)]
struct LiveBody {
    #[serde(default)]
    quotes: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ConvertBody {
    #[serde(default)]
    result: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChangeQuote {
    change_pct: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChangeBody {
    #[serde(default)]
    quotes: Option<serde_json::Map<String, serde_json::Value>>,
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Splits a `SOURCECODE` quote key into the quoted code.
fn quoted_code(key: &str, source: &str) -> Option<String> {
    let code = key.strip_prefix(source).unwrap_or(key);
    is_currency_code(code).then(|| code.to_ascii_uppercase())
}

#[async_trait]
impl QuoteProvider for ExchangeRateHostProvider {
    #[instrument(
        name = "LiveQuotesFetch",
        skip(self),
        fields(base = %base_currency)
    )]
    async fn fetch_quotes(&self, base_currency: &str) -> Result<Vec<(String, f64)>> {
        let envelope: Envelope<LiveBody> = self
            .get_json("live", &[("source", base_currency)])
            .await?;
        let quotes = envelope.into_body()?.quotes.ok_or_else(|| {
            FxError::DataShape(format!("No quotes found for source: {base_currency}"))
        })?;

        let mut rates = Vec::with_capacity(quotes.len());
        let mut seen = HashSet::with_capacity(quotes.len());
        for (key, value) in quotes {
            let code = quoted_code(&key, base_currency)
                .ok_or_else(|| FxError::DataShape(format!("Unrecognized quote key: {key}")))?;
            if !seen.insert(code.clone()) {
                return Err(FxError::DataShape(format!(
                    "Duplicate quote code {code} from key: {key}"
                )));
            }
            let rate = value.as_f64().ok_or_else(|| {
                FxError::DataShape(format!("Quote {key} is not a number: {value}"))
            })?;
            rates.push((code, rate));
        }
        debug!("Parsed {} quotes", rates.len());
        Ok(rates)
    }
}

#[async_trait]
impl MetricProvider for ExchangeRateHostProvider {
    fn secondary_currency(&self) -> &str {
        &self.secondary_currency
    }

    #[instrument(name = "SecondaryRateFetch", skip(self), fields(code = %code))]
    async fn fetch_secondary_rate(&self, code: &str) -> Result<f64> {
        let envelope: Envelope<ConvertBody> = self
            .get_json(
                "convert",
                &[
                    ("from", self.secondary_currency.as_str()),
                    ("to", code),
                    ("amount", "1"),
                ],
            )
            .await?;
        envelope.into_body()?.result.ok_or_else(|| {
            FxError::DataShape(format!(
                "No conversion result for {}{}",
                self.secondary_currency, code
            ))
        })
    }

    #[instrument(name = "ChangeFetch", skip(self), fields(code = %code, reference = %reference))]
    async fn fetch_change(&self, code: &str, reference: &str) -> Result<f64> {
        let end_date = Utc::now().date_naive();
        let start_date = end_date - ChronoDuration::days(1);
        let start = start_date.format("%Y-%m-%d").to_string();
        let end = end_date.format("%Y-%m-%d").to_string();

        let envelope: Envelope<ChangeBody> = self
            .get_json(
                "change",
                &[
                    ("currencies", code),
                    ("start_date", start.as_str()),
                    ("end_date", end.as_str()),
                    ("source", reference),
                ],
            )
            .await?;

        let pair = format!("{reference}{code}");
        let quotes = envelope
            .into_body()?
            .quotes
            .ok_or_else(|| FxError::DataShape(format!("No change quotes for pair: {pair}")))?;

        // Keyed by source followed by currency, compared without regard to case.
        let entry = quotes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(&pair))
            .map(|(_, entry)| entry)
            .ok_or_else(|| {
                FxError::DataShape(format!("No change quote found for pair: {pair}"))
            })?;

        let quote: ChangeQuote = serde_json::from_value(entry.clone()).map_err(|e| {
            FxError::DataShape(format!("Malformed change quote for {pair}: {e}"))
        })?;
        quote
            .change_pct
            .ok_or_else(|| FxError::DataShape(format!("Missing change_pct for pair: {pair}")))
    }
}
