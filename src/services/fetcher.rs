//! BOM forecast document client.
//!
//! Downloads précis forecast XML products from the Bureau of Meteorology
//! public endpoint, with retry and exponential backoff for transient network
//! failures. Fetch failures are reported as `None` rather than an error; the
//! collection pipeline inspects the sentinel and records a per-location
//! failure without aborting the run.

use reqwest::header::USER_AGENT;
use std::time::Duration;

/// Public BOM endpoint serving forecast products by ID.
const BOM_BASE_URL: &str = "http://www.bom.gov.au/fwo";

/// Per-attempt request timeout (seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum fetch attempts per product.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the first retry (seconds).
const DEFAULT_INITIAL_DELAY_SECS: f64 = 1.0;

/// Multiplier applied to the delay after each failed attempt.
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Client for the BOM forecast product endpoint.
#[derive(Debug, Clone)]
pub struct BomClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    max_retries: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
}

impl BomClient {
    pub fn new(user_agent: &str) -> Self {
        Self::with_base_url(user_agent, BOM_BASE_URL)
    }

    /// Create a client against a non-default base URL (used by tests).
    pub fn with_base_url(user_agent: &str, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_secs_f64(DEFAULT_INITIAL_DELAY_SECS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Shorten the retry delays (used by tests to avoid multi-second sleeps).
    #[cfg(test)]
    pub fn with_fast_retries(mut self) -> Self {
        self.initial_delay = Duration::from_millis(10);
        self
    }

    /// URL for a product's forecast XML document.
    fn product_url(&self, product_id: &str) -> String {
        format!("{}/{}.xml", self.base_url, product_id)
    }

    /// Download the forecast XML for a product ID.
    ///
    /// Retries with exponential backoff on any failure (network error,
    /// timeout, non-2xx status). Returns `None` once all attempts are
    /// exhausted.
    pub async fn fetch_forecast_xml(&self, product_id: &str) -> Option<String> {
        let url = self.product_url(product_id);
        let mut delay = self.initial_delay;

        for attempt in 1..=self.max_retries {
            tracing::debug!(
                "Fetching forecast for {} (attempt {}/{})",
                product_id,
                attempt,
                self.max_retries
            );

            match self.try_fetch(&url).await {
                Ok(xml) => {
                    tracing::debug!("Successfully fetched forecast for {}", product_id);
                    return Some(xml);
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tracing::warn!(
                            "Fetch failed for {} (attempt {}/{}): {}. Retrying in {:.1}s...",
                            product_id,
                            attempt,
                            self.max_retries,
                            e,
                            delay.as_secs_f64()
                        );
                        tokio::time::sleep(delay).await;
                        delay = delay.mul_f64(self.backoff_multiplier);
                    } else {
                        tracing::error!(
                            "All {} attempts failed for {}: {}",
                            self.max_retries,
                            product_id,
                            e
                        );
                    }
                }
            }
        }

        None
    }

    async fn try_fetch(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("failed to read body: {}", e))
    }
}
