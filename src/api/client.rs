//! WattTime API client.

use super::DataConverter;
use super::models::{ErrorResponse, MarginalPage};
use crate::cache::{self, CacheBucket, ImpactCache, MemoryCache};
use crate::config::{ApiConfig, TOKEN_ENV_VAR};
use crate::error::{Error, Result};
use crate::model::{Market, Reading, Series, TimePoint};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue, RETRY_AFTER};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("watttime/", env!("CARGO_PKG_VERSION"));

/// Half-width of the window fetched around a single-instant lookup.
const LOOKUP_WINDOW_HOURS: i64 = 1;

/// Builder for creating an API client.
pub struct WattTimeClientBuilder {
    config: ApiConfig,
    token: Option<String>,
    cache: Option<Box<dyn ImpactCache>>,
}

impl WattTimeClientBuilder {
    /// Create a new builder with default config.
    pub fn new() -> Self {
        Self {
            config: ApiConfig::default(),
            token: None,
            cache: None,
        }
    }

    /// Set the API configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the API token. Takes precedence over the token in the config.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use a custom cache instead of the in-memory default.
    pub fn cache(mut self, cache: Box<dyn ImpactCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the API client.
    pub fn build(self) -> Result<WattTimeClient> {
        let token = self
            .token
            .or_else(|| self.config.token.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::auth("WattTime API token required"))?;

        let cache = self
            .cache
            .unwrap_or_else(|| Box::new(MemoryCache::new()));

        WattTimeClient::with_cache(self.config, token, cache)
    }
}

impl Default for WattTimeClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the WattTime marginal emissions API.
///
/// Requests are issued one at a time. Every reading fetched is kept in the
/// client's cache and reused by later lookups on the same day.
pub struct WattTimeClient {
    config: ApiConfig,
    http: reqwest::Client,
    auth_header: HeaderValue,
    cache: Mutex<Box<dyn ImpactCache>>,
    rate_limiter: Mutex<RateLimiter>,
}

impl WattTimeClient {
    /// Start building a client.
    pub fn builder() -> WattTimeClientBuilder {
        WattTimeClientBuilder::new()
    }

    /// Create a client with the given token and an in-memory cache.
    pub fn new(config: ApiConfig, token: impl Into<String>) -> Result<Self> {
        Self::builder().config(config).token(token).build()
    }

    /// Create a client whose token is read from `WATTTIME_API_TOKEN`.
    pub fn from_env(config: ApiConfig) -> Result<Self> {
        let token = std::env::var(TOKEN_ENV_VAR)
            .map_err(|_| Error::auth(format!("{TOKEN_ENV_VAR} is not set")))?;
        Self::new(config, token)
    }

    fn with_cache(config: ApiConfig, token: String, cache: Box<dyn ImpactCache>) -> Result<Self> {
        let mut auth_header = HeaderValue::from_str(&format!("{} {}", config.auth_scheme, token))
            .map_err(|_| Error::auth("token contains characters not allowed in a header"))?;
        auth_header.set_sensitive(true);

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        let rate_limiter = Mutex::new(RateLimiter::new(config.rate_limit));

        Ok(Self {
            config,
            http,
            auth_header,
            cache: Mutex::new(cache),
            rate_limiter,
        })
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Market used when a call does not name one.
    pub fn default_market(&self) -> Market {
        Market::from(self.config.default_market.as_str())
    }

    /// Fetch all readings between `start` and `end`.
    pub async fn fetch(
        &self,
        start: impl Into<TimePoint>,
        end: impl Into<TimePoint>,
        ba: &str,
        market: &Market,
    ) -> Result<Vec<Reading>> {
        self.fetch_with_params(start, end, ba, market, &[]).await
    }

    /// Fetch all readings between `start` and `end`, passing extra query
    /// parameters through to the API.
    ///
    /// Pages are followed until the service reports no `next` link. Readings
    /// come back sorted by timestamp and are added to the cache.
    pub async fn fetch_with_params(
        &self,
        start: impl Into<TimePoint>,
        end: impl Into<TimePoint>,
        ba: &str,
        market: &Market,
        extra: &[(&str, &str)],
    ) -> Result<Vec<Reading>> {
        let start = start.into().to_utc()?;
        let end = end.into().to_utc()?;
        validate_range(start, end)?;

        self.fetch_utc(start, end, ba, market, extra).await
    }

    async fn fetch_utc(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ba: &str,
        market: &Market,
        extra: &[(&str, &str)],
    ) -> Result<Vec<Reading>> {
        let mut query: Vec<(String, String)> = vec![
            ("start_at".into(), start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("end_at".into(), end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("ba".into(), ba.to_string()),
            ("market".into(), market.to_string()),
        ];
        query.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let url = format!("{}/marginal/", self.config.base_url.trim_end_matches('/'));
        let mut page = self.get_page(&url, &query).await?;
        let mut records = std::mem::take(&mut page.results);
        let mut pages = 1;

        while let Some(next) = page.next.take() {
            debug!(page = pages + 1, url = %next, "following next page");
            // The next link already carries the query string.
            page = self.get_page(&next, &[]).await?;
            records.append(&mut page.results);
            pages += 1;
        }

        let readings = DataConverter::convert_records(records)?;

        {
            let mut cache = self.cache.lock().await;
            for reading in &readings {
                let value = Some(reading.value);
                insert_into(cache.as_mut(), reading.timestamp, ba, market, value);
            }
        }

        info!(
            ba,
            market = %market,
            pages,
            readings = readings.len(),
            "fetched marginal emissions"
        );

        Ok(readings)
    }

    /// Marginal emissions in effect at `ts`.
    ///
    /// Uses `market`, or the configured default market when `None`. Returns
    /// `Ok(None)` when the service has nothing at or before `ts`.
    pub async fn impact_at(
        &self,
        ts: impl Into<TimePoint>,
        ba: &str,
        market: Option<&Market>,
    ) -> Result<Option<f64>> {
        let ts = ts.into().to_utc()?;
        let market = self.resolve_market(market);
        self.impact_at_utc(ts, ba, &market).await
    }

    async fn impact_at_utc(
        &self,
        ts: DateTime<Utc>,
        ba: &str,
        market: &Market,
    ) -> Result<Option<f64>> {
        let bucket = self.cached_bucket(ts, ba, market).await;

        // A bucket that ends before `ts` may be missing the reading we want.
        let covered = bucket
            .last_key_value()
            .is_some_and(|(latest, _)| *latest >= ts);

        let candidates: Vec<(DateTime<Utc>, Option<f64>)> = if covered {
            bucket.into_iter().collect()
        } else {
            debug!(ba, market = %market, %ts, "cache miss");
            let window = Duration::hours(LOOKUP_WINDOW_HOURS);
            let (from, to) = ts
                .checked_sub_signed(window)
                .zip(ts.checked_add_signed(window))
                .ok_or_else(|| {
                    Error::validation(format!("{ts} is too close to the date limit"))
                })?;
            self.fetch_utc(from, to, ba, market, &[])
                .await?
                .into_iter()
                .map(|r| (r.timestamp, Some(r.value)))
                .collect()
        };

        Ok(candidates
            .into_iter()
            .take_while(|(t, _)| *t <= ts)
            .last()
            .and_then(|(_, value)| value))
    }

    /// Marginal emissions on a grid from `start` (inclusive) to `end`
    /// (exclusive) every `interval_minutes`.
    ///
    /// `start` and `end` may carry different offsets. With `fill`, gaps take
    /// the most recent preceding value.
    pub async fn impact_between(
        &self,
        start: impl Into<TimePoint>,
        end: impl Into<TimePoint>,
        interval_minutes: i64,
        ba: &str,
        market: Option<&Market>,
        fill: bool,
    ) -> Result<Series> {
        let start = start.into().to_utc()?;
        let end = end.into().to_utc()?;
        if interval_minutes <= 0 {
            return Err(Error::validation(format!(
                "interval must be positive, got {interval_minutes} minutes"
            )));
        }
        validate_range(start, end)?;

        let market = self.resolve_market(market);
        let interval = Duration::try_minutes(interval_minutes).ok_or_else(|| {
            Error::validation(format!("interval of {interval_minutes} minutes is out of range"))
        })?;
        let index = Series::grid(start, end, interval);

        let mut values = Vec::with_capacity(index.len());
        for ts in &index {
            values.push(self.impact_at_utc(*ts, ba, &market).await?);
        }

        let mut series = Series::from_parts(start, end, interval, index, values);
        if fill {
            series.forward_fill();
        }

        debug!(
            ba,
            market = %market,
            points = series.len(),
            gaps = series.has_gaps(),
            "built series"
        );
        Ok(series)
    }

    /// Record a value in the cache as if it had been fetched.
    pub async fn insert_to_cache(
        &self,
        ts: DateTime<Utc>,
        ba: &str,
        market: &Market,
        value: Option<f64>,
    ) {
        let mut cache = self.cache.lock().await;
        insert_into(cache.as_mut(), ts, ba, market, value);
    }

    /// The cached bucket holding `ts`, empty if nothing is cached.
    pub async fn cached_bucket(
        &self,
        ts: DateTime<Utc>,
        ba: &str,
        market: &Market,
    ) -> CacheBucket {
        let cache = self.cache.lock().await;
        cache
            .get(&cache::cache_key(ts, ba, market))
            .unwrap_or_default()
    }

    /// Drop all cached readings.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    fn resolve_market(&self, market: Option<&Market>) -> Market {
        market.cloned().unwrap_or_else(|| self.default_market())
    }

    /// GET one page, retrying recoverable failures.
    async fn get_page(&self, url: &str, query: &[(String, String)]) -> Result<MarginalPage> {
        let mut attempt = 0;

        loop {
            self.rate_limit().await;

            match self.try_get_page(url, query).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_recoverable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let mut delay = std::time::Duration::from_millis(
                        self.config.retry_backoff_ms * u64::from(attempt),
                    );
                    if let Error::RateLimited(secs) = &e {
                        delay = delay.max(std::time::Duration::from_secs(*secs));
                    }
                    warn!(attempt, ?delay, error = %e, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_get_page(&self, url: &str, query: &[(String, String)]) -> Result<MarginalPage> {
        debug!(url, "GET");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.auth_header.clone())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, response).await);
        }

        response.json::<MarginalPage>().await.map_err(|e| {
            if e.is_decode() {
                Error::parse(format!("malformed marginal response: {e}"))
            } else {
                Error::from(e)
            }
        })
    }

    /// Map a non-success response onto an error.
    async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> Error {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(ErrorResponse::into_message)
            .unwrap_or(body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::auth(message),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(retry_after, "rate limited by WattTime");
                Error::RateLimited(retry_after)
            }
            _ => {
                if status.is_server_error() {
                    warn!(status = status.as_u16(), %message, "server error");
                }
                Error::service(status.as_u16(), message)
            }
        }
    }

    /// Apply rate limiting.
    async fn rate_limit(&self) {
        let mut limiter = self.rate_limiter.lock().await;
        limiter.wait().await;
    }
}

fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start >= end {
        return Err(Error::validation(format!(
            "start {start} must be before end {end}"
        )));
    }
    Ok(())
}

fn insert_into(
    cache: &mut dyn ImpactCache,
    ts: DateTime<Utc>,
    ba: &str,
    market: &Market,
    value: Option<f64>,
) {
    let key = cache::cache_key(ts, ba, market);
    let mut bucket = cache.get(&key).unwrap_or_default();
    bucket.insert(ts, value);
    cache.set(&key, bucket);
}

/// Simple token-bucket rate limiter. A rate of zero disables it.
struct RateLimiter {
    requests_per_second: u32,
    last_request: std::time::Instant,
    tokens: f64,
}

impl RateLimiter {
    fn new(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            last_request: std::time::Instant::now(),
            tokens: requests_per_second as f64,
        }
    }

    async fn wait(&mut self) {
        if self.requests_per_second == 0 {
            return;
        }

        let rate = self.requests_per_second as f64;
        let now = std::time::Instant::now();
        let elapsed = now.duration_since(self.last_request).as_secs_f64();

        // Replenish tokens
        self.tokens = (self.tokens + elapsed * rate).min(rate);

        if self.tokens < 1.0 {
            let wait_time = (1.0 - self.tokens) / rate;
            tokio::time::sleep(std::time::Duration::from_secs_f64(wait_time)).await;
            self.tokens = 1.0;
        }

        self.tokens -= 1.0;
        self.last_request = std::time::Instant::now();
    }
}
