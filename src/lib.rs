//! # watttime - WattTime marginal emissions client
//!
//! A client for the WattTime API that fetches marginal carbon emissions for
//! a balancing authority and exposes them as a single value or as a
//! fixed-interval series.
//!
//! ## Architecture
//!
//! - **API**: authenticated requests, pagination, retries and response conversion
//! - **Model**: instants, markets, readings and series
//! - **Cache**: reuse of readings fetched earlier on the same day
//! - **Export**: CSV output of fetched ranges
//! - **Config**: configuration file and token lookup
//!
//! ```no_run
//! use chrono::{TimeZone, Utc};
//! use watttime::{ApiConfig, WattTimeClient};
//!
//! # async fn run() -> watttime::Result<()> {
//! let client = WattTimeClient::from_env(ApiConfig::default())?;
//! let start = Utc.with_ymd_and_hms(2014, 9, 2, 23, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2014, 9, 3, 2, 0, 0).unwrap();
//!
//! let now = client.impact_at(start, "PJM", None).await?;
//! let series = client.impact_between(start, end, 5, "PJM", None, true).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod model;

pub use api::{WattTimeClient, WattTimeClientBuilder};
pub use cache::{ImpactCache, MemoryCache};
pub use config::{ApiConfig, Config};
pub use error::{Error, Result};
pub use model::{Market, Reading, Series, TimePoint};
