//! WattTime API integration.
//!
//! This module provides a high-level interface to the marginal emissions
//! endpoint, handling authentication, pagination, retries, rate limiting and
//! conversion of raw records into readings.

mod client;
mod converter;
pub mod models;

pub use client::{WattTimeClient, WattTimeClientBuilder};
pub use converter::DataConverter;
