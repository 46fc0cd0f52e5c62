//! Wire models for the marginal emissions endpoint.

use serde::{Deserialize, Serialize};

/// One page of `GET /marginal/` results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginalPage {
    /// Absolute URL of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
    /// Total number of records across all pages.
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub results: Vec<MarginalRecord>,
}

/// A single marginal emissions record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginalRecord {
    /// UTC timestamp, `YYYY-MM-DDTHH:MM:SSZ`.
    pub timestamp: String,
    #[serde(default)]
    pub ba: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub freq: Option<String>,
    #[serde(default)]
    pub marginal_carbon: Option<MarginalCarbon>,
}

/// The emissions payload of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginalCarbon {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
}

/// Error body returned alongside non-success statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn into_message(self) -> Option<String> {
        self.detail.or(self.message)
    }
}
