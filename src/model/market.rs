//! Market identifiers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A WattTime market.
///
/// The API accepts market codes as strings; the two common ones get their own
/// variant and anything else is carried through upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Market {
    /// Real-time, five-minute market (`RT5M`).
    #[default]
    RealTime5Min,
    /// Day-ahead, hourly market (`DAHR`).
    DayAheadHourly,
    /// Any other market code.
    Other(String),
}

impl Market {
    /// The market code as sent to the API.
    pub fn as_str(&self) -> &str {
        match self {
            Self::RealTime5Min => "RT5M",
            Self::DayAheadHourly => "DAHR",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for Market {
    fn from(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        match code.as_str() {
            "RT5M" => Self::RealTime5Min,
            "DAHR" => Self::DayAheadHourly,
            _ => Self::Other(code),
        }
    }
}

impl From<String> for Market {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<Market> for String {
    fn from(market: Market) -> Self {
        market.as_str().to_string()
    }
}

impl FromStr for Market {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(Market::from("rt5m"), Market::RealTime5Min);
        assert_eq!(Market::from("DAHR"), Market::DayAheadHourly);
        assert_eq!(Market::default().as_str(), "RT5M");
    }

    #[test]
    fn test_other_codes_are_uppercased() {
        let market = Market::from("rt15m");
        assert_eq!(market, Market::Other("RT15M".to_string()));
        assert_eq!(market.to_string(), "RT15M");
    }
}
