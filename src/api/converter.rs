//! Data conversion utilities for API responses.

use super::models::MarginalRecord;
use crate::error::{Error, Result};
use crate::model::Reading;
use chrono::{DateTime, NaiveDateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Converts API responses to internal types.
pub struct DataConverter;

impl DataConverter {
    /// Parse a record timestamp into a UTC instant.
    pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
            return Ok(naive.and_utc());
        }

        // Some deployments emit offsets or fractional seconds.
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::parse(format!("invalid timestamp '{raw}': {e}")))
    }

    /// Marginal value of a record, if it carries one.
    pub fn extract_value(record: &MarginalRecord) -> Option<f64> {
        record
            .marginal_carbon
            .as_ref()
            .and_then(|mc| mc.value)
            .filter(|v| v.is_finite())
    }

    /// Convert raw records into readings sorted by timestamp.
    ///
    /// Records without a value are dropped.
    pub fn convert_records(records: Vec<MarginalRecord>) -> Result<Vec<Reading>> {
        let mut readings = Vec::with_capacity(records.len());

        for record in &records {
            let timestamp = Self::parse_timestamp(&record.timestamp)?;
            if let Some(value) = Self::extract_value(record) {
                readings.push(Reading::new(timestamp, value));
            }
        }

        readings.sort_by_key(|r| r.timestamp);
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::MarginalPage;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            DataConverter::parse_timestamp("2014-09-02T23:05:00Z").unwrap(),
            Utc.with_ymd_and_hms(2014, 9, 2, 23, 5, 0).unwrap()
        );
        assert_eq!(
            DataConverter::parse_timestamp("2014-09-02T23:05:00.000+00:00").unwrap(),
            Utc.with_ymd_and_hms(2014, 9, 2, 23, 5, 0).unwrap()
        );
        assert!(matches!(
            DataConverter::parse_timestamp("02/09/2014"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_convert_sorts_and_drops_missing_values() {
        let page: MarginalPage = serde_json::from_str(
            r#"{
                "next": null,
                "results": [
                    {"timestamp": "2014-09-02T23:10:00Z", "marginal_carbon": {"value": 1650.5, "units": "lb/MW"}},
                    {"timestamp": "2014-09-02T23:00:00Z", "marginal_carbon": {"value": 1600.0}},
                    {"timestamp": "2014-09-02T23:05:00Z", "marginal_carbon": {"value": null}},
                    {"timestamp": "2014-09-02T23:15:00Z", "marginal_carbon": null},
                    {"timestamp": "2014-09-02T23:20:00Z"}
                ]
            }"#,
        )
        .unwrap();

        let readings = DataConverter::convert_records(page.results).unwrap();
        assert_eq!(
            readings,
            vec![
                Reading::new(Utc.with_ymd_and_hms(2014, 9, 2, 23, 0, 0).unwrap(), 1600.0),
                Reading::new(Utc.with_ymd_and_hms(2014, 9, 2, 23, 10, 0).unwrap(), 1650.5),
            ]
        );
    }

    #[test]
    fn test_convert_rejects_bad_timestamp() {
        let page: MarginalPage = serde_json::from_str(
            r#"{"results": [{"timestamp": "soon", "marginal_carbon": {"value": 1.0}}]}"#,
        )
        .unwrap();
        assert!(DataConverter::convert_records(page.results).is_err());
    }
}
