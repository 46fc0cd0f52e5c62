//! CSV export of fetched readings.

use crate::api::WattTimeClient;
use crate::error::Result;
use crate::model::{Market, TimePoint};
use std::path::{Path, PathBuf};
use tracing::info;

/// Header row of exported files.
pub const CSV_HEADER: [&str; 2] = ["timestamp", "marginal_carbon_lb/MWh"];

/// Fetch `[start, end]` and write it to a CSV file in `dir`.
///
/// The file is named `{BA}_{MARKET}_{start}_{end}.csv` with both instants in
/// compact UTC form. Returns the path written.
pub async fn export_csv(
    client: &WattTimeClient,
    start: impl Into<TimePoint>,
    end: impl Into<TimePoint>,
    ba: &str,
    market: &Market,
    dir: &Path,
) -> Result<PathBuf> {
    let start = start.into();
    let end = end.into();
    let start_utc = start.to_utc()?;
    let end_utc = end.to_utc()?;

    let readings = client.fetch(start, end, ba, market).await?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(
        ba,
        market,
        &start_utc.format("%Y%m%dT%H%M%SZ").to_string(),
        &end_utc.format("%Y%m%dT%H%M%SZ").to_string(),
    ));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(CSV_HEADER)?;
    for reading in &readings {
        writer.write_record([reading.timestamp.to_rfc3339(), reading.value.to_string()])?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = readings.len(), "exported marginal emissions");
    Ok(path)
}

fn export_file_name(ba: &str, market: &Market, start: &str, end: &str) -> String {
    format!("{}_{}_{}_{}.csv", ba.to_uppercase(), market, start, end)
}
