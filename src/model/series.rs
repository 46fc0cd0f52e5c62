//! Readings and fixed-interval series.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single marginal emissions reading, in lb/MWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Start of the interval the value applies to.
    pub timestamp: DateTime<Utc>,
    /// Marginal carbon intensity in lb/MWh.
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Marginal emissions sampled on a fixed grid.
///
/// The grid starts at `start` and advances by `interval` while strictly
/// before `end`. A slot is `None` when nothing was known at or before its
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRepr")]
pub struct Series {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(with = "interval_minutes")]
    interval: Duration,
    index: Vec<DateTime<Utc>>,
    values: Vec<Option<f64>>,
}

impl Series {
    /// Timestamps of the grid `[start, end)` at `interval`.
    ///
    /// Empty when `interval` is not positive or `start >= end`. The grid
    /// stops early if a step would leave the representable range.
    pub fn grid(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Vec<DateTime<Utc>> {
        if interval <= Duration::zero() {
            return Vec::new();
        }

        let mut index = Vec::new();
        let mut ts = start;
        while ts < end {
            index.push(ts);
            match ts.checked_add_signed(interval) {
                Some(next) => ts = next,
                None => break,
            }
        }
        index
    }

    /// Build a series from a grid and one value per slot.
    pub(crate) fn from_parts(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
        index: Vec<DateTime<Utc>>,
        values: Vec<Option<f64>>,
    ) -> Self {
        debug_assert_eq!(index.len(), values.len());
        Self {
            start,
            end,
            interval,
            index,
            values,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of slots, including gaps.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Grid timestamps.
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// Slot values in grid order.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value at a grid timestamp. `None` for gaps and off-grid timestamps.
    pub fn get(&self, ts: DateTime<Utc>) -> Option<f64> {
        self.index
            .binary_search(&ts)
            .ok()
            .and_then(|i| self.values.get(i).copied().flatten())
    }

    /// Iterate over `(timestamp, value)` pairs, gaps included.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, Option<f64>)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Iterate over the slots that hold a value.
    pub fn readings(&self) -> impl Iterator<Item = Reading> + '_ {
        self.iter()
            .filter_map(|(ts, value)| value.map(|v| Reading::new(ts, v)))
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied().flatten()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// Whether any slot is missing a value.
    pub fn has_gaps(&self) -> bool {
        self.values.iter().any(Option::is_none)
    }

    /// Replace each gap with the most recent preceding value.
    ///
    /// Leading gaps stay empty.
    pub fn forward_fill(&mut self) {
        let mut last = None;
        for slot in &mut self.values {
            match slot {
                Some(v) => last = Some(*v),
                None => *slot = last,
            }
        }
    }

    /// Consuming variant of [`Series::forward_fill`].
    pub fn forward_filled(mut self) -> Self {
        self.forward_fill();
        self
    }
}

/// Unchecked wire form of [`Series`].
#[derive(Deserialize)]
struct SeriesRepr {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(with = "interval_minutes")]
    interval: Duration,
    index: Vec<DateTime<Utc>>,
    values: Vec<Option<f64>>,
}

impl TryFrom<SeriesRepr> for Series {
    type Error = String;

    fn try_from(repr: SeriesRepr) -> Result<Self, Self::Error> {
        if repr.index.len() != repr.values.len() {
            return Err(format!(
                "series has {} timestamps but {} values",
                repr.index.len(),
                repr.values.len()
            ));
        }
        if !repr.index.windows(2).all(|w| w[0] < w[1]) {
            return Err("series timestamps must be strictly increasing".to_string());
        }

        Ok(Self {
            start: repr.start,
            end: repr.end,
            interval: repr.interval,
            index: repr.index,
            values: repr.values,
        })
    }
}

mod interval_minutes {
    use chrono::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(interval: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(interval.num_minutes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let minutes = i64::deserialize(deserializer)?;
        Duration::try_minutes(minutes).ok_or_else(|| {
            D::Error::custom(format!("interval of {minutes} minutes is out of range"))
        })
    }
}
