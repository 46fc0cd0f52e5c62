//! Domain types for marginal emissions data.
//!
//! Everything here is plain data: instants supplied by callers, market
//! identifiers, and the readings and series produced by the client.

mod market;
mod series;
mod time_point;

pub use market::Market;
pub use series::{Reading, Series};
pub use time_point::TimePoint;
