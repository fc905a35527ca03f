// MLB Stats API data source for the offense rankings engine.

pub mod client;
pub mod ra9;
pub mod source;

pub use client::{FetchError, StatsApiClient};
pub use source::StatsApiSource;
