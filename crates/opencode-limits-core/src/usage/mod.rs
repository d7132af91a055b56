//! Usage model shared by every provider.

pub mod types;

pub use types::{coerce_number, parse_timestamp, UsageWindow};
