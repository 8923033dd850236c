//! Output formatters for scan results.
//!
//! - [`json`]: the four report files written after every scan
//! - [`text`]: ranked disk usage, duplicate listing and counters for the
//!   terminal

pub mod json;
pub mod text;

pub use json::{JsonReports, JsonSummary, WrittenReports};
