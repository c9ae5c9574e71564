//! Insights endpoints: urgent queue, trends, and the executive summary.
//!
//! Queries pull period-filtered rows; every aggregation is computed in Rust by
//! the pure helpers in `aggregate.rs` so the math is unit-testable without a
//! database.

pub mod aggregate;
pub mod handlers;
pub mod queries;
