//! Portfolio composition and aggregation

pub mod aggregate;
pub mod compose;
pub mod views;

pub use aggregate::{aggregate, Dimension};
pub use compose::{compose, CompositionReport, UnresolvedFund, UNKNOWN};
pub use views::{PortfolioViews, SummaryMetrics};
