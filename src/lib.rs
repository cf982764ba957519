//! Core of a marketing A/B test tracker.
//!
//! Three layers, leaves first:
//! - [`variants`] turns loosely-shaped, possibly legacy variant blobs into a
//!   canonical [`VariantDocument`] and applies the edits the UI performs.
//! - [`lab`] derives per-test statistics: metric values, the leading variant,
//!   uplift, goals and progress.
//! - [`report`] filters a collection of tests and rolls the per-test facts up
//!   into the dashboard response.
//!
//! Everything here is synchronous and pure. Storage, HTTP, auth, uploads and
//! the LLM call live outside this crate.

pub mod error;
pub mod lab;
pub mod report;
pub mod types;
pub mod variants;

pub use error::{AbtrackError, Result};
pub use lab::config::{MetricKey, TestType};
pub use lab::metrics::TestMetrics;
pub use lab::stats::LeaderPick;
pub use report::{build_lab_report, LabReport, ReportQuery};
pub use types::{Directory, TestRecord};
pub use variants::document::{AiHistoryEntry, AiResult, Variant, VariantDocument, VariantKey};
pub use variants::normalize::{
    append_ai_history, normalize, set_variant_image, set_variant_metric, try_parse_json,
};
