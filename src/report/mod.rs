//! Lab dashboard report.
//!
//! [`build_lab_report`] keeps lab tests, applies the dashboard filters, and
//! rolls the survivors up through [`aggregation::aggregate`]. [`select`]
//! exposes the filtering step with per-reason exclusion counts.

pub mod aggregation;
pub mod filter;
pub mod types;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

pub use aggregation::{aggregate, filter_options, Aggregation};
pub use filter::{DateRange, Exclusion, ReportQuery};
pub use types::{
    AppliedFilters, BreakdownRow, Breakdowns, DataQuality, DetailRow, FilterOptions, Kpis,
    LabReport, StatusCounts, TypeCounts,
};

use crate::types::{Directory, TestRecord};

pub const MISSING_CREATED_AT_WARNING: &str =
    "Some tests have no creation date; the date filter may be incomplete.";

/// Lab tests that survive a query, and how many were dropped for each reason.
#[derive(Debug, Default)]
pub struct Selection<'a> {
    pub kept: Vec<&'a TestRecord>,
    pub lab_tests: usize,
    pub excluded: IndexMap<Exclusion, usize>,
}

impl Selection<'_> {
    pub fn excluded_for(&self, reason: Exclusion) -> usize {
        self.excluded.get(&reason).copied().unwrap_or(0)
    }
}

/// Keeps lab members of `tests` that pass `query` as of `now`. Reasons are
/// counted in first-seen order.
pub fn select<'a>(
    tests: &'a [TestRecord],
    query: &ReportQuery,
    now: DateTime<Utc>,
) -> Selection<'a> {
    let cutoff = query.date_range.cutoff(now);
    let mut selection = Selection::default();
    for test in tests.iter().filter(|t| t.is_lab_member()) {
        selection.lab_tests += 1;
        match query.exclusion(test, cutoff) {
            None => selection.kept.push(test),
            Some(reason) => *selection.excluded.entry(reason).or_insert(0) += 1,
        }
    }
    selection
}

/// Builds the dashboard response for `tests` as of `now`.
///
/// Only lab tests are considered. Undated tests are dropped under a bounded
/// date range, and that is reported once in `warnings`.
pub fn build_lab_report(
    tests: &[TestRecord],
    directory: &Directory,
    query: &ReportQuery,
    now: DateTime<Utc>,
) -> LabReport {
    let Selection {
        kept,
        lab_tests,
        excluded,
    } = select(tests, query, now);

    let mut warnings = Vec::new();
    if excluded.contains_key(&Exclusion::MissingCreatedAt) {
        tracing::warn!(
            range = query.date_range.as_str(),
            "[report] {}",
            MISSING_CREATED_AT_WARNING
        );
        warnings.push(MISSING_CREATED_AT_WARNING.to_string());
    }
    if !excluded.is_empty() {
        tracing::debug!(counts = ?excluded, "[report] excluded tests");
    }

    let options = filter_options(&kept, directory);
    let Aggregation {
        kpis,
        breakdowns,
        rows,
    } = aggregate(kept.iter().copied());

    tracing::info!(
        filtered = kpis.total_tests,
        lab = lab_tests,
        total = tests.len(),
        winners = kpis.winners,
        "[report] built lab report"
    );

    LabReport {
        warnings,
        filters: query.applied(),
        options,
        kpis,
        breakdowns,
        rows,
    }
}
