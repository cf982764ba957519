//! Per-test derived facts.
//!
//! [`TestMetrics`] is what the reporter consumes for each test;
//! [`variant_progress`] is what the detail view renders for one slot.

use serde::Serialize;

use super::config::{MetricKey, TestType, CONTROL};
use super::stats::{
    calc_goal1, calc_progress, count_prepared_variants, goal_reached, metric_value, pick_leader,
    resolve_goal1, LeaderPick,
};
use crate::types::TestRecord;
use crate::variants::{legacy_map_image, variant_image, VariantDocument, VariantKey};

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestMetrics {
    pub test_type: TestType,
    pub metric_key: MetricKey,
    pub control_value: f64,
    pub leader: LeaderPick,
    pub goal1: f64,
    pub goal2: f64,
    pub goal1_reached: bool,
    pub goal2_reached: bool,
    pub prepared_variants: usize,
    /// Control or any comparable slot has a positive value.
    pub has_any_metric: bool,
    pub control_has_image: bool,
    pub winner: bool,
}

impl TestMetrics {
    pub fn compute(record: &TestRecord) -> Self {
        let doc = record.variant_document();
        Self::from_document(&doc, record)
    }

    pub fn from_document(doc: &VariantDocument, record: &TestRecord) -> Self {
        let test_type = record.kind();
        let metric_key = test_type.metric_key();
        let control_value = metric_value(doc, CONTROL, metric_key);
        let leader = pick_leader(doc, test_type);

        let goal1 = resolve_goal1(
            control_value,
            record.target_multiplier,
            record.metric_goal.unwrap_or(0.0),
        );
        let goal2 = record.vois_benchmark.unwrap_or(0.0).max(0.0);
        let prepared_variants = count_prepared_variants(doc, test_type);

        Self {
            test_type,
            metric_key,
            control_value,
            goal1,
            goal2,
            goal1_reached: goal_reached(leader.leader_value, goal1),
            goal2_reached: goal_reached(leader.leader_value, goal2),
            prepared_variants,
            has_any_metric: control_value > 0.0 || prepared_variants > 0,
            control_has_image: !variant_image(doc, CONTROL).trim().is_empty()
                || legacy_map_image(doc, CONTROL).is_some(),
            winner: record.has_winner(),
            leader,
        }
    }

    /// Best comparable slot, or the control when nothing beats zero.
    pub fn best_variant(&self) -> VariantKey {
        self.leader.leader_variant.unwrap_or(CONTROL)
    }

    pub fn is_strong_win(&self) -> bool {
        self.leader.is_leader_significant
    }
}

// ── Detail view ─────────────────────────────────────────────────────

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariantProgress {
    pub variant: VariantKey,
    pub value: f64,
    pub goal1: f64,
    pub goal1_progress: f64,
    pub goal1_reached: bool,
    pub goal2: f64,
    pub goal2_progress: f64,
    pub goal2_reached: bool,
    /// Percent above (positive) or below the benchmark; 0 without one.
    pub benchmark_delta_pct: f64,
}

/// Goal-relative standing of one slot. Goal 1 derives from the control,
/// goal 2 is the benchmark compared directly.
pub fn variant_progress(
    doc: &VariantDocument,
    test_type: TestType,
    key: VariantKey,
    target_multiplier: Option<f64>,
    benchmark: Option<f64>,
) -> VariantProgress {
    let metric = test_type.metric_key();
    let value = metric_value(doc, key, metric);
    let goal1 = calc_goal1(metric_value(doc, CONTROL, metric), target_multiplier);
    let goal2 = benchmark.filter(|b| *b > 0.0).unwrap_or(0.0);

    VariantProgress {
        variant: key,
        value,
        goal1,
        goal1_progress: calc_progress(value, goal1),
        goal1_reached: goal_reached(value, goal1),
        goal2,
        goal2_progress: calc_progress(value, goal2),
        goal2_reached: goal_reached(value, goal2),
        benchmark_delta_pct: if goal2 > 0.0 {
            (value - goal2) / goal2 * 100.0
        } else {
            0.0
        },
    }
}

/// Progress for every slot the test type allows.
pub fn test_progress(record: &TestRecord) -> Vec<VariantProgress> {
    let doc = record.variant_document();
    let test_type = record.kind();
    test_type
        .available_variants()
        .iter()
        .map(|&key| {
            variant_progress(
                &doc,
                test_type,
                key,
                record.target_multiplier,
                record.vois_benchmark,
            )
        })
        .collect()
}

// ── AI analysis inputs ──────────────────────────────────────────────

/// Images that would be sent for AI analysis, in slot order.
pub fn ai_scan_images(doc: &VariantDocument, test_type: TestType) -> Vec<(VariantKey, String)> {
    test_type
        .available_variants()
        .iter()
        .filter_map(|&key| {
            let url = variant_image(doc, key);
            (!url.trim().is_empty()).then_some((key, url))
        })
        .collect()
}

/// CR analysis compares A against B and needs both images; the other types
/// only need the control image.
pub fn ai_ready(doc: &VariantDocument, test_type: TestType) -> bool {
    let has = |key| !variant_image(doc, key).trim().is_empty();
    match test_type {
        TestType::Cr => has(VariantKey::A) && has(VariantKey::B),
        TestType::Ctr | TestType::Rich => has(VariantKey::A),
    }
}
