use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::config::{
    MetricKey, TestType, CONTROL, DEFAULT_TARGET_MULTIPLIER, SIGNIFICANCE_THRESHOLD,
};
use crate::variants::{VariantDocument, VariantKey};

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.]").unwrap());

// ── Parsing ─────────────────────────────────────────────────────────

/// Reads a hand-entered metric. Comma decimals (`"12,5"`) and stray symbols
/// (`"12.5%"`) are accepted; null or unreadable input is 0. Never NaN.
///
/// Text and numbers agree on sign: `"-5"` reads as -5 like the number -5.
/// Every consumer treats a non-positive value as "no data".
pub fn parse_metric(input: &Value) -> f64 {
    match input {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0),
        Value::String(text) => parse_metric_text(text),
        other => parse_metric_text(&other.to_string()),
    }
}

pub fn parse_metric_text(text: &str) -> f64 {
    let trimmed = text.trim_start();
    // Only a leading minus is a sign; inner dashes are scrubbed with the rest.
    let (sign, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed),
    };
    // Only the first comma is a decimal separator.
    let dotted = body.replacen(',', ".", 1);
    let digits = NON_NUMERIC.replace_all(&dotted, "");
    if digits.is_empty() {
        return 0.0;
    }
    digits
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| sign * f)
        .unwrap_or(0.0)
}

pub fn metric_value(doc: &VariantDocument, key: VariantKey, metric: MetricKey) -> f64 {
    doc.variant(key)
        .field(metric.as_str())
        .map(parse_metric)
        .unwrap_or(0.0)
}

pub fn clamp(n: f64, min: f64, max: f64) -> f64 {
    n.min(max).max(min)
}

// ── Uplift and leader ───────────────────────────────────────────────

/// Relative improvement of `candidate` over `control`; 0 when either side
/// has no data.
pub fn calc_uplift(control: f64, candidate: f64) -> f64 {
    if control <= 0.0 || candidate <= 0.0 {
        return 0.0;
    }
    (candidate - control) / control
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderPick {
    pub leader_variant: Option<VariantKey>,
    pub leader_value: f64,
    pub leader_uplift: f64,
    pub is_leader_significant: bool,
    pub has_any_data: bool,
}

/// Best comparable variant against control A.
///
/// Left-to-right scan with strict `>` starting from 0, so ties keep the
/// earliest slot and a variant needs a positive value to lead.
pub fn pick_leader(doc: &VariantDocument, test_type: TestType) -> LeaderPick {
    let metric = test_type.metric_key();
    let control_value = metric_value(doc, CONTROL, metric);

    let mut leader_variant = None;
    let mut leader_value = 0.0;
    for &key in test_type.comparable_variants() {
        let value = metric_value(doc, key, metric);
        if value > leader_value {
            leader_value = value;
            leader_variant = Some(key);
        }
    }

    let leader_uplift = if leader_variant.is_some() {
        calc_uplift(control_value, leader_value)
    } else {
        0.0
    };

    LeaderPick {
        leader_variant,
        leader_value,
        leader_uplift,
        is_leader_significant: leader_variant.is_some() && leader_uplift >= SIGNIFICANCE_THRESHOLD,
        has_any_data: control_value > 0.0 || leader_value > 0.0,
    }
}

/// Comparable variants that have a recorded (positive) value.
pub fn count_prepared_variants(doc: &VariantDocument, test_type: TestType) -> usize {
    let metric = test_type.metric_key();
    test_type
        .comparable_variants()
        .iter()
        .filter(|&&key| metric_value(doc, key, metric) > 0.0)
        .count()
}

// ── Goals ───────────────────────────────────────────────────────────

/// Multiplier to use for goal 1: the given one when positive, else the default.
pub fn effective_multiplier(target_multiplier: Option<f64>) -> f64 {
    target_multiplier
        .filter(|m| m.is_finite() && *m > 0.0)
        .unwrap_or(DEFAULT_TARGET_MULTIPLIER)
}

/// Goal 1 = control × multiplier. No baseline, no goal.
pub fn calc_goal1(control: f64, target_multiplier: Option<f64>) -> f64 {
    if control <= 0.0 {
        return 0.0;
    }
    control * effective_multiplier(target_multiplier)
}

/// Goal 1 with a directly entered goal taking precedence when positive.
pub fn resolve_goal1(control: f64, target_multiplier: Option<f64>, direct_goal: f64) -> f64 {
    if direct_goal > 0.0 {
        return direct_goal;
    }
    calc_goal1(control, target_multiplier)
}

/// Percentage of `goal` reached, clamped to 0..=100.
pub fn calc_progress(current: f64, goal: f64) -> f64 {
    if goal <= 0.0 || current <= 0.0 {
        return 0.0;
    }
    clamp(current / goal * 100.0, 0.0, 100.0)
}

pub fn goal_reached(value: f64, goal: f64) -> bool {
    goal > 0.0 && value >= goal
}
