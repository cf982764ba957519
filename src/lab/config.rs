use serde::{Deserialize, Serialize};

use crate::variants::VariantKey;

/// Minimum uplift over control for a leader to count as a meaningful win.
/// A business rule, not a statistical test.
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.15;

/// Goal 1 multiplier applied to the control value when a test sets none.
pub const DEFAULT_TARGET_MULTIPLIER: f64 = 1.2;

/// Bucket label for tests with no designer, content owner or category.
pub const MISSING_LABEL: &str = "—";

pub const CONTROL: VariantKey = VariantKey::A;

const ALL_SLOTS: &[VariantKey] = &VariantKey::ALL;
const CHALLENGERS: &[VariantKey] = &[VariantKey::B, VariantKey::C, VariantKey::D, VariantKey::E];
const CR_SLOTS: &[VariantKey] = &[VariantKey::A, VariantKey::B];
const CR_CHALLENGERS: &[VariantKey] = &[VariantKey::B];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestType {
    #[default]
    Ctr,
    Cr,
    Rich,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MetricKey {
    Ctr,
    Cr,
}

impl MetricKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Ctr => "ctr",
            MetricKey::Cr => "cr",
        }
    }
}

impl TestType {
    /// Case-insensitive and alias-aware. `CRT` is a common typo for CTR and
    /// `РИЧ` is the Cyrillic spelling of RICH; anything unrecognized is CTR.
    pub fn classify(raw: &str) -> TestType {
        match raw.trim().to_uppercase().as_str() {
            "CR" => TestType::Cr,
            "RICH" | "РИЧ" => TestType::Rich,
            _ => TestType::Ctr,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Ctr => "CTR",
            TestType::Cr => "CR",
            TestType::Rich => "RICH",
        }
    }

    /// RICH tests have no metric of their own and read `ctr`.
    pub fn metric_key(&self) -> MetricKey {
        match self {
            TestType::Cr => MetricKey::Cr,
            TestType::Ctr | TestType::Rich => MetricKey::Ctr,
        }
    }

    /// Slots a test of this type may fill.
    pub fn available_variants(&self) -> &'static [VariantKey] {
        match self {
            TestType::Cr => CR_SLOTS,
            TestType::Ctr | TestType::Rich => ALL_SLOTS,
        }
    }

    /// Slots compared against the control when picking a leader.
    pub fn comparable_variants(&self) -> &'static [VariantKey] {
        match self {
            TestType::Cr => CR_CHALLENGERS,
            TestType::Ctr | TestType::Rich => CHALLENGERS,
        }
    }
}
