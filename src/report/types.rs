//! Dashboard response shape. Field names are the contract with the UI.

use serde::Serialize;

use crate::lab::config::TestType;
use crate::variants::VariantKey;

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabReport {
    pub warnings: Vec<String>,
    pub filters: AppliedFilters,
    pub options: FilterOptions,
    pub kpis: Kpis,
    pub breakdowns: Breakdowns,
    pub rows: Vec<DetailRow>,
}

/// Echo of the filters that were applied; unset filters are empty strings.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    pub date_range: String,
    pub category: String,
    pub test_type: String,
    pub designer: String,
    pub content_manager: String,
    pub sku_search: String,
    pub platform: String,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub designers: Vec<String>,
    pub content_managers: Vec<String>,
    pub platforms: Vec<String>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct TypeCounts {
    #[serde(rename = "CTR")]
    pub ctr: usize,
    #[serde(rename = "CR")]
    pub cr: usize,
    #[serde(rename = "RICH")]
    pub rich: usize,
}

impl TypeCounts {
    pub fn bump(&mut self, test_type: TestType) {
        match test_type {
            TestType::Ctr => self.ctr += 1,
            TestType::Cr => self.cr += 1,
            TestType::Rich => self.rich += 1,
        }
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct StatusCounts {
    pub active: usize,
    pub completed: usize,
}

/// Diagnostic counters, global over the filtered set.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    /// Control has no positive value.
    pub missing_a: usize,
    /// Neither control nor any comparable slot has a positive value.
    pub missing_metrics: usize,
    /// Control slot has no image.
    pub missing_images: usize,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_tests: usize,
    pub by_type: TypeCounts,
    pub total_prepared: usize,
    pub avg_prepared: f64,
    pub status: StatusCounts,
    pub winners: usize,
    pub winners_share: f64,
    pub goal1_reached: usize,
    pub goal1_share: f64,
    pub goal2_reached: usize,
    pub goal2_share: f64,
    pub strong_wins: usize,
    pub strong_win_share: f64,
    pub data_quality: DataQuality,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRow {
    pub key: String,
    pub label: String,
    pub tests: usize,
    /// Summed prepared-variant counts.
    pub variants: usize,
    pub winners: usize,
    pub goal1: usize,
    pub goal2: usize,
    pub win_rate: f64,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Breakdowns {
    pub by_designer: Vec<BreakdownRow>,
    pub by_content: Vec<BreakdownRow>,
    pub by_category: Vec<BreakdownRow>,
}

fn find<'a>(rows: &'a [BreakdownRow], key: &str) -> Option<&'a BreakdownRow> {
    rows.iter().find(|row| row.key == key)
}

impl Breakdowns {
    pub fn designer(&self, key: &str) -> Option<&BreakdownRow> {
        find(&self.by_designer, key)
    }

    pub fn content(&self, key: &str) -> Option<&BreakdownRow> {
        find(&self.by_content, key)
    }

    pub fn category(&self, key: &str) -> Option<&BreakdownRow> {
        find(&self.by_category, key)
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailRow {
    pub id: i64,
    pub sku: String,
    pub product_name: String,
    pub test_type: TestType,
    pub category: String,
    pub designer: String,
    pub content_manager: String,
    pub metric_a: f64,
    pub best_variant: VariantKey,
    pub best_value: f64,
    pub uplift: f64,
    pub goal1: f64,
    pub goal2: f64,
    pub status: String,
    pub created_at: Option<String>,
}
