use indexmap::{IndexMap, IndexSet};

use super::types::{BreakdownRow, Breakdowns, DetailRow, FilterOptions, Kpis, StatusCounts};
use crate::lab::metrics::TestMetrics;
use crate::types::{Directory, TestRecord};

/// Percentage of `part` in `total`, 0 for an empty total.
fn share(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub kpis: Kpis,
    pub breakdowns: Breakdowns,
    pub rows: Vec<DetailRow>,
}

/// Running totals for one breakdown bucket.
#[derive(Debug, Default)]
struct GroupTally {
    tests: usize,
    variants: usize,
    winners: usize,
    goal1: usize,
    goal2: usize,
}

impl GroupTally {
    fn add(&mut self, metrics: &TestMetrics) {
        self.tests += 1;
        self.variants += metrics.prepared_variants;
        self.winners += usize::from(metrics.winner);
        self.goal1 += usize::from(metrics.goal1_reached);
        self.goal2 += usize::from(metrics.goal2_reached);
    }

    fn into_row(self, key: String) -> BreakdownRow {
        BreakdownRow {
            label: key.clone(),
            key,
            tests: self.tests,
            variants: self.variants,
            winners: self.winners,
            goal1: self.goal1,
            goal2: self.goal2,
            win_rate: share(self.winners, self.tests),
        }
    }
}

fn into_rows(groups: IndexMap<String, GroupTally>) -> Vec<BreakdownRow> {
    groups
        .into_iter()
        .map(|(key, tally)| tally.into_row(key))
        .collect()
}

fn status_counts(status: &str, counts: &mut StatusCounts) {
    let status = status.to_lowercase();
    if status.contains("active") || status.contains("running") {
        counts.active += 1;
    }
    if status.contains("complete") || status.contains("finish") {
        counts.completed += 1;
    }
}

fn detail_row(record: &TestRecord, metrics: &TestMetrics) -> DetailRow {
    DetailRow {
        id: record.id,
        sku: record.sku.clone(),
        product_name: record.product_name.clone(),
        test_type: metrics.test_type,
        category: record.category.clone(),
        designer: record.designer_label().to_string(),
        content_manager: record.content_label().to_string(),
        metric_a: metrics.control_value,
        best_variant: metrics.best_variant(),
        best_value: metrics.leader.leader_value,
        uplift: metrics.leader.leader_uplift,
        goal1: metrics.goal1,
        goal2: metrics.goal2,
        status: record.status.clone(),
        created_at: record.created_at.clone(),
    }
}

/// Rolls already-filtered tests up into KPIs, breakdowns and detail rows.
/// Groups and rows keep input order.
pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a TestRecord>) -> Aggregation {
    let mut kpis = Kpis::default();
    let mut by_designer: IndexMap<String, GroupTally> = IndexMap::new();
    let mut by_content: IndexMap<String, GroupTally> = IndexMap::new();
    let mut by_category: IndexMap<String, GroupTally> = IndexMap::new();
    let mut rows = Vec::new();

    for record in records {
        let metrics = TestMetrics::compute(record);

        kpis.total_tests += 1;
        kpis.by_type.bump(metrics.test_type);
        kpis.total_prepared += metrics.prepared_variants;
        kpis.winners += usize::from(metrics.winner);
        kpis.goal1_reached += usize::from(metrics.goal1_reached);
        kpis.goal2_reached += usize::from(metrics.goal2_reached);
        kpis.strong_wins += usize::from(metrics.is_strong_win());
        status_counts(&record.status, &mut kpis.status);

        let quality = &mut kpis.data_quality;
        quality.missing_a += usize::from(metrics.control_value <= 0.0);
        quality.missing_metrics += usize::from(!metrics.has_any_metric);
        quality.missing_images += usize::from(!metrics.control_has_image);

        by_designer
            .entry(record.designer_label().to_string())
            .or_default()
            .add(&metrics);
        by_content
            .entry(record.content_label().to_string())
            .or_default()
            .add(&metrics);
        by_category
            .entry(record.category_label().to_string())
            .or_default()
            .add(&metrics);

        rows.push(detail_row(record, &metrics));
    }

    let total = kpis.total_tests;
    kpis.avg_prepared = if total == 0 {
        0.0
    } else {
        kpis.total_prepared as f64 / total as f64
    };
    kpis.winners_share = share(kpis.winners, total);
    kpis.goal1_share = share(kpis.goal1_reached, total);
    kpis.goal2_share = share(kpis.goal2_reached, total);
    kpis.strong_win_share = share(kpis.strong_wins, total);

    Aggregation {
        kpis,
        breakdowns: Breakdowns {
            by_designer: into_rows(by_designer),
            by_content: into_rows(by_content),
            by_category: into_rows(by_category),
        },
        rows,
    }
}

// ── Filter options ──────────────────────────────────────────────────

fn dedup<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<IndexSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Names of active directory users whose role matches, or `None` when no
/// user has such a role.
fn role_names(directory: &Directory, role_matches: impl Fn(&str) -> bool) -> Option<Vec<String>> {
    let people: Vec<_> = directory
        .active_users()
        .filter(|u| role_matches(&u.role_lowercase()))
        .collect();
    if people.is_empty() {
        return None;
    }
    Some(dedup(people.iter().filter_map(|p| p.display_name())))
}

/// Dropdown values for the dashboard. People come from the directory by
/// role and fall back to the names seen on the filtered tests.
pub fn filter_options(filtered: &[&TestRecord], directory: &Directory) -> FilterOptions {
    let designers = role_names(directory, |role| role.contains("designer"))
        .unwrap_or_else(|| dedup(filtered.iter().filter_map(|t| t.designer())));
    let content_managers = role_names(directory, |role| {
        role.contains("content") || role.contains("контент")
    })
    .unwrap_or_else(|| dedup(filtered.iter().filter_map(|t| t.content_owner())));

    let categories = dedup(
        filtered
            .iter()
            .map(|t| t.category.as_str())
            .chain(directory.products.iter().filter_map(|p| p.category.as_deref())),
    );
    let platforms = dedup(filtered.iter().map(|t| t.platform.as_str()));

    FilterOptions {
        categories,
        designers,
        content_managers,
        platforms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::config::MISSING_LABEL;
    use crate::types::{Person, ProductRef};
    use crate::variants::VariantKey;
    use serde_json::{json, Value};

    fn test(designer: Option<&str>, winner: Value, variants: Value) -> TestRecord {
        TestRecord {
            designer_gen: designer.map(str::to_string),
            winner,
            variants,
            category: "Shoes".to_string(),
            platform: "WB".to_string(),
            test_type: "CTR".to_string(),
            ..Default::default()
        }
    }

    fn person(name: &str, role: &str, active: bool) -> Person {
        Person {
            name: Some(name.to_string()),
            username: None,
            role: Some(role.to_string()),
            is_active: active,
        }
    }

    #[test]
    fn designer_win_rate_counts_winners() {
        let tests = [
            test(Some("Ann"), json!("B"), Value::Null),
            test(Some("Ann"), Value::Null, Value::Null),
        ];
        let agg = aggregate(&tests);
        let ann = agg.breakdowns.designer("Ann").unwrap();
        assert_eq!(ann.tests, 2);
        assert_eq!(ann.winners, 1);
        assert_eq!(ann.win_rate, 50.0);
        assert_eq!(agg.kpis.winners, 1);
        assert_eq!(agg.kpis.winners_share, 50.0);
    }

    #[test]
    fn blank_names_share_the_placeholder_bucket() {
        let mut no_content = test(Some("  "), Value::Null, Value::Null);
        no_content.category = " ".to_string();
        let tests = [no_content, test(None, Value::Null, Value::Null)];
        let agg = aggregate(&tests);
        assert_eq!(agg.breakdowns.by_designer.len(), 1);
        assert_eq!(agg.breakdowns.designer(MISSING_LABEL).unwrap().tests, 2);
        assert_eq!(agg.breakdowns.content(MISSING_LABEL).unwrap().tests, 2);
        assert_eq!(agg.breakdowns.category(MISSING_LABEL).unwrap().tests, 1);
        assert_eq!(agg.breakdowns.category("Shoes").unwrap().tests, 1);
    }

    #[test]
    fn kpis_cover_goals_strength_and_quality() {
        let mut strong = test(
            Some("Ann"),
            Value::Null,
            json!({"A": {"ctr": 10, "assets": {"images": ["a.jpg"]}}, "B": {"ctr": 13}}),
        );
        strong.vois_benchmark = Some(12.5);
        strong.status = "Running".to_string();
        let mut weak = test(Some("Bob"), Value::Null, json!({"B": {"cr": 2}}));
        weak.test_type = "cr".to_string();
        weak.status = "completed".to_string();
        let empty = test(Some("Bob"), Value::Null, Value::Null);

        let agg = aggregate(&[strong, weak, empty]);
        let k = &agg.kpis;
        assert_eq!(k.total_tests, 3);
        assert_eq!((k.by_type.ctr, k.by_type.cr, k.by_type.rich), (2, 1, 0));
        assert_eq!(k.total_prepared, 2);
        assert!((k.avg_prepared - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(k.goal1_reached, 1);
        assert_eq!(k.goal2_reached, 1);
        assert_eq!(k.strong_wins, 1);
        assert_eq!((k.status.active, k.status.completed), (1, 1));
        assert_eq!(k.data_quality.missing_a, 2);
        assert_eq!(k.data_quality.missing_metrics, 1);
        assert_eq!(k.data_quality.missing_images, 2);

        let bob = agg.breakdowns.designer("Bob").unwrap();
        assert_eq!((bob.tests, bob.variants, bob.goal1), (2, 1, 0));
    }

    #[test]
    fn cr_rows_compare_b_against_a() {
        let mut weak = test(None, Value::Null, json!({"A": {"cr": 2}, "B": {"cr": 3}}));
        weak.test_type = "CR".to_string();
        let agg = aggregate(&[weak]);
        assert_eq!(agg.kpis.by_type.cr, 1);
        assert_eq!(agg.rows[0].best_variant, VariantKey::B);
        assert!((agg.rows[0].uplift - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rows_default_best_variant_to_control() {
        let agg = aggregate(&[test(None, Value::Null, json!({"A": {"ctr": 5}}))]);
        let row = &agg.rows[0];
        assert_eq!(row.best_variant, VariantKey::A);
        assert_eq!(row.metric_a, 5.0);
        assert_eq!(row.best_value, 0.0);
        assert_eq!(row.uplift, 0.0);
        assert!((row.goal1 - 6.0).abs() < 1e-9);
        assert_eq!(row.designer, MISSING_LABEL);
    }

    #[test]
    fn empty_collection_has_zero_shares() {
        let none: Vec<TestRecord> = Vec::new();
        let agg = aggregate(&none);
        assert_eq!(agg.kpis.total_tests, 0);
        assert_eq!(agg.kpis.avg_prepared, 0.0);
        assert_eq!(agg.kpis.winners_share, 0.0);
        assert!(agg.rows.is_empty());
        assert!(agg.breakdowns.by_category.is_empty());
    }

    #[test]
    fn options_prefer_directory_roles() {
        let directory = Directory {
            users: vec![
                person("Ann", "Senior Designer", true),
                person("Old", "designer", false),
                person("Kate", "Контент-менеджер", true),
            ],
            products: vec![
                ProductRef {
                    category: Some("Bags".to_string()),
                },
                ProductRef {
                    category: Some("Shoes".to_string()),
                },
            ],
        };
        let a = test(Some("Zed"), Value::Null, Value::Null);
        let options = filter_options(&[&a], &directory);
        assert_eq!(options.designers, vec!["Ann"]);
        assert_eq!(options.content_managers, vec!["Kate"]);
        assert_eq!(options.categories, vec!["Shoes", "Bags"]);
        assert_eq!(options.platforms, vec!["WB"]);
    }

    #[test]
    fn options_fall_back_to_names_on_tests() {
        let mut a = test(Some("Zed"), Value::Null, Value::Null);
        a.content_manager = Some("Kim".to_string());
        let b = test(Some("Zed"), Value::Null, Value::Null);
        let options = filter_options(&[&a, &b], &Directory::default());
        assert_eq!(options.designers, vec!["Zed"]);
        assert_eq!(options.content_managers, vec!["Kim"]);
    }
}
