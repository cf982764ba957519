use abtrack::report::{build_lab_report, DateRange, ReportQuery, MISSING_CREATED_AT_WARNING};
use abtrack::types::{parse_directory, parse_test_records};
use abtrack::{Directory, TestRecord, VariantKey};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn fixture() -> Vec<TestRecord> {
    let tests = json!([
        {
            "id": 12,
            "sku": "SHOE-001",
            "productName": "Runner",
            "category": "Shoes",
            "platform": "WB",
            "testType": "CTR",
            "status": "Running",
            "createdAt": "2025-06-10T09:00:00Z",
            "designerGen": "Ann",
            "contentManager": "Kate",
            "winner": "B",
            "targetMultiplier": "1,1",
            "voisBenchmark": 4.0,
            "images": ["a.jpg", "b.jpg"],
            "variants": "{\"A\": {\"ctr\": \"3,2\"}, \"B\": {\"ctr\": 4.1}, \"C\": {\"ctr\": 3.3}}",
            "visibility": {"lab": true}
        },
        {
            "id": 11,
            "sku": "SHOE-002",
            "category": "Shoes",
            "platform": "Ozon",
            "testType": "cr",
            "status": "completed",
            "created_at": "2025-05-01 08:00:00",
            "assignees": {"designer": "Ann", "contentManager": null},
            "winner": null,
            "variants": {"A": {"cr": 2}, "B": {"cr": 2.1}, "E": {"cr": 9}},
            "visibility": {"lab": true, "kanban": true}
        },
        {
            "id": 10,
            "sku": "BAG-1",
            "category": "Bags",
            "platform": "WB",
            "testType": "РИЧ",
            "status": "draft",
            "createdAt": null,
            "designerGen": "Bob",
            "variants": null,
            "visibility": {"lab": true}
        },
        {
            "id": 9,
            "sku": "SHOE-003",
            "category": "Shoes",
            "designerGen": "Ann",
            "winner": true,
            "visibility": {"base": true}
        }
    ]);
    parse_test_records(&tests.to_string()).unwrap()
}

#[test]
fn unfiltered_report_rolls_up_lab_tests() {
    let report = build_lab_report(
        &fixture(),
        &Directory::default(),
        &ReportQuery::default(),
        now(),
    );
    let k = &report.kpis;
    assert!(report.warnings.is_empty());
    assert_eq!(k.total_tests, 3);
    assert_eq!((k.by_type.ctr, k.by_type.cr, k.by_type.rich), (1, 1, 1));
    assert_eq!(k.total_prepared, 3);
    assert!((k.avg_prepared - 1.0).abs() < 1e-9);
    assert_eq!((k.status.active, k.status.completed), (1, 1));
    assert_eq!(k.winners, 1);
    assert_eq!(k.goal1_reached, 1);
    assert_eq!(k.goal2_reached, 1);
    assert_eq!(k.strong_wins, 1);
    assert_eq!(k.data_quality.missing_a, 1);
    assert_eq!(k.data_quality.missing_metrics, 1);
    assert_eq!(k.data_quality.missing_images, 2);

    let ann = report.breakdowns.designer("Ann").unwrap();
    assert_eq!((ann.tests, ann.variants, ann.winners), (2, 3, 1));
    assert_eq!(ann.win_rate, 50.0);
    assert_eq!(report.breakdowns.designer("Bob").unwrap().win_rate, 0.0);
    assert_eq!(report.breakdowns.content("—").unwrap().tests, 2);
    assert_eq!(report.breakdowns.category("Shoes").unwrap().tests, 2);

    let ids: Vec<i64> = report.rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![12, 11, 10]);
}

#[test]
fn rows_carry_leader_and_goals() {
    let report = build_lab_report(
        &fixture(),
        &Directory::default(),
        &ReportQuery::default(),
        now(),
    );
    let ctr = &report.rows[0];
    assert_eq!(ctr.metric_a, 3.2);
    assert_eq!(ctr.best_variant, VariantKey::B);
    assert_eq!(ctr.best_value, 4.1);
    assert!((ctr.goal1 - 3.52).abs() < 1e-9);
    assert_eq!(ctr.goal2, 4.0);
    assert!((ctr.uplift - 0.28125).abs() < 1e-9);
    assert_eq!(ctr.designer, "Ann");
    assert_eq!(ctr.content_manager, "Kate");

    let cr = &report.rows[1];
    assert_eq!(cr.best_variant, VariantKey::B);
    assert_eq!(cr.best_value, 2.1);
    assert_eq!(cr.created_at.as_deref(), Some("2025-05-01 08:00:00"));

    let rich = &report.rows[2];
    assert_eq!(rich.best_variant, VariantKey::A);
    assert_eq!(rich.best_value, 0.0);
    assert_eq!(rich.created_at, None);
}

#[test]
fn bounded_range_drops_old_and_undated_tests() {
    let query = ReportQuery {
        date_range: DateRange::Last30Days,
        ..Default::default()
    };
    let report = build_lab_report(&fixture(), &Directory::default(), &query, now());
    assert_eq!(report.warnings, vec![MISSING_CREATED_AT_WARNING.to_string()]);
    assert_eq!(report.kpis.total_tests, 1);
    assert_eq!(report.rows[0].id, 12);

    let wide = ReportQuery {
        date_range: DateRange::Last90Days,
        ..Default::default()
    };
    let report = build_lab_report(&fixture(), &Directory::default(), &wide, now());
    assert_eq!(report.kpis.total_tests, 2);
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn equality_and_substring_filters_combine() {
    let query: ReportQuery = serde_json::from_value(json!({
        "category": "Shoes",
        "designer": " Ann ",
        "skuSearch": "shoe",
        "platform": "Ozon"
    }))
    .unwrap();
    let report = build_lab_report(&fixture(), &Directory::default(), &query, now());
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].id, 11);
    assert_eq!(report.filters.designer, "Ann");
    assert_eq!(report.filters.platform, "Ozon");
    assert_eq!(report.options.platforms, vec!["Ozon"]);
}

#[test]
fn test_type_filter_matches_classified_types() {
    let rich = ReportQuery {
        test_type: Some("rich".to_string()),
        ..Default::default()
    };
    let report = build_lab_report(&fixture(), &Directory::default(), &rich, now());
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].id, 10);
    assert_eq!(report.filters.test_type, "RICH");

    let unknown = ReportQuery {
        test_type: Some("banner".to_string()),
        ..Default::default()
    };
    let report = build_lab_report(&fixture(), &Directory::default(), &unknown, now());
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].id, 12);
}

#[test]
fn options_merge_directory_and_tests() {
    let directory = parse_directory(
        &json!({
            "users": [
                {"name": "Ann", "role": "designer"},
                {"username": "carl", "role": "Lead Designer"},
                {"name": "Gone", "role": "designer", "isActive": false},
                {"name": "Kate", "role": "content"}
            ],
            "products": [{"category": "Hats"}, {"category": "Shoes"}, {"category": null}]
        })
        .to_string(),
    )
    .unwrap();
    let report = build_lab_report(&fixture(), &directory, &ReportQuery::default(), now());
    assert_eq!(report.options.designers, vec!["Ann", "carl"]);
    assert_eq!(report.options.content_managers, vec!["Kate"]);
    assert_eq!(report.options.categories, vec!["Shoes", "Bags", "Hats"]);
    assert_eq!(report.options.platforms, vec!["WB", "Ozon"]);
}

#[test]
fn empty_input_yields_zeroed_report() {
    let report = build_lab_report(&[], &Directory::default(), &ReportQuery::default(), now());
    assert_eq!(report.kpis.total_tests, 0);
    assert_eq!(report.kpis.winners_share, 0.0);
    assert!(report.rows.is_empty());
    assert!(report.options.designers.is_empty());
    assert_eq!(report.filters.date_range, "all");
}
