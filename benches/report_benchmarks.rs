use abtrack::report::{build_lab_report, DateRange, ReportQuery};
use abtrack::types::{Assignees, Visibility};
use abtrack::{normalize, Directory, TestRecord};
use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

const DESIGNERS: [&str; 4] = ["Ann", "Bob", "", "Kate"];
const CATEGORIES: [&str; 3] = ["Shoes", "Bags", "Hats"];
const TYPES: [&str; 3] = ["CTR", "CR", "RICH"];

fn build_tests(n: usize) -> Vec<TestRecord> {
    (0..n)
        .map(|i| TestRecord {
            id: i as i64,
            sku: format!("SKU-{i:05}"),
            category: CATEGORIES[i % CATEGORIES.len()].to_string(),
            platform: if i % 2 == 0 { "WB" } else { "Ozon" }.to_string(),
            test_type: TYPES[i % TYPES.len()].to_string(),
            status: "running".to_string(),
            created_at: Some(format!("2025-05-{:02}T10:00:00Z", 1 + i % 28)),
            images: vec![format!("legacy-{i}.jpg")],
            variants: json!({
                "A": {"ctr": format!("{},{}", 2 + i % 5, i % 10), "cr": 1.5},
                "B": {"ctr": 3.1 + (i % 7) as f64 * 0.1, "cr": "1,7"},
                "C": {"ctr": 2.9, "assets": {"images": [format!("c-{i}.jpg")]}},
                "assets": {"images": {"B": format!("b-{i}.jpg")}}
            })
            .to_string()
            .into(),
            winner: if i % 3 == 0 { json!("B") } else { json!(null) },
            vois_benchmark: Some(3.0),
            assignees: Assignees {
                designer: Some(DESIGNERS[i % DESIGNERS.len()].to_string()),
                content_manager: None,
            },
            visibility: Visibility {
                lab: i % 10 != 0,
                ..Default::default()
            },
            ..Default::default()
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let tests = build_tests(1);
    let raw = &tests[0].variants;
    let legacy = &tests[0].images;
    c.bench_function("normalize_legacy_blob", |b| {
        b.iter(|| normalize(black_box(raw), Some(black_box(legacy.as_slice()))))
    });
}

fn bench_report(c: &mut Criterion) {
    let tests = build_tests(5_000);
    let directory = Directory::default();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let all = ReportQuery::default();
    let filtered = ReportQuery {
        date_range: DateRange::Last30Days,
        category: Some("Shoes".to_string()),
        sku: Some("sku-0".to_string()),
        ..Default::default()
    };

    c.bench_function("lab_report_5k_all", |b| {
        b.iter(|| build_lab_report(black_box(&tests), &directory, &all, now))
    });
    c.bench_function("lab_report_5k_filtered", |b| {
        b.iter(|| build_lab_report(black_box(&tests), &directory, &filtered, now))
    });
}

criterion_group!(benches, bench_normalize, bench_report);
criterion_main!(benches);
