pub mod config;
pub mod metrics;
pub mod stats;

pub use config::{MetricKey, TestType};
pub use metrics::{ai_ready, ai_scan_images, test_progress, variant_progress, TestMetrics, VariantProgress};
pub use stats::{
    calc_goal1, calc_progress, calc_uplift, metric_value, parse_metric, pick_leader, LeaderPick,
};
