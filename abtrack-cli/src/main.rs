use std::path::{Path, PathBuf};
use std::process::ExitCode;

use abtrack::lab::{ai_ready, ai_scan_images, test_progress};
use abtrack::report::{DateRange, ReportQuery};
use abtrack::types::{parse_directory, parse_test_records, Directory, TestRecord};
use abtrack::variants::needs_legacy_backfill;
use abtrack::{
    append_ai_history, build_lab_report, normalize, set_variant_image, set_variant_metric,
    AbtrackError, AiResult, TestMetrics, VariantDocument, VariantKey,
};
use chrono::{DateTime, Utc};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "abtrack", about = "A/B test variant documents and lab reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the canonical form of a stored variants blob
    Normalize {
        #[arg(long, env = "ABTRACK_INPUT")]
        input: PathBuf,
        /// Legacy flat image list, positionally A..E
        #[arg(long, value_delimiter = ',')]
        legacy_images: Vec<String>,
    },
    /// Set the primary image of one variant (an empty URL clears it)
    SetImage {
        #[arg(long, env = "ABTRACK_INPUT")]
        input: PathBuf,
        #[arg(long)]
        variant: VariantKey,
        #[arg(long, default_value = "")]
        url: String,
    },
    /// Record a metric value on one variant
    SetMetric {
        #[arg(long, env = "ABTRACK_INPUT")]
        input: PathBuf,
        #[arg(long)]
        variant: VariantKey,
        #[arg(long)]
        metric: String,
        #[arg(long, allow_hyphen_values = true)]
        value: String,
    },
    /// Append raw model output as the latest AI result
    AppendInsight {
        #[arg(long, env = "ABTRACK_INPUT")]
        input: PathBuf,
        #[arg(long)]
        text: String,
    },
    /// Per-test metrics and per-variant goal progress for one test record
    Inspect {
        #[arg(long, env = "ABTRACK_INPUT")]
        input: PathBuf,
    },
    /// Lab dashboard report over a JSON array of test records
    Report {
        #[arg(long, env = "ABTRACK_INPUT")]
        input: PathBuf,
        #[arg(long, env = "ABTRACK_DIRECTORY")]
        directory: Option<PathBuf>,
        /// 7d, 30d, 90d; anything else means all time
        #[arg(long, default_value = "all")]
        date_range: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        test_type: Option<String>,
        #[arg(long)]
        designer: Option<String>,
        #[arg(long)]
        content_manager: Option<String>,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        sku: Option<String>,
        /// Report clock as RFC 3339; defaults to the current time
        #[arg(long, env = "ABTRACK_NOW")]
        now: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    init_tracing();

    match run(cli.command) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(command: Command) -> abtrack::Result<String> {
    let output = match command {
        Command::Normalize {
            input,
            legacy_images,
        } => {
            let raw = read_json(&input)?;
            let legacy = (!legacy_images.is_empty()).then_some(legacy_images.as_slice());
            if legacy.is_some_and(|images| needs_legacy_backfill(&raw, images)) {
                tracing::info!(
                    "[normalize] {} only has images in the legacy list; persist the normalized form",
                    input.display()
                );
            }
            normalize(&raw, legacy).to_value()
        }
        Command::SetImage {
            input,
            variant,
            url,
        } => set_variant_image(&read_document(&input)?, variant, &url).to_value(),
        Command::SetMetric {
            input,
            variant,
            metric,
            value,
        } => {
            let metric = metric.trim();
            if metric.is_empty() {
                return Err(AbtrackError::InvalidInput(
                    "--metric cannot be empty".to_string(),
                ));
            }
            set_variant_metric(&read_document(&input)?, variant, metric, metric_input(value))
                .to_value()
        }
        Command::AppendInsight { input, text } => {
            append_ai_history(&read_document(&input)?, AiResult::from_model_output(&text))
                .to_value()
        }
        Command::Inspect { input } => {
            let record: TestRecord = serde_json::from_value(read_json(&input)?)?;
            inspect(&record)
        }
        Command::Report {
            input,
            directory,
            date_range,
            category,
            test_type,
            designer,
            content_manager,
            platform,
            sku,
            now,
        } => {
            let tests = parse_test_records(&read_text(&input)?)?;
            let directory = match directory {
                Some(path) => parse_directory(&read_text(&path)?)?,
                None => Directory::default(),
            };
            let query = ReportQuery {
                date_range: DateRange::parse(&date_range),
                category,
                test_type,
                designer,
                content_manager,
                sku,
                platform,
            };
            let now = resolve_now(now.as_deref())?;
            serde_json::to_value(build_lab_report(&tests, &directory, &query, now))?
        }
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn read_text(path: &Path) -> abtrack::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AbtrackError::Io(format!("{}: {}", path.display(), e)))
}

fn read_json(path: &Path) -> abtrack::Result<Value> {
    Ok(serde_json::from_str(&read_text(path)?)?)
}

fn read_document(path: &Path) -> abtrack::Result<VariantDocument> {
    Ok(normalize(&read_json(path)?, None))
}

/// Numbers are stored as numbers, anything else as the text entered.
fn metric_input(value: String) -> Value {
    match serde_json::from_str::<Value>(value.trim()) {
        Ok(number @ Value::Number(_)) => number,
        _ => Value::String(value),
    }
}

fn resolve_now(now: Option<&str>) -> abtrack::Result<DateTime<Utc>> {
    match now {
        None => Ok(Utc::now()),
        Some(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AbtrackError::InvalidInput(format!("--now {:?}: {}", text, e))),
    }
}

fn inspect(record: &TestRecord) -> Value {
    let doc = record.variant_document();
    let test_type = record.kind();
    let scan: Vec<Value> = ai_scan_images(&doc, test_type)
        .into_iter()
        .map(|(variant, url)| json!({ "variant": variant, "url": url }))
        .collect();

    json!({
        "id": record.id,
        "metrics": TestMetrics::from_document(&doc, record),
        "progress": test_progress(record),
        "aiReady": ai_ready(&doc, test_type),
        "aiScanImages": scan,
        "needsLegacyBackfill": needs_legacy_backfill(&record.variants, &record.images),
    })
}
