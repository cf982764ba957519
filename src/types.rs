//! Records handed over by the persistence layer.
//!
//! Rows come from a loosely-typed store, so every field tolerates `null`,
//! and numeric columns also accept hand-entered text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::lab::config::{TestType, MISSING_LABEL};
use crate::lab::stats::parse_metric;
use crate::variants::normalize::is_truthy;
use crate::variants::{normalize, VariantDocument};

fn null_to_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => s,
            _ => String::new(),
        })
        .collect())
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => Some(parse_metric(&other)),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn strict_true<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn first_non_blank<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Assignees {
    #[serde(deserialize_with = "lenient_text")]
    pub designer: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub content_manager: Option<String>,
}

/// Which screens a test shows up on. Only an explicit `true` counts.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Visibility {
    #[serde(deserialize_with = "strict_true")]
    pub lab: bool,
    #[serde(deserialize_with = "strict_true")]
    pub base: bool,
    #[serde(deserialize_with = "strict_true")]
    pub kanban: bool,
}

/// One A/B test row.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TestRecord {
    #[serde(deserialize_with = "null_to_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_to_default")]
    pub sku: String,
    #[serde(deserialize_with = "null_to_default")]
    pub product_name: String,
    #[serde(deserialize_with = "null_to_default")]
    pub category: String,
    #[serde(deserialize_with = "null_to_default")]
    pub platform: String,
    #[serde(deserialize_with = "null_to_default")]
    pub test_type: String,
    #[serde(deserialize_with = "null_to_default")]
    pub status: String,
    #[serde(alias = "created_at", deserialize_with = "lenient_text")]
    pub created_at: Option<String>,
    /// Legacy flat image list, positionally A..E.
    #[serde(deserialize_with = "lenient_string_list")]
    pub images: Vec<String>,
    /// Raw variants blob, in whatever convention wrote it.
    pub variants: Value,
    pub winner: Value,
    #[serde(deserialize_with = "lenient_number")]
    pub target_multiplier: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub vois_benchmark: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub metric_goal: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub designer_gen: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub content_manager: Option<String>,
    #[serde(deserialize_with = "null_to_default")]
    pub assignees: Assignees,
    #[serde(deserialize_with = "null_to_default")]
    pub visibility: Visibility,
}

impl TestRecord {
    pub fn kind(&self) -> TestType {
        TestType::classify(&self.test_type)
    }

    /// Canonical variants, with the legacy flat image list as fallback.
    pub fn variant_document(&self) -> VariantDocument {
        normalize(&self.variants, Some(&self.images))
    }

    pub fn is_lab_member(&self) -> bool {
        self.visibility.lab
    }

    /// Any truthy `winner` value marks the test as won.
    pub fn has_winner(&self) -> bool {
        is_truthy(&self.winner)
    }

    pub fn designer(&self) -> Option<&str> {
        first_non_blank(&[
            self.designer_gen.as_deref(),
            self.assignees.designer.as_deref(),
        ])
    }

    pub fn content_owner(&self) -> Option<&str> {
        first_non_blank(&[
            self.content_manager.as_deref(),
            self.assignees.content_manager.as_deref(),
        ])
    }

    pub fn designer_label(&self) -> &str {
        self.designer().unwrap_or(MISSING_LABEL)
    }

    pub fn content_label(&self) -> &str {
        self.content_owner().unwrap_or(MISSING_LABEL)
    }

    pub fn category_label(&self) -> &str {
        first_non_blank(&[Some(self.category.as_str())]).unwrap_or(MISSING_LABEL)
    }

    /// Creation time, if present and readable.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Accepts RFC 3339, Postgres-style `YYYY-MM-DD HH:MM:SS[.f][+TZ]`, naive
/// date-times (read as UTC), bare dates, and epoch milliseconds.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    text.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

pub fn parse_test_records(json: &str) -> Result<Vec<TestRecord>> {
    Ok(serde_json::from_str(json)?)
}

// ── Directory ───────────────────────────────────────────────────────

fn default_active() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub role: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Person {
    pub fn display_name(&self) -> Option<&str> {
        first_non_blank(&[self.name.as_deref(), self.username.as_deref()])
    }

    pub fn role_lowercase(&self) -> String {
        self.role.as_deref().unwrap_or_default().to_lowercase()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ProductRef {
    #[serde(deserialize_with = "lenient_text")]
    pub category: Option<String>,
}

/// People and catalog entries used to populate report filter options.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Directory {
    pub users: Vec<Person>,
    pub products: Vec<ProductRef>,
}

impl Directory {
    pub fn active_users(&self) -> impl Iterator<Item = &Person> {
        self.users.iter().filter(|u| u.is_active)
    }
}

pub fn parse_directory(json: &str) -> Result<Directory> {
    Ok(serde_json::from_str(json)?)
}
