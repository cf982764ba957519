use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::AppliedFilters;
use crate::lab::config::TestType;
use crate::types::TestRecord;

/// Creation-date window. Unknown values mean "no limit".
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum DateRange {
    #[default]
    All,
    Last7Days,
    Last30Days,
    Last90Days,
}

impl DateRange {
    pub fn parse(raw: &str) -> DateRange {
        match raw.trim() {
            "7d" => DateRange::Last7Days,
            "30d" => DateRange::Last30Days,
            "90d" => DateRange::Last90Days,
            _ => DateRange::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::All => "all",
            DateRange::Last7Days => "7d",
            DateRange::Last30Days => "30d",
            DateRange::Last90Days => "90d",
        }
    }

    pub fn days(&self) -> Option<i64> {
        match self {
            DateRange::All => None,
            DateRange::Last7Days => Some(7),
            DateRange::Last30Days => Some(30),
            DateRange::Last90Days => Some(90),
        }
    }

    /// Earliest creation time still inside the window.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().map(|days| now - Duration::days(days))
    }
}

impl From<String> for DateRange {
    fn from(raw: String) -> Self {
        DateRange::parse(&raw)
    }
}

impl From<DateRange> for String {
    fn from(range: DateRange) -> Self {
        range.as_str().to_string()
    }
}

/// Dashboard filters. Every field is optional; an absent or blank value
/// places no constraint.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportQuery {
    pub date_range: DateRange,
    pub category: Option<String>,
    pub test_type: Option<String>,
    pub designer: Option<String>,
    pub content_manager: Option<String>,
    #[serde(alias = "skuSearch")]
    pub sku: Option<String>,
    pub platform: Option<String>,
}

/// Why a test was left out of the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Exclusion {
    Category,
    TestType,
    Designer,
    ContentManager,
    Sku,
    Platform,
    MissingCreatedAt,
    UnreadableCreatedAt,
    BeforeRange,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ReportQuery {
    pub fn category(&self) -> Option<&str> {
        non_blank(&self.category)
    }

    pub fn designer(&self) -> Option<&str> {
        non_blank(&self.designer)
    }

    pub fn content_manager(&self) -> Option<&str> {
        non_blank(&self.content_manager)
    }

    pub fn sku(&self) -> Option<&str> {
        non_blank(&self.sku)
    }

    pub fn platform(&self) -> Option<&str> {
        non_blank(&self.platform)
    }

    /// A supplied type is classified like stored types, so unknown text
    /// filters for CTR.
    pub fn test_type(&self) -> Option<TestType> {
        non_blank(&self.test_type).map(TestType::classify)
    }

    /// First failing predicate for `record`, or `None` if it passes.
    pub fn exclusion(
        &self,
        record: &TestRecord,
        cutoff: Option<DateTime<Utc>>,
    ) -> Option<Exclusion> {
        if let Some(category) = self.category() {
            if record.category.trim() != category {
                return Some(Exclusion::Category);
            }
        }
        if let Some(test_type) = self.test_type() {
            if record.kind() != test_type {
                return Some(Exclusion::TestType);
            }
        }
        if let Some(designer) = self.designer() {
            if record.designer().unwrap_or_default() != designer {
                return Some(Exclusion::Designer);
            }
        }
        if let Some(content_manager) = self.content_manager() {
            if record.content_owner().unwrap_or_default() != content_manager {
                return Some(Exclusion::ContentManager);
            }
        }
        if let Some(sku) = self.sku() {
            if !record.sku.to_lowercase().contains(&sku.to_lowercase()) {
                return Some(Exclusion::Sku);
            }
        }
        if let Some(platform) = self.platform() {
            if record.platform.trim() != platform {
                return Some(Exclusion::Platform);
            }
        }
        if let Some(cutoff) = cutoff {
            let raw = record.created_at.as_deref().map(str::trim).unwrap_or_default();
            if raw.is_empty() {
                return Some(Exclusion::MissingCreatedAt);
            }
            match record.created_at_utc() {
                None => return Some(Exclusion::UnreadableCreatedAt),
                Some(created) if created < cutoff => return Some(Exclusion::BeforeRange),
                Some(_) => {}
            }
        }
        None
    }

    pub fn applied(&self) -> AppliedFilters {
        AppliedFilters {
            date_range: self.date_range.as_str().to_string(),
            category: self.category().unwrap_or_default().to_string(),
            test_type: self
                .test_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            designer: self.designer().unwrap_or_default().to_string(),
            content_manager: self.content_manager().unwrap_or_default().to_string(),
            sku_search: self.sku().unwrap_or_default().to_string(),
            platform: self.platform().unwrap_or_default().to_string(),
        }
    }
}
