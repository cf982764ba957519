//! Canonical shape of a test's creative/metrics blob.
//!
//! A [`VariantDocument`] always carries all five slots A..E. Fields this crate
//! does not interpret are kept in flattened `extra`/`fields` maps so a
//! load-normalize-store cycle never drops data.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::AbtrackError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKey {
    A,
    B,
    C,
    D,
    E,
}

impl VariantKey {
    /// Fixed slot order. Position doubles as the index into legacy flat image arrays.
    pub const ALL: [VariantKey; 5] = [
        VariantKey::A,
        VariantKey::B,
        VariantKey::C,
        VariantKey::D,
        VariantKey::E,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKey::A => "A",
            VariantKey::B => "B",
            VariantKey::C => "C",
            VariantKey::D => "D",
            VariantKey::E => "E",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            VariantKey::A => 0,
            VariantKey::B => 1,
            VariantKey::C => 2,
            VariantKey::D => 3,
            VariantKey::E => 4,
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantKey {
    type Err = AbtrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(VariantKey::A),
            "B" => Ok(VariantKey::B),
            "C" => Ok(VariantKey::C),
            "D" => Ok(VariantKey::D),
            "E" => Ok(VariantKey::E),
            _ => Err(AbtrackError::UnknownVariant(s.to_string())),
        }
    }
}

// ── AI results ──────────────────────────────────────────────────────

/// One AI result as produced by the insight generator.
///
/// Free-text commentary and structured hypotheses are told apart where they
/// are produced (see [`AiResult::from_model_output`]), not by re-sniffing
/// stored strings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum AiResult {
    Text(String),
    Structured(Value),
}

impl AiResult {
    /// Classifies raw model output: text that parses as a JSON object or array
    /// becomes `Structured`, anything else stays `Text`.
    pub fn from_model_output(text: &str) -> Self {
        match super::normalize::try_parse_json(text) {
            Some(parsed) => AiResult::Structured(parsed),
            None => AiResult::Text(text.to_string()),
        }
    }

    /// Stored value to result; `null` means "no result".
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            other => Some(Self::from_stored(other)),
        }
    }

    pub(crate) fn from_stored(value: Value) -> Self {
        match value {
            Value::String(text) => AiResult::Text(text),
            other => AiResult::Structured(other),
        }
    }

    /// A structured JSON string is plain text; stored documents read it back
    /// as `Text`, so results are folded the same way before they are kept.
    pub fn canonical(self) -> Self {
        match self {
            AiResult::Structured(Value::String(text)) => AiResult::Text(text),
            other => other,
        }
    }

    /// Blank text carries nothing worth archiving; structured values always do.
    pub fn has_content(&self) -> bool {
        match self {
            AiResult::Text(text) => !text.trim().is_empty(),
            AiResult::Structured(value) => !value.is_null(),
        }
    }

    /// Display string for the denormalized `insight` field. Structured values
    /// are emitted as compact JSON, which `try_parse_json` accepts back.
    pub fn insight_text(&self) -> String {
        match self {
            AiResult::Text(text) | AiResult::Structured(Value::String(text)) => text.clone(),
            AiResult::Structured(value) => value.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            AiResult::Text(text) => Value::String(text.clone()),
            AiResult::Structured(value) => value.clone(),
        }
    }
}

/// Archived AI result. `timestamp` is `"YYYY-MM-DD HH:MM"` local time, or
/// `None` for entries migrated from storage that never recorded one.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AiHistoryEntry {
    pub timestamp: Option<String>,
    pub value: AiResult,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AiHistoryEntry {
    pub fn new(timestamp: impl Into<String>, value: AiResult) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            value,
            extra: Map::new(),
        }
    }

    /// Reads a persisted history item. Objects carrying both `timestamp` and
    /// `value` are already wrapped; anything else becomes the value of an
    /// unstamped entry.
    pub(crate) fn from_raw(raw: Value) -> Self {
        match raw {
            Value::Object(mut map) if map.contains_key("timestamp") && map.contains_key("value") => {
                let timestamp = match map.remove("timestamp") {
                    Some(Value::String(s)) => Some(s),
                    Some(Value::Null) | None => None,
                    Some(other) => Some(other.to_string()),
                };
                let value = AiResult::from_stored(map.remove("value").unwrap_or(Value::Null));
                Self {
                    timestamp,
                    value,
                    extra: map,
                }
            }
            other => Self {
                timestamp: None,
                value: AiResult::from_stored(other),
                extra: Map::new(),
            },
        }
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct AiState {
    pub latest: Option<AiResult>,
    pub history: Vec<AiHistoryEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Variants ────────────────────────────────────────────────────────

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct VariantAssets {
    /// Only the first entry is "the" image for the slot; the rest are kept
    /// but unused.
    pub images: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct Variant {
    pub assets: VariantAssets,
    /// Metric values (`ctr`, `cr`, ...) and any other per-slot fields, as stored.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Variant {
    pub fn image(&self) -> Option<&str> {
        self.assets.images.first().map(String::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct DocumentAssets {
    /// Derived view: slot -> first image. Rebuilt from the slots, never edited alone.
    pub images: BTreeMap<VariantKey, String>,
    pub insight: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct VariantDocument {
    #[serde(rename = "A")]
    pub a: Variant,
    #[serde(rename = "B")]
    pub b: Variant,
    #[serde(rename = "C")]
    pub c: Variant,
    #[serde(rename = "D")]
    pub d: Variant,
    #[serde(rename = "E")]
    pub e: Variant,
    pub assets: DocumentAssets,
    pub insight: String,
    pub ai: AiState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VariantDocument {
    pub fn variant(&self, key: VariantKey) -> &Variant {
        match key {
            VariantKey::A => &self.a,
            VariantKey::B => &self.b,
            VariantKey::C => &self.c,
            VariantKey::D => &self.d,
            VariantKey::E => &self.e,
        }
    }

    pub fn variant_mut(&mut self, key: VariantKey) -> &mut Variant {
        match key {
            VariantKey::A => &mut self.a,
            VariantKey::B => &mut self.b,
            VariantKey::C => &mut self.c,
            VariantKey::D => &mut self.d,
            VariantKey::E => &mut self.e,
        }
    }

    pub fn variants(&self) -> impl Iterator<Item = (VariantKey, &Variant)> {
        VariantKey::ALL.into_iter().map(move |key| (key, self.variant(key)))
    }

    pub fn has_any_image(&self) -> bool {
        self.variants().any(|(_, v)| v.image().is_some())
    }

    pub(crate) fn rebuild_image_map(&mut self) {
        let images = VariantKey::ALL
            .into_iter()
            .filter_map(|key| {
                self.variant(key)
                    .image()
                    .map(|url| (key, url.to_string()))
            })
            .collect();
        self.assets.images = images;
    }

    pub(crate) fn set_insight(&mut self, text: String) {
        self.assets.insight = text.clone();
        self.insight = text;
    }

    /// Storage form of the document.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Deserializing always runs the legacy migration, so a `VariantDocument`
/// read from storage is canonical no matter which convention wrote it.
impl<'de> Deserialize<'de> for VariantDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(super::normalize::normalize(&raw, None))
    }
}
