//! Legacy migration and edit operations for variant documents.
//!
//! Historical storage conventions that `normalize` folds into the canonical
//! shape:
//! - per-slot `X.assets.images` lists (current)
//! - a slot -> URL map at `assets.images`
//! - the test record's flat `images` array ordered A..E
//! - AI output under `assets.ai.last_json`, `assets.insight` or `ai_mixer_v3`
//!
//! Every operation here is total: malformed input degrades to empty values.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use super::document::{
    AiHistoryEntry, AiResult, AiState, DocumentAssets, Variant, VariantAssets, VariantDocument,
    VariantKey,
};

const HISTORY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

fn is_non_blank(s: &str) -> bool {
    !s.trim().is_empty()
}

fn non_blank_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if is_non_blank(&s) => Some(s),
        _ => None,
    }
}

/// JavaScript truthiness, which is what the legacy writers relied on.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

fn parse_root(raw: &Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map.clone(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                tracing::debug!(error = %e, "[variants] malformed variants JSON, treating as empty");
                Map::new()
            }
        },
        _ => Map::new(),
    }
}

fn take_image_list(assets: &mut Map<String, Value>) -> Vec<String> {
    match assets.remove("images") {
        Some(Value::Array(items)) => items.into_iter().filter_map(non_blank_string).collect(),
        _ => Vec::new(),
    }
}

/// Canonicalizes a stored variants blob.
///
/// `raw` may be an object, a JSON-encoded string of one, or anything else
/// (treated as absent). `legacy_images` is the test record's flat image
/// array, positionally A..E. Legacy sources only seed a slot whose own list
/// is empty; the per-key map wins over the flat array.
///
/// Idempotent: feeding the output back in yields the same document.
pub fn normalize(raw: &Value, legacy_images: Option<&[String]>) -> VariantDocument {
    let mut root = parse_root(raw);
    let mut assets = take_object(&mut root, "assets");
    let legacy_map = match assets.remove("images") {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    };
    let legacy_list = legacy_images.unwrap_or(&[]);

    let mut doc = VariantDocument::default();

    for key in VariantKey::ALL {
        let mut fields = take_object(&mut root, key.as_str());
        let mut variant_assets = take_object(&mut fields, "assets");
        let mut images = take_image_list(&mut variant_assets);

        if images.is_empty() {
            let from_map = legacy_map
                .as_ref()
                .and_then(|m| m.get(key.as_str()))
                .and_then(Value::as_str)
                .filter(|url| is_non_blank(url));
            let from_list = legacy_list
                .get(key.index())
                .map(String::as_str)
                .filter(|url| is_non_blank(url));
            if let Some(url) = from_map.or(from_list) {
                tracing::debug!(variant = %key, "[variants] seeded slot image from legacy storage");
                images.push(url.to_string());
            }
        }

        *doc.variant_mut(key) = Variant {
            assets: VariantAssets {
                images,
                extra: variant_assets,
            },
            fields,
        };
    }

    let top_insight = root.remove("insight").and_then(non_blank_string);
    let assets_insight = assets.remove("insight").and_then(non_blank_string);
    let insight = top_insight.or(assets_insight).unwrap_or_default();

    let mut ai = take_object(&mut root, "ai");
    let history = match ai.remove("history") {
        Some(Value::Array(items)) => items.into_iter().map(AiHistoryEntry::from_raw).collect(),
        _ => Vec::new(),
    };
    let latest = ai
        .remove("latest")
        .and_then(AiResult::from_value)
        .or_else(|| legacy_latest(&assets, &insight, &root));

    doc.assets = DocumentAssets {
        images: Default::default(),
        insight: insight.clone(),
        extra: assets,
    };
    doc.insight = insight;
    doc.ai = AiState {
        latest,
        history,
        extra: ai,
    };
    doc.extra = root;
    doc.rebuild_image_map();
    doc
}

fn legacy_latest(
    assets: &Map<String, Value>,
    insight: &str,
    root: &Map<String, Value>,
) -> Option<AiResult> {
    if let Some(last_json) = assets
        .get("ai")
        .and_then(|ai| ai.get("last_json"))
        .filter(|v| is_truthy(v))
    {
        return AiResult::from_value(last_json.clone());
    }
    if is_non_blank(insight) {
        return Some(AiResult::Text(insight.to_string()));
    }
    root.get("ai_mixer_v3")
        .filter(|v| is_truthy(v))
        .and_then(|v| AiResult::from_value(v.clone()))
}

impl VariantDocument {
    /// Round-trips through storage form so hand-edited fields are brought
    /// back in line with the invariants.
    pub fn renormalized(&self) -> VariantDocument {
        normalize(&self.to_value(), None)
    }
}

// ── Edits ───────────────────────────────────────────────────────────

/// Points a slot at a single image (or clears it when `url` is blank) and
/// keeps the top-level map in step.
pub fn set_variant_image(doc: &VariantDocument, key: VariantKey, url: &str) -> VariantDocument {
    let mut next = doc.renormalized();
    let variant = next.variant_mut(key);
    variant.assets.images = if is_non_blank(url) {
        vec![url.to_string()]
    } else {
        Vec::new()
    };
    next.rebuild_image_map();
    next
}

/// Stores a metric value on a slot exactly as entered.
pub fn set_variant_metric(
    doc: &VariantDocument,
    key: VariantKey,
    field: &str,
    value: Value,
) -> VariantDocument {
    let mut next = doc.renormalized();
    if field == "assets" {
        tracing::warn!(variant = %key, "[variants] refusing to overwrite slot assets through a metric edit");
        return next;
    }
    next.variant_mut(key).fields.insert(field.to_string(), value);
    next
}

/// Replaces `ai.latest`, archiving the previous result at the front of the
/// history when it had content. History entries missing a timestamp are
/// stamped with `now`.
pub fn append_ai_history_at(
    doc: &VariantDocument,
    latest: AiResult,
    now: NaiveDateTime,
) -> VariantDocument {
    let latest = latest.canonical();
    let mut next = doc.renormalized();
    let stamp = now.format(HISTORY_TIMESTAMP_FORMAT).to_string();

    let mut history = Vec::with_capacity(next.ai.history.len() + 1);
    if let Some(previous) = next.ai.latest.take() {
        if previous.has_content() {
            history.push(archive_entry(previous, &stamp));
        }
    }
    history.extend(next.ai.history.drain(..).map(|mut entry| {
        if entry.timestamp.is_none() {
            entry.timestamp = Some(stamp.clone());
        }
        entry
    }));
    next.ai.history = history;

    match &latest {
        AiResult::Text(text) => next.set_insight(text.clone()),
        AiResult::Structured(value) if is_truthy(value) => next.set_insight(latest.insight_text()),
        AiResult::Structured(_) => {}
    }
    next.ai.latest = Some(latest);
    next
}

/// [`append_ai_history_at`] stamped with the local wall clock.
pub fn append_ai_history(doc: &VariantDocument, latest: AiResult) -> VariantDocument {
    append_ai_history_at(doc, latest, chrono::Local::now().naive_local())
}

fn archive_entry(previous: AiResult, stamp: &str) -> AiHistoryEntry {
    // A latest value that is itself a wrapped entry keeps its own timestamp.
    if let AiResult::Structured(Value::Object(map)) = &previous {
        if map.contains_key("timestamp") && map.contains_key("value") {
            let mut entry = AiHistoryEntry::from_raw(previous.to_value());
            if entry.timestamp.is_none() {
                entry.timestamp = Some(stamp.to_string());
            }
            return entry;
        }
    }
    AiHistoryEntry::new(stamp, previous)
}

// ── Reads ───────────────────────────────────────────────────────────

/// Lenient JSON sniff for AI output: only text whose trimmed form starts with
/// `{` or `[` is parsed, and parse failures yield `None`.
pub fn try_parse_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

pub fn variant_image(doc: &VariantDocument, key: VariantKey) -> String {
    doc.variant(key)
        .image()
        .or_else(|| doc.assets.images.get(&key).map(String::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Image recorded under the oldest `{"images": {"A": url}}` layout, which
/// `normalize` leaves untouched among the unknown keys.
pub fn legacy_map_image(doc: &VariantDocument, key: VariantKey) -> Option<&str> {
    doc.extra
        .get("images")
        .and_then(|images| images.get(key.as_str()))
        .and_then(Value::as_str)
        .filter(|url| is_non_blank(url))
}

pub fn variant_images(doc: &VariantDocument, key: VariantKey) -> Vec<String> {
    let list: Vec<String> = doc
        .variant(key)
        .assets
        .images
        .iter()
        .filter(|url| is_non_blank(url))
        .cloned()
        .collect();
    if !list.is_empty() {
        return list;
    }
    doc.assets
        .images
        .get(&key)
        .filter(|url| is_non_blank(url))
        .map(|url| vec![url.clone()])
        .unwrap_or_default()
}

/// True when only the legacy flat array knows about images, meaning the
/// normalized document should be written back so the slots own them.
pub fn needs_legacy_backfill(raw: &Value, legacy_images: &[String]) -> bool {
    let has_legacy = legacy_images.iter().any(|url| is_non_blank(url));
    has_legacy && !normalize(raw, None).has_any_image()
}
