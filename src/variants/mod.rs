pub mod document;
pub mod normalize;

pub use document::{AiHistoryEntry, AiResult, AiState, Variant, VariantDocument, VariantKey};
pub use normalize::{
    append_ai_history, append_ai_history_at, legacy_map_image, needs_legacy_backfill, normalize,
    set_variant_image, set_variant_metric, try_parse_json, variant_image, variant_images,
};
