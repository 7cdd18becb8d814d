//! OCR text cleanup: whitespace normalization, character-class line
//! filtering and near-duplicate suppression across samples.

pub mod dedup;
pub mod filter;
pub mod normalize;

pub use dedup::{dedupe_lines, similarity_ratio, LineDeduplicator};
pub use filter::{FilterMode, LineFilter};
pub use normalize::{char_ratios, normalize_text, CharRatios};
