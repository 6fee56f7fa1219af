//! Fuzzy search over merged records.

mod fuzzy;
mod index;
mod normalize;

pub use fuzzy::similarity;
pub use index::{SearchHit, SearchResults, Searchable, WeightedField, WeightedFuzzyIndex};
pub use normalize::{CaseFoldNormalizer, NormalizationCache, Normalizer, NormalizerRegistry};
