//! Deduplication engine: fingerprinting plus fuzzy similarity scoring.

pub mod engine;
pub mod fingerprint;

pub use engine::{DeduplicationEngine, DuplicateMatch};
pub use fingerprint::{normalize, price_key, ItemFingerprint};
