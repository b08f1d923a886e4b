//! Default constants for kindred configuration.
//!
//! All magic numbers are centralized here with documentation.

// =============================================================================
// Deduplication Defaults
// =============================================================================

/// Minimum score for a candidate pair to count as a duplicate
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;

/// Threshold used when listing likely duplicate pairs.
/// Stricter than the clustering threshold since pairs are reported directly.
pub const DEFAULT_LIKELY_DUPLICATE_THRESHOLD: f64 = 0.85;

/// Year gap at which birth/death year proximity decays to zero
pub const DEFAULT_YEAR_GAP_CAP: u32 = 5;

/// Lower bound on the weight a score is normalized by.
/// Keeps a lone matching factor from producing a high score.
pub const DEFAULT_MIN_EVIDENCE_WEIGHT: f64 = 0.5;

/// Phonetic buckets larger than this are skipped during blocking (0 = unlimited)
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 500;

// =============================================================================
// Factor Weights
// =============================================================================

pub const DEFAULT_SURNAME_WEIGHT: f64 = 0.25;
pub const DEFAULT_GIVEN_NAME_WEIGHT: f64 = 0.20;
pub const DEFAULT_BIRTH_YEAR_WEIGHT: f64 = 0.15;
pub const DEFAULT_BIRTH_PLACE_WEIGHT: f64 = 0.10;
pub const DEFAULT_DEATH_YEAR_WEIGHT: f64 = 0.10;
pub const DEFAULT_PARENTS_WEIGHT: f64 = 0.10;
pub const DEFAULT_SPOUSES_WEIGHT: f64 = 0.05;
pub const DEFAULT_SOURCES_WEIGHT: f64 = 0.05;

// =============================================================================
// Relationship Defaults
// =============================================================================

/// Spouses a person may have at the same instant
pub const DEFAULT_MAX_CONCURRENT_SPOUSES: usize = 1;

/// Biological parents a person may have
pub const DEFAULT_MAX_BIOLOGICAL_PARENTS: usize = 2;

// =============================================================================
// Timeline Defaults
// =============================================================================

/// Youngest plausible age of a parent at a child's birth
pub const DEFAULT_MIN_PARENT_AGE: i32 = 14;

/// Oldest plausible age of a parent at a child's birth
pub const DEFAULT_MAX_PARENT_AGE: i32 = 60;

/// Longest plausible lifespan in years
pub const DEFAULT_MAX_LIFESPAN: i32 = 120;

// =============================================================================
// Coverage Defaults
// =============================================================================

/// Ancestor generations walked when prioritizing source research
pub const DEFAULT_COVERAGE_GENERATIONS: u32 = 4;
