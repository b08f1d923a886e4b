//! # Similarity Scoring
//!
//! Weighted multi-factor comparison of two person profiles. Each factor
//! yields a similarity in `[0, 1]` that is multiplied by its weight. A factor
//! only counts as available when both persons carry data for it, and the
//! total is the weighted sum divided by the available weight (never less
//! than `min_evidence_weight`), so sparse records are neither penalized for
//! missing data nor able to score high on a single factor.
//!
//! Renormalizing must not hide evidence that rules a pair out: a recorded
//! parent and child, or birth or death years at least `year_gap_cap` apart,
//! score zero whatever their names say.

use crate::config::{
    DedupConfig, DEFAULT_BIRTH_PLACE_WEIGHT, DEFAULT_BIRTH_YEAR_WEIGHT, DEFAULT_DEATH_YEAR_WEIGHT,
    DEFAULT_GIVEN_NAME_WEIGHT, DEFAULT_PARENTS_WEIGHT, DEFAULT_SOURCES_WEIGHT,
    DEFAULT_SPOUSES_WEIGHT, DEFAULT_SURNAME_WEIGHT,
};
use crate::error::{ensure_in_range, AnalysisError, AnalysisResult};
use crate::model::PersonId;
use crate::profile::PersonProfile;
use crate::temporal::DateRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const WEIGHT_EPSILON: f64 = 1e-9;

/// Scoring factors in summation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Surname,
    GivenName,
    BirthYear,
    BirthPlace,
    DeathYear,
    Parents,
    Spouses,
    Sources,
}

impl Factor {
    pub const ALL: [Factor; 8] = [
        Factor::Surname,
        Factor::GivenName,
        Factor::BirthYear,
        Factor::BirthPlace,
        Factor::DeathYear,
        Factor::Parents,
        Factor::Spouses,
        Factor::Sources,
    ];
}

/// Weight per factor. Weights are non-negative and sum to at most 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub surname: f64,
    pub given_name: f64,
    pub birth_year: f64,
    pub birth_place: f64,
    pub death_year: f64,
    pub parents: f64,
    pub spouses: f64,
    pub sources: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            surname: DEFAULT_SURNAME_WEIGHT,
            given_name: DEFAULT_GIVEN_NAME_WEIGHT,
            birth_year: DEFAULT_BIRTH_YEAR_WEIGHT,
            birth_place: DEFAULT_BIRTH_PLACE_WEIGHT,
            death_year: DEFAULT_DEATH_YEAR_WEIGHT,
            parents: DEFAULT_PARENTS_WEIGHT,
            spouses: DEFAULT_SPOUSES_WEIGHT,
            sources: DEFAULT_SOURCES_WEIGHT,
        }
    }
}

impl FactorWeights {
    pub fn weight(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Surname => self.surname,
            Factor::GivenName => self.given_name,
            Factor::BirthYear => self.birth_year,
            Factor::BirthPlace => self.birth_place,
            Factor::DeathYear => self.death_year,
            Factor::Parents => self.parents,
            Factor::Spouses => self.spouses,
            Factor::Sources => self.sources,
        }
    }

    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|&factor| self.weight(factor)).sum()
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        for factor in Factor::ALL {
            let weight = self.weight(factor);
            if !weight.is_finite() || weight < 0.0 {
                return Err(AnalysisError::configuration(format!(
                    "weight for {:?} must be a non-negative number, got {}",
                    factor, weight
                )));
            }
        }
        let total = self.total();
        if total > 1.0 + WEIGHT_EPSILON {
            return Err(AnalysisError::configuration(format!(
                "factor weights must sum to at most 1.0, got {}",
                total
            )));
        }
        Ok(())
    }
}

/// Outcome of one factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub weight: f64,
    /// `None` when at least one side has no data for this factor
    pub similarity: Option<f64>,
    pub contribution: f64,
}

/// Evidence that two records cannot be the same person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disqualification {
    /// One person is recorded as the other's parent
    ParentChild,
    /// Both persons carry this year and it differs by at least the cap
    YearConflict(Factor),
}

/// Per-factor explanation of a pair score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub factors: Vec<FactorScore>,
    /// Sum of the weights of factors both persons have data for
    pub available_weight: f64,
    /// Sum of contributions
    pub raw: f64,
    /// Set when the pair is ruled out; `total` is then zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disqualified: Option<Disqualification>,
    /// Final score in `[0, 1]`
    pub total: f64,
}

impl ScoreBreakdown {
    pub fn factor(&self, factor: Factor) -> Option<&FactorScore> {
        self.factors.iter().find(|score| score.factor == factor)
    }
}

/// A scored candidate pair, `a` being the smaller id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub a: PersonId,
    pub b: PersonId,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Pure, deterministic pair scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScorer {
    weights: FactorWeights,
    year_gap_cap: u32,
    min_evidence_weight: f64,
}

impl SimilarityScorer {
    pub fn new(
        weights: FactorWeights,
        year_gap_cap: u32,
        min_evidence_weight: f64,
    ) -> AnalysisResult<Self> {
        weights.validate()?;
        ensure_in_range("min_evidence_weight", min_evidence_weight, 0.0, 1.0)?;
        Ok(Self {
            weights,
            year_gap_cap,
            min_evidence_weight,
        })
    }

    pub fn from_config(config: &DedupConfig) -> AnalysisResult<Self> {
        Self::new(config.weights, config.year_gap_cap, config.min_evidence_weight)
    }

    pub fn weights(&self) -> &FactorWeights {
        &self.weights
    }

    /// Score two profiles. Symmetric in its arguments.
    pub fn score(&self, a: &PersonProfile, b: &PersonProfile) -> ScoreBreakdown {
        let mut factors = Vec::with_capacity(Factor::ALL.len());
        let mut available_weight = 0.0;
        let mut raw = 0.0;

        for factor in Factor::ALL {
            let weight = self.weights.weight(factor);
            let similarity = self.similarity(factor, a, b).map(|s| s.clamp(0.0, 1.0));
            let contribution = similarity.map_or(0.0, |s| weight * s);
            if similarity.is_some() {
                available_weight += weight;
            }
            raw += contribution;
            factors.push(FactorScore {
                factor,
                weight,
                similarity,
                contribution,
            });
        }

        let disqualified = if a.is_parent_of(b) || b.is_parent_of(a) {
            Some(Disqualification::ParentChild)
        } else {
            factors
                .iter()
                .find(|score| {
                    matches!(score.factor, Factor::BirthYear | Factor::DeathYear)
                        && score.weight > 0.0
                        && score.similarity == Some(0.0)
                })
                .map(|score| Disqualification::YearConflict(score.factor))
        };

        let denominator = f64::max(available_weight, self.min_evidence_weight);
        let total = if disqualified.is_some() || denominator <= 0.0 {
            0.0
        } else {
            (raw / denominator).clamp(0.0, 1.0)
        };

        ScoreBreakdown {
            factors,
            available_weight,
            raw,
            disqualified,
            total,
        }
    }

    fn similarity(&self, factor: Factor, a: &PersonProfile, b: &PersonProfile) -> Option<f64> {
        match factor {
            Factor::Surname => surname_match(a, b),
            Factor::GivenName => given_name_similarity(a, b),
            Factor::BirthYear => self.year_proximity(a.birth.as_ref(), b.birth.as_ref()),
            Factor::BirthPlace => place_similarity(a.birth_place.as_deref(), b.birth_place.as_deref()),
            Factor::DeathYear => self.year_proximity(a.death.as_ref(), b.death.as_ref()),
            Factor::Parents => overlap(&a.parent_names, &b.parent_names),
            Factor::Spouses => overlap(&a.spouse_names, &b.spouse_names),
            Factor::Sources => jaccard(&a.sources, &b.sources),
        }
    }

    fn year_proximity(&self, a: Option<&DateRange>, b: Option<&DateRange>) -> Option<f64> {
        let gap = a?.year_gap(b?)?;
        if self.year_gap_cap == 0 {
            return Some(if gap == 0 { 1.0 } else { 0.0 });
        }
        Some((1.0 - f64::from(gap) / f64::from(self.year_gap_cap)).max(0.0))
    }
}

fn surname_match(a: &PersonProfile, b: &PersonProfile) -> Option<f64> {
    let surnames = |profile: &PersonProfile| -> Vec<String> {
        profile
            .names
            .iter()
            .map(|features| features.name.surname.clone())
            .filter(|surname| !surname.is_empty())
            .collect()
    };
    let (left, right) = (surnames(a), surnames(b));
    if left.is_empty() || right.is_empty() {
        return None;
    }
    let matched = left.iter().any(|surname| right.contains(surname));
    Some(if matched { 1.0 } else { 0.0 })
}

fn given_name_similarity(a: &PersonProfile, b: &PersonProfile) -> Option<f64> {
    let given = |profile: &PersonProfile| -> Vec<Vec<String>> {
        profile
            .names
            .iter()
            .map(|features| features.name.given_tokens().map(str::to_string).collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty())
            .collect()
    };
    let (left, right) = (given(a), given(b));
    if left.is_empty() || right.is_empty() {
        return None;
    }

    let mut best: f64 = 0.0;
    for x in &left {
        for y in &right {
            best = best.max(token_similarity(x, y));
        }
    }
    Some(best)
}

/// Symmetric token-level ratio: each token's best normalized Levenshtein
/// similarity against the other side, averaged per side, then both sides
/// averaged.
pub fn token_similarity(left: &[String], right: &[String]) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    (directed_similarity(left, right) + directed_similarity(right, left)) / 2.0
}

fn directed_similarity(from: &[String], to: &[String]) -> f64 {
    let sum: f64 = from
        .iter()
        .map(|token| {
            to.iter()
                .map(|other| strsim::normalized_levenshtein(token, other))
                .fold(0.0, f64::max)
        })
        .sum();
    sum / from.len() as f64
}

fn place_similarity(a: Option<&str>, b: Option<&str>) -> Option<f64> {
    let (a, b) = (a?, b?);
    Some(if a == b || a.contains(b) || b.contains(a) {
        1.0
    } else {
        0.0
    })
}

fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let shared = a.intersection(b).count();
    Some(shared as f64 / a.len().max(b.len()) as f64)
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    Some(shared as f64 / union as f64)
}
