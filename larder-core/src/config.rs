//! Thresholds and weights, from defaults or environment variables.
//!
//! None of the thresholds have an empirical basis beyond "worked on the
//! Korean recipe corpus", so all of them are configurable.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name similarity at or above which two records are duplicates.
pub const DEFAULT_NAME_THRESHOLD: f64 = 0.85;

/// Name similarity at or above which ingredient overlap is consulted.
pub const DEFAULT_CANDIDATE_THRESHOLD: f64 = 0.70;

/// Ingredient-set Jaccard similarity required for candidate pairs.
pub const DEFAULT_INGREDIENT_OVERLAP: f64 = 0.80;

/// Minimum score for an ingredient to match a reference entry.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.60;

/// How duplicate pairs are turned into groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// Single linear scan: each unassigned record claims every later
    /// unassigned record that matches it. Order-dependent, not transitive.
    #[default]
    FirstMatch,
    /// Connected components of the duplicate relation.
    Transitive,
}

impl ClusterStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStrategy::FirstMatch => "first_match",
            ClusterStrategy::Transitive => "transitive",
        }
    }
}

impl FromStr for ClusterStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "first_match" => Ok(ClusterStrategy::FirstMatch),
            "transitive" => Ok(ClusterStrategy::Transitive),
            other => Err(format!(
                "unknown strategy {other:?}, expected first_match or transitive"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DedupeConfig {
    pub name_threshold: f64,
    pub candidate_threshold: f64,
    pub ingredient_overlap: f64,
    pub strategy: ClusterStrategy,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            name_threshold: DEFAULT_NAME_THRESHOLD,
            candidate_threshold: DEFAULT_CANDIDATE_THRESHOLD,
            ingredient_overlap: DEFAULT_INGREDIENT_OVERLAP,
            strategy: ClusterStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub match_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolveConfig {
    pub dedupe: DedupeConfig,
    pub matching: MatchConfig,
    /// Weight of one piece when a quantity has no recognizable unit.
    pub default_piece_grams: f64,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            dedupe: DedupeConfig::default(),
            matching: MatchConfig::default(),
            default_piece_grams: 50.0,
        }
    }
}

impl ResolveConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `LARDER_NAME_THRESHOLD`: name similarity for duplicates (default: 0.85)
    /// - `LARDER_CANDIDATE_THRESHOLD`: name similarity before ingredient check (default: 0.70)
    /// - `LARDER_INGREDIENT_OVERLAP`: ingredient Jaccard for candidates (default: 0.80)
    /// - `LARDER_MATCH_THRESHOLD`: ingredient-to-reference match score (default: 0.60)
    /// - `LARDER_DEFAULT_PIECE_GRAMS`: grams for unknown units (default: 50)
    /// - `LARDER_CLUSTER_STRATEGY`: `first_match` or `transitive` (default: first_match)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let ratio = |name: &str, default: f64| -> Result<f64, ConfigError> {
            match lookup(name) {
                Some(raw) => parse_ratio(name, &raw),
                None => Ok(default),
            }
        };

        let dedupe = DedupeConfig {
            name_threshold: ratio("LARDER_NAME_THRESHOLD", defaults.dedupe.name_threshold)?,
            candidate_threshold: ratio(
                "LARDER_CANDIDATE_THRESHOLD",
                defaults.dedupe.candidate_threshold,
            )?,
            ingredient_overlap: ratio(
                "LARDER_INGREDIENT_OVERLAP",
                defaults.dedupe.ingredient_overlap,
            )?,
            strategy: match lookup("LARDER_CLUSTER_STRATEGY") {
                Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
                    name: "LARDER_CLUSTER_STRATEGY".to_string(),
                    value: raw.clone(),
                    reason,
                })?,
                None => defaults.dedupe.strategy,
            },
        };

        let matching = MatchConfig {
            match_threshold: ratio("LARDER_MATCH_THRESHOLD", defaults.matching.match_threshold)?,
        };

        let default_piece_grams = match lookup("LARDER_DEFAULT_PIECE_GRAMS") {
            Some(raw) => parse_grams("LARDER_DEFAULT_PIECE_GRAMS", &raw)?,
            None => defaults.default_piece_grams,
        };

        Ok(Self {
            dedupe,
            matching,
            default_piece_grams,
        })
    }
}

/// Parse a value that must lie in `[0, 1]`.
pub fn parse_ratio(name: &str, raw: &str) -> Result<f64, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid("not a number"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid("must be between 0 and 1"));
    }
    Ok(value)
}

/// Parse a non-negative weight in grams.
pub fn parse_grams(name: &str, raw: &str) -> Result<f64, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid("not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid("must be a non-negative number"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ResolveConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ResolveConfig::default());
        assert_eq!(config.dedupe.name_threshold, 0.85);
        assert_eq!(config.dedupe.candidate_threshold, 0.70);
        assert_eq!(config.dedupe.ingredient_overlap, 0.80);
        assert_eq!(config.matching.match_threshold, 0.60);
        assert_eq!(config.default_piece_grams, 50.0);
        assert_eq!(config.dedupe.strategy, ClusterStrategy::FirstMatch);
    }

    #[test]
    fn test_overrides() {
        let config = ResolveConfig::from_lookup(lookup(&[
            ("LARDER_NAME_THRESHOLD", "0.9"),
            ("LARDER_MATCH_THRESHOLD", " 0.75 "),
            ("LARDER_DEFAULT_PIECE_GRAMS", "40"),
            ("LARDER_CLUSTER_STRATEGY", "transitive"),
        ]))
        .unwrap();
        assert_eq!(config.dedupe.name_threshold, 0.9);
        assert_eq!(config.matching.match_threshold, 0.75);
        assert_eq!(config.default_piece_grams, 40.0);
        assert_eq!(config.dedupe.strategy, ClusterStrategy::Transitive);
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("LARDER_NAME_THRESHOLD", "high"),
            ("LARDER_CANDIDATE_THRESHOLD", "1.5"),
            ("LARDER_DEFAULT_PIECE_GRAMS", "-5"),
            ("LARDER_CLUSTER_STRATEGY", "random"),
        ] {
            let result = ResolveConfig::from_lookup(lookup(&[(name, value)]));
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { .. })),
                "{name}={value} should be rejected"
            );
        }
    }
}
