//! Near-duplicate detection and merging.
//!
//! Records are compared under a tiered policy, short-circuiting in order:
//! 1. Identical normalized names
//! 2. Name similarity at or above `name_threshold`
//! 3. Name similarity at or above `candidate_threshold` and ingredient-name
//!    Jaccard similarity at or above `ingredient_overlap`
//!
//! Records sharing an exact normalized name are always grouped first; the
//! fuzzy comparison then runs over the rest. The policy is not an
//! equivalence relation, so how pairs become groups depends on
//! [`ClusterStrategy`].

mod disjoint_set;
mod merge;

pub use disjoint_set::DisjointSet;
pub use merge::{completeness, merge_group};

use std::collections::{HashMap, HashSet};

use nutrient_table::{jaccard, normalize_name, string_similarity};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ClusterStrategy, DedupeConfig};
use crate::types::{
    DedupeOutput, DedupeStats, DuplicateGroup, DuplicateLogEntry, RecipeRecord,
};

/// Which tier of the policy judged a pair duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    ExactName,
    SimilarName,
    SimilarNameAndIngredients,
}

/// The parts of a record the policy compares, precomputed once per record.
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    ingredients: HashSet<String>,
}

impl Candidate {
    fn from_record(record: &RecipeRecord) -> Self {
        Self {
            name: normalize_name(&record.name),
            ingredients: record
                .ingredients
                .iter()
                .map(|ing| normalize_name(&ing.name))
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

fn compare(a: &Candidate, b: &Candidate, config: &DedupeConfig) -> Option<DuplicateReason> {
    if a.name == b.name {
        return Some(DuplicateReason::ExactName);
    }

    let name_similarity = string_similarity(&a.name, &b.name);
    if name_similarity >= config.name_threshold {
        return Some(DuplicateReason::SimilarName);
    }

    if name_similarity >= config.candidate_threshold
        && jaccard(&a.ingredients, &b.ingredients) >= config.ingredient_overlap
    {
        return Some(DuplicateReason::SimilarNameAndIngredients);
    }

    None
}

/// Decide whether two records describe the same recipe.
pub fn is_duplicate(
    a: &RecipeRecord,
    b: &RecipeRecord,
    config: &DedupeConfig,
) -> Option<DuplicateReason> {
    compare(&Candidate::from_record(a), &Candidate::from_record(b), config)
}

/// Indices sharing a normalized name, ordered by first index.
fn exact_name_buckets(candidates: &[Candidate]) -> Vec<Vec<usize>> {
    let mut slot_of_name: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<Vec<usize>> = Vec::new();

    for (i, candidate) in candidates.iter().enumerate() {
        let slot = *slot_of_name
            .entry(candidate.name.as_str())
            .or_insert_with(|| {
                buckets.push(Vec::new());
                buckets.len() - 1
            });
        buckets[slot].push(i);
    }

    buckets
}

/// Partition records into duplicate groups.
///
/// Every input index appears in exactly one group. Groups are ordered by
/// their smallest index and list indices ascending.
pub fn find_duplicate_groups(
    records: &[RecipeRecord],
    config: &DedupeConfig,
) -> Vec<DuplicateGroup> {
    let candidates: Vec<Candidate> = records.par_iter().map(Candidate::from_record).collect();
    let buckets = exact_name_buckets(&candidates);

    let groups = match config.strategy {
        ClusterStrategy::FirstMatch => first_match_groups(&candidates, buckets, config),
        ClusterStrategy::Transitive => transitive_groups(&candidates, buckets, config),
    };

    groups
        .into_iter()
        .map(|indices| DuplicateGroup { indices })
        .collect()
}

/// Exact-name buckets, then one linear scan in which each unassigned record
/// claims every later unassigned record that matches it directly.
fn first_match_groups(
    candidates: &[Candidate],
    buckets: Vec<Vec<usize>>,
    config: &DedupeConfig,
) -> Vec<Vec<usize>> {
    let n = candidates.len();
    let mut visited = vec![false; n];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for bucket in buckets.into_iter().filter(|b| b.len() > 1) {
        for &i in &bucket {
            visited[i] = true;
        }
        groups.push(bucket);
    }

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let mut group = vec![i];
        for j in (i + 1)..n {
            if visited[j] {
                continue;
            }
            if let Some(reason) = compare(&candidates[i], &candidates[j], config) {
                tracing::trace!(i, j, ?reason, "duplicate pair");
                visited[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }

    groups.sort_by_key(|group| group[0]);
    groups
}

/// Connected components of the duplicate relation.
fn transitive_groups(
    candidates: &[Candidate],
    buckets: Vec<Vec<usize>>,
    config: &DedupeConfig,
) -> Vec<Vec<usize>> {
    let n = candidates.len();
    let mut set = DisjointSet::new(n);

    for bucket in &buckets {
        for pair in bucket.windows(2) {
            set.union(pair[0], pair[1]);
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if set.find(i) == set.find(j) {
                continue;
            }
            if let Some(reason) = compare(&candidates[i], &candidates[j], config) {
                tracing::trace!(i, j, ?reason, "duplicate pair");
                set.union(i, j);
            }
        }
    }

    set.components()
}

/// Cluster records and merge each cluster into one record.
///
/// Output records are ordered by the smallest input index of their group.
pub fn deduplicate(records: Vec<RecipeRecord>, config: &DedupeConfig) -> DedupeOutput {
    let input = records.len();
    let groups = find_duplicate_groups(&records, config);

    let mut slots: Vec<Option<RecipeRecord>> = records.into_iter().map(Some).collect();
    let mut merged = Vec::with_capacity(groups.len());
    let mut duplicates = Vec::new();

    for group in &groups {
        let members: Vec<RecipeRecord> = group
            .indices
            .iter()
            .filter_map(|&i| slots[i].take())
            .collect();

        if members.len() > 1 {
            duplicates.push(DuplicateLogEntry {
                indices: group.indices.clone(),
                names: members.iter().map(|r| r.name.clone()).collect(),
                count: members.len(),
            });
        }

        if let Some(record) = merge_group(members) {
            merged.push(record);
        }
    }

    let stats = DedupeStats {
        input,
        groups: duplicates.len(),
        removed: input - merged.len(),
        output: merged.len(),
    };
    tracing::info!(
        input = stats.input,
        groups = stats.groups,
        removed = stats.removed,
        strategy = config.strategy.as_str(),
        "deduplicated recipes"
    );

    DedupeOutput {
        records: merged,
        duplicates,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IngredientQuantity;

    fn recipe(name: &str, ingredients: &[&str]) -> RecipeRecord {
        RecipeRecord {
            ingredients: ingredients
                .iter()
                .map(|n| IngredientQuantity::new(*n, 1.0, "개"))
                .collect(),
            ..RecipeRecord::new(name)
        }
    }

    fn indices(groups: &[DuplicateGroup]) -> Vec<Vec<usize>> {
        groups.iter().map(|g| g.indices.clone()).collect()
    }

    #[test]
    fn test_policy_tiers() {
        let config = DedupeConfig::default();
        assert_eq!(
            is_duplicate(&recipe("김치찌개", &[]), &recipe("김치 찌개!", &[]), &config),
            Some(DuplicateReason::ExactName)
        );
        // "abcdefgh" vs "abcdefgx": 2 * 7 / 16 = 0.875
        assert_eq!(
            is_duplicate(&recipe("abcdefgh", &[]), &recipe("abcdefgx", &[]), &config),
            Some(DuplicateReason::SimilarName)
        );
        // "abcd" vs "abxd": 0.75, needs ingredient overlap
        let a = recipe("abcd", &["돼지고기", "김치", "두부", "대파"]);
        let b = recipe("abxd", &["돼지고기", "김치", "두부", "대파"]);
        assert_eq!(
            is_duplicate(&a, &b, &config),
            Some(DuplicateReason::SimilarNameAndIngredients)
        );
        let c = recipe("abxd", &["돼지고기", "김치", "양파"]);
        assert_eq!(is_duplicate(&a, &c, &config), None);
        // Below the candidate threshold ingredients do not matter
        let d = recipe("wxyz", &["돼지고기", "김치", "두부", "대파"]);
        assert_eq!(is_duplicate(&a, &d, &config), None);
    }

    #[test]
    fn test_empty_ingredient_sets_never_overlap() {
        let config = DedupeConfig::default();
        assert_eq!(
            is_duplicate(&recipe("abcd", &[]), &recipe("abxd", &[]), &config),
            None
        );
    }

    #[test]
    fn test_exact_names_cluster_regardless_of_fields() {
        let mut a = recipe("김치찌개", &["돼지고기"]);
        a.source = "crawler".to_string();
        let mut b = recipe("김치찌개", &["참치", "양파"]);
        b.source = "manual".to_string();
        b.time_minutes = 45;

        for strategy in [ClusterStrategy::FirstMatch, ClusterStrategy::Transitive] {
            let config = DedupeConfig {
                name_threshold: 1.0,
                candidate_threshold: 1.0,
                ingredient_overlap: 1.0,
                strategy,
            };
            let groups = find_duplicate_groups(&[a.clone(), b.clone()], &config);
            assert_eq!(indices(&groups), vec![vec![0, 1]]);
        }
    }

    #[test]
    fn test_every_index_covered_once() {
        let records = vec![
            recipe("된장찌개", &[]),
            recipe("김치찌개", &[]),
            recipe("된장찌개", &[]),
            recipe("잡채", &[]),
            recipe("김치 찌개", &[]),
        ];
        let groups = find_duplicate_groups(&records, &DedupeConfig::default());
        assert_eq!(indices(&groups), vec![vec![0, 2], vec![1, 4], vec![3]]);
    }

    #[test]
    fn test_first_match_is_not_transitive() {
        // a~b and b~c under the name threshold, but a and c are too far apart.
        // "abcdefgh"/"abcdefgx" = 0.875, "abcdefgx"/"abcdefyx" = 0.875,
        // "abcdefgh"/"abcdefyx" = 0.75
        let records = vec![
            recipe("abcdefgh", &[]),
            recipe("abcdefgx", &[]),
            recipe("abcdefyx", &[]),
        ];

        let first_match = find_duplicate_groups(&records, &DedupeConfig::default());
        assert_eq!(indices(&first_match), vec![vec![0, 1], vec![2]]);

        let config = DedupeConfig {
            strategy: ClusterStrategy::Transitive,
            ..Default::default()
        };
        let transitive = find_duplicate_groups(&records, &config);
        assert_eq!(indices(&transitive), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_bucketed_records_are_not_rescanned() {
        // 0 and 2 share a name and are bucketed first; 1 is similar to them
        // but the scan never revisits bucketed records.
        let records = vec![
            recipe("abcdefgh", &[]),
            recipe("abcdefgx", &[]),
            recipe("abcdefgh", &[]),
        ];
        let groups = find_duplicate_groups(&records, &DedupeConfig::default());
        assert_eq!(indices(&groups), vec![vec![0, 2], vec![1]]);

        let config = DedupeConfig {
            strategy: ClusterStrategy::Transitive,
            ..Default::default()
        };
        let groups = find_duplicate_groups(&records, &config);
        assert_eq!(indices(&groups), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(find_duplicate_groups(&[], &DedupeConfig::default()).is_empty());
        let output = deduplicate(Vec::new(), &DedupeConfig::default());
        assert!(output.records.is_empty());
        assert_eq!(output.stats, DedupeStats::default());
    }

    #[test]
    fn test_deduplicate_merges_and_logs() {
        let mut full = recipe("김치 찌개", &["돼지고기"]);
        full.steps = vec!["끓인다".to_string()];
        let records = vec![
            recipe("김치찌개", &["돼지고기"]),
            recipe("잡채", &["당면"]),
            full,
        ];

        let output = deduplicate(records, &DedupeConfig::default());
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[0].name, "김치 찌개");
        assert_eq!(output.records[0].merged_from.len(), 2);
        assert_eq!(output.records[1].name, "잡채");
        assert!(output.records[1].merged_from.is_empty());

        assert_eq!(
            output.duplicates,
            vec![DuplicateLogEntry {
                indices: vec![0, 2],
                names: vec!["김치찌개".to_string(), "김치 찌개".to_string()],
                count: 2,
            }]
        );
        assert_eq!(
            output.stats,
            DedupeStats {
                input: 3,
                groups: 1,
                removed: 1,
                output: 2,
            }
        );
    }
}
