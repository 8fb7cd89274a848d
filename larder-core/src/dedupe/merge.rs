//! Completeness ranking and conflict-resolving merge of duplicate groups.

use std::cmp::Reverse;

use crate::types::{is_present, RecipeRecord};

/// Score a record by which informative fields it has populated.
///
/// | field            | weight |
/// |------------------|--------|
/// | steps            | 20     |
/// | ingredients      | 20     |
/// | calories > 0     | 15     |
/// | description      | 10     |
/// | time_minutes > 0 | 10     |
/// | tips             | 5      |
/// | difficulty       | 5      |
/// | servings > 0     | 5      |
/// | cuisine          | 5      |
/// | category         | 5      |
pub fn completeness(record: &RecipeRecord) -> u32 {
    let weights: [(bool, u32); 10] = [
        (!record.steps.is_empty(), 20),
        (!record.ingredients.is_empty(), 20),
        (record.nutrition.calories > 0.0, 15),
        (is_present(&record.description), 10),
        (record.time_minutes > 0, 10),
        (is_present(&record.tips), 5),
        (is_present(&record.difficulty), 5),
        (record.servings > 0, 5),
        (is_present(&record.cuisine), 5),
        (is_present(&record.category), 5),
    ];

    weights
        .iter()
        .filter(|(populated, _)| *populated)
        .map(|(_, weight)| weight)
        .sum()
}

/// Merge a duplicate group into one record.
///
/// A single record comes back unchanged. Otherwise the most complete record
/// (earliest on ties) is the base; later records in rank order only fill
/// gaps in it:
/// - `description` and `tips` when the base has none
/// - the whole nutrition profile when the base has no calories
///
/// `merged_from` becomes the provenance names of every member, plus any
/// names the members had already absorbed.
pub fn merge_group(mut group: Vec<RecipeRecord>) -> Option<RecipeRecord> {
    if group.len() <= 1 {
        return group.pop();
    }

    let mut merged_from = std::collections::BTreeSet::new();
    for record in &group {
        merged_from.insert(record.provenance_name().to_string());
        merged_from.extend(record.merged_from.iter().cloned());
    }

    // sort_by_key is stable, so ties keep input order
    group.sort_by_key(|record| Reverse(completeness(record)));

    let mut members = group.into_iter();
    let mut base = members.next()?;

    for member in members {
        if !is_present(&base.description) && is_present(&member.description) {
            base.description = member.description;
        }
        if !is_present(&base.tips) && is_present(&member.tips) {
            base.tips = member.tips;
        }
        if base.nutrition.calories == 0.0 && member.nutrition.calories > 0.0 {
            base.nutrition = member.nutrition;
        }
    }

    base.merged_from = merged_from;
    Some(base)
}
