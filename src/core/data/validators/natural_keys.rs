// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{EntityDataContext, EntityDataValidator};
use crate::core::data::sample::CellValue;
use crate::core::validation::issue::{codes, Priority, ValidationIssue};

/// Maximum duplicate tuples quoted in one message
const MAX_REPORTED: usize = 5;

/// Declared `keys` are unique in the sample
///
/// Skipped when `drop_duplicates` already dedups on the keys, or when a key
/// column is missing (the column check reports that).
pub struct NaturalKeyUniquenessValidator;

impl EntityDataValidator for NaturalKeyUniquenessValidator {
    fn name(&self) -> &'static str {
        "natural_key_uniqueness"
    }

    fn validate(&self, ctx: &EntityDataContext<'_>) -> Vec<ValidationIssue> {
        let entity = ctx.entity;
        if entity.keys.is_empty() {
            return Vec::new();
        }
        if entity
            .drop_duplicates
            .as_ref()
            .is_some_and(|dd| dd.covers_keys(&entity.keys))
        {
            return Vec::new();
        }

        let Some(duplicates) = ctx.sample.duplicate_keys(&entity.keys) else {
            return Vec::new();
        };
        if duplicates.is_empty() {
            return Vec::new();
        }

        let shown: Vec<String> = duplicates
            .iter()
            .take(MAX_REPORTED)
            .map(|(values, count)| format!("{} ×{}", format_tuple(values), count))
            .collect();
        let more = duplicates.len().saturating_sub(MAX_REPORTED);
        let mut listing = shown.join(", ");
        if more > 0 {
            listing.push_str(&format!(" and {} more", more));
        }

        vec![ValidationIssue::data_error(
            codes::DUPLICATE_NATURAL_KEYS,
            format!(
                "Entity '{}' has {} duplicated key value(s) for [{}] in a {}-row sample: {}",
                entity.name,
                duplicates.len(),
                entity.keys.join(", "),
                ctx.sample.row_count(),
                listing
            ),
        )
        .with_entity(&entity.name)
        .with_field("keys")
        .with_priority(Priority::High)
        .with_suggestion("Review the source data, choose different keys, or enable drop_duplicates on the keys")]
    }
}

fn format_tuple(values: &[CellValue]) -> String {
    let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}
