// SPDX-License-Identifier: MIT OR Apache-2.0

//! Foreign-key referential integrity over sampled rows.
//!
//! A left-join test: every local row whose key tuple appears among the
//! remote key tuples is matched. Null keys never match.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{ForeignKeyDataContext, ForeignKeyDataValidator};
use crate::core::data::sample::{CellKey, Sample};
use crate::core::validation::issue::{codes, IssueCategory, Priority, Severity, ValidationIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one_to_one",
            Cardinality::OneToMany => "one_to_many",
            Cardinality::ManyToOne => "many_to_one",
            Cardinality::ManyToMany => "many_to_many",
        }
    }
}

/// Outcome of joining a local sample to a remote sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinStatistics {
    pub local_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    /// Local rows with a null in any key column
    pub null_key_rows: usize,
    /// Matched share of local rows, 0..=100, two decimals
    pub match_percentage: f64,
    pub cardinality: Cardinality,
}

/// Join statistics for `local_keys → remote_keys`
///
/// Returns `None` when a key column is missing from either sample.
pub fn analyze_join(
    local: &Sample,
    local_keys: &[String],
    remote: &Sample,
    remote_keys: &[String],
) -> Option<JoinStatistics> {
    let local_tuples = local.key_tuples(local_keys)?;
    let remote_tuples = remote.key_tuples(remote_keys)?;

    let remote_set: HashSet<&Vec<CellKey>> = remote_tuples.iter().filter(|t| !has_null(t)).collect();

    let mut matched_rows = 0;
    let mut null_key_rows = 0;
    for tuple in &local_tuples {
        if has_null(tuple) {
            null_key_rows += 1;
        } else if remote_set.contains(tuple) {
            matched_rows += 1;
        }
    }

    let local_rows = local_tuples.len();
    let match_percentage = if local_rows == 0 {
        100.0
    } else {
        (matched_rows as f64 / local_rows as f64 * 10_000.0).round() / 100.0
    };

    let cardinality = match (repeats(&local_tuples), repeats(&remote_tuples)) {
        (false, false) => Cardinality::OneToOne,
        (false, true) => Cardinality::OneToMany,
        (true, false) => Cardinality::ManyToOne,
        (true, true) => Cardinality::ManyToMany,
    };

    Some(JoinStatistics {
        local_rows,
        matched_rows,
        unmatched_rows: local_rows - matched_rows,
        null_key_rows,
        match_percentage,
        cardinality,
    })
}

fn has_null(tuple: &[CellKey]) -> bool {
    tuple.iter().any(|k| *k == CellKey::Null)
}

/// Whether any non-null key tuple occurs more than once
fn repeats(tuples: &[Vec<CellKey>]) -> bool {
    let mut counts: HashMap<&Vec<CellKey>, usize> = HashMap::with_capacity(tuples.len());
    tuples.iter().filter(|t| !has_null(t)).any(|t| {
        let count = counts.entry(t).or_insert(0);
        *count += 1;
        *count > 1
    })
}

/// Join keys exist on both sides and local rows find their remote match
///
/// Unmatched rows below the match threshold are high priority, otherwise
/// medium. A many-to-many join is flagged as a fan-out risk.
pub struct ForeignKeyIntegrityValidator;

impl ForeignKeyDataValidator for ForeignKeyIntegrityValidator {
    fn name(&self) -> &'static str {
        "foreign_key_integrity"
    }

    fn validate(&self, ctx: &ForeignKeyDataContext<'_>) -> Vec<ValidationIssue> {
        let fk = ctx.foreign_key;
        let entity = &ctx.entity.name;
        let remote_name = ctx.remote_name();
        if fk.is_cross() || fk.local_keys.is_empty() || fk.remote_keys.is_empty() {
            return Vec::new();
        }

        let mut issues = Vec::new();
        for (side, sample, keys, owner) in [
            ("local_keys", ctx.local, &fk.local_keys, entity.as_str()),
            ("remote_keys", ctx.remote, &fk.remote_keys, remote_name),
        ] {
            for key in keys.iter().filter(|k| !sample.has_column(k)) {
                issues.push(
                    ValidationIssue::data_error(
                        codes::FK_COLUMN_NOT_FOUND,
                        format!(
                            "Foreign key {} → {}: column '{}' not found in '{}' sample",
                            entity, remote_name, key, owner
                        ),
                    )
                    .with_entity(entity.as_str())
                    .with_field(ctx.field(side))
                    .with_priority(Priority::High),
                );
            }
        }
        if !issues.is_empty() {
            return issues;
        }

        let Some(stats) = analyze_join(ctx.local, &fk.local_keys, ctx.remote, &fk.remote_keys) else {
            return issues;
        };
        log::debug!(
            "Join {} → {}: {}/{} matched ({:.2}%), {}",
            entity,
            remote_name,
            stats.matched_rows,
            stats.local_rows,
            stats.match_percentage,
            stats.cardinality.as_str()
        );

        if stats.unmatched_rows > 0 {
            let priority = if stats.match_percentage < ctx.match_threshold {
                Priority::High
            } else {
                Priority::Medium
            };
            issues.push(
                ValidationIssue::data_warning(
                    codes::FK_UNMATCHED_ROWS,
                    format!(
                        "Foreign key {} → {}: {} of {} sampled rows have no match ({:.1}% matched, {})",
                        entity,
                        remote_name,
                        stats.unmatched_rows,
                        stats.local_rows,
                        stats.match_percentage,
                        stats.cardinality.as_str()
                    ),
                )
                .with_entity(entity.as_str())
                .with_field(ctx.field("local_keys"))
                .with_priority(priority)
                .with_suggestion(format!(
                    "Check that every [{}] value exists in {}.[{}]",
                    fk.local_keys.join(", "),
                    remote_name,
                    fk.remote_keys.join(", ")
                )),
            );
        }

        if stats.cardinality == Cardinality::ManyToMany {
            issues.push(
                ValidationIssue::new(
                    Severity::Warning,
                    IssueCategory::Performance,
                    codes::JOIN_FANOUT,
                    format!(
                        "Foreign key {} → {} is many-to-many; the join will multiply rows",
                        entity, remote_name
                    ),
                )
                .with_entity(entity.as_str())
                .with_field(ctx.field("remote_keys"))
                .with_priority(Priority::Medium)
                .with_suggestion(format!(
                    "Make [{}] unique in '{}' or add keys to the join",
                    fk.remote_keys.join(", "),
                    remote_name
                )),
            );
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{EntityConfig, ForeignKey};
    use crate::core::data::sample::CellValue;
    use crate::core::data::validators::test_support::ints;

    fn keys(k: &[&str]) -> Vec<String> {
        k.iter().map(|s| s.to_string()).collect()
    }

    fn orders_fk() -> (EntityConfig, ForeignKey) {
        let value: serde_yaml::Value = serde_yaml::from_str(
            "columns: [order_id, user_id]\nkeys: [order_id]\nforeign_keys:\n  - entity: users\n    local_keys: [user_id]\n    remote_keys: [id]\n",
        )
        .unwrap();
        let entity = EntityConfig::from_value("orders", &value);
        let fk = entity.foreign_keys[0].clone();
        (entity, fk)
    }

    fn run(local: &Sample, remote: &Sample) -> Vec<ValidationIssue> {
        let (entity, fk) = orders_fk();
        ForeignKeyIntegrityValidator.validate(&ForeignKeyDataContext {
            entity: &entity,
            index: 0,
            foreign_key: &fk,
            local,
            remote,
            match_threshold: 90.0,
        })
    }

    /// 1000 orders over 100 users; every 20th order points at a missing user
    fn orders_950_of_1000() -> Sample {
        ints("user_id", (0..1000).map(|i| if i % 20 == 0 { 10_000 + i } else { i % 100 }))
    }

    #[test]
    fn test_many_to_one_at_95_percent_is_medium() {
        let local = orders_950_of_1000();
        let remote = ints("id", 0..100);

        let stats = analyze_join(&local, &keys(&["user_id"]), &remote, &keys(&["id"])).unwrap();
        assert_eq!(stats.matched_rows, 950);
        assert_eq!(stats.match_percentage, 95.0);
        assert_eq!(stats.cardinality, Cardinality::ManyToOne);

        let issues = run(&local, &remote);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::FK_UNMATCHED_ROWS);
        assert_eq!(issues[0].priority, Priority::Medium);
    }

    #[test]
    fn test_below_threshold_is_high() {
        let local = ints("user_id", (0..10).map(|i| if i < 5 { i } else { 100 + i }));
        let remote = ints("id", 0..10);
        let issues = run(&local, &remote);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].priority, Priority::High);
    }

    #[test]
    fn test_full_match_has_no_issue() {
        let issues = run(&ints("user_id", [1, 2, 3]), &ints("id", [1, 2, 3, 4]));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_missing_key_columns() {
        let issues = run(&ints("customer_id", [1]), &ints("uid", [1]));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.code == codes::FK_COLUMN_NOT_FOUND));
        assert_eq!(issues[0].field.as_deref(), Some("foreign_keys[0].local_keys"));
        assert_eq!(issues[1].field.as_deref(), Some("foreign_keys[0].remote_keys"));
    }

    #[test]
    fn test_many_to_many_flags_fanout() {
        let issues = run(&ints("user_id", [1, 1, 2]), &ints("id", [1, 1, 2]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::JOIN_FANOUT);
        assert_eq!(issues[0].category, IssueCategory::Performance);
    }

    #[test]
    fn test_null_keys_never_match() {
        let local = Sample::new(
            vec!["user_id".into()],
            vec![vec![CellValue::Null], vec![CellValue::Integer(1)]],
        );
        let stats = analyze_join(&local, &keys(&["user_id"]), &ints("id", [1]), &keys(&["id"])).unwrap();
        assert_eq!(stats.null_key_rows, 1);
        assert_eq!(stats.unmatched_rows, 1);
        assert_eq!(stats.match_percentage, 50.0);
        assert_eq!(stats.cardinality, Cardinality::OneToOne);
    }

    #[test]
    fn test_empty_local_sample() {
        let stats = analyze_join(&ints("user_id", []), &keys(&["user_id"]), &ints("id", [1]), &keys(&["id"])).unwrap();
        assert_eq!(stats.match_percentage, 100.0);
        assert_eq!(stats.unmatched_rows, 0);
    }
}
