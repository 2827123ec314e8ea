// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-aware validators: checks that need sampled rows.
//!
//! Entity validators see one entity's sample; foreign-key validators see the
//! local and remote samples of one declared join.

mod columns;
mod empty_result;
mod foreign_key_integrity;
mod natural_keys;
mod type_compat;

pub use columns::ColumnExistenceValidator;
pub use empty_result::EmptyResultValidator;
pub use foreign_key_integrity::{
    analyze_join, Cardinality, ForeignKeyIntegrityValidator, JoinStatistics,
};
pub use natural_keys::NaturalKeyUniquenessValidator;
pub use type_compat::TypeCompatibilityValidator;

use super::sample::Sample;
use crate::core::config::{EntityConfig, ForeignKey, ProjectConfig};
use crate::core::validation::issue::ValidationIssue;

/// Inputs of a per-entity data check
pub struct EntityDataContext<'a> {
    pub config: &'a ProjectConfig,
    pub entity: &'a EntityConfig,
    pub sample: &'a Sample,
}

/// Inputs of a per-foreign-key data check
pub struct ForeignKeyDataContext<'a> {
    pub entity: &'a EntityConfig,
    /// Position in the entity's `foreign_keys` list
    pub index: usize,
    pub foreign_key: &'a ForeignKey,
    pub local: &'a Sample,
    pub remote: &'a Sample,
    /// Minimum acceptable match percentage
    pub match_threshold: f64,
}

impl ForeignKeyDataContext<'_> {
    /// Issue field path for a key of this foreign key
    pub fn field(&self, suffix: &str) -> String {
        format!("foreign_keys[{}].{}", self.index, suffix)
    }

    pub fn remote_name(&self) -> &str {
        self.foreign_key.entity.as_deref().unwrap_or("?")
    }
}

pub trait EntityDataValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, ctx: &EntityDataContext<'_>) -> Vec<ValidationIssue>;
}

pub trait ForeignKeyDataValidator: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, ctx: &ForeignKeyDataContext<'_>) -> Vec<ValidationIssue>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core::data::sample::{CellValue, Sample};

    /// Single-column integer sample
    pub(crate) fn ints(column: &str, values: impl IntoIterator<Item = i64>) -> Sample {
        Sample::new(
            vec![column.to_string()],
            values.into_iter().map(|v| vec![CellValue::Integer(v)]).collect(),
        )
    }

    /// Single-column text sample
    pub(crate) fn texts(column: &str, values: &[&str]) -> Sample {
        Sample::new(
            vec![column.to_string()],
            values.iter().map(|v| vec![CellValue::from(*v)]).collect(),
        )
    }
}
