// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration: the declarative entity document and the engine's own settings.

pub mod entity;
pub mod project;
pub mod settings;

pub use entity::{
    is_value_reference, AppendBlock, DropDuplicates, EntityConfig, EntityType, ForeignKey,
    UnnestSpec,
};
pub use project::{DataSourceRegistry, ProjectConfig};
pub use settings::{FlatConfig, PropertySource, ValidatorSettings};
