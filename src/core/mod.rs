// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod config;
pub mod data;
pub mod error;
pub mod fix;
pub mod persistence;
pub mod service;
pub mod util;
pub mod validation;

pub use self::error::{ValidatorError, ValidatorResult};
pub use self::service::{GraphReport, ValidationOptions, ValidationService};
