// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod config_store;

pub use config_store::{ConfigStore, FileConfigStore, InMemoryConfigStore};
