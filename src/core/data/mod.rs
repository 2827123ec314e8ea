// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-aware validation over sampled entity rows.

pub mod file_sampler;
pub mod sample;
pub mod sampler;
pub mod suite;
pub mod validators;

pub use file_sampler::JsonFileSampler;
pub use sample::{CellValue, InferredType, Sample};
pub use sampler::{DataSampler, SampleCache, SampleFetcher, TtlSampleCache};
pub use suite::DataValidationSuite;
pub use validators::{analyze_join, Cardinality, JoinStatistics};
