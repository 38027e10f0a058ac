// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! The three segkit stages: recursive partitioning, nearest-pair search and
//! per-segment maximum-subarray scans.

pub mod features;
pub mod pairs;
pub mod partition;
pub mod report;
pub mod subarray;

pub use features::{SplitDimension, SplitFeatures};
pub use pairs::{
    LengthMismatchPolicy, NearestPairFinder, PairSearchConfig, PairSearchOutput, downsample,
    euclidean_distance,
};
pub use partition::{PartitionConfig, PartitionOutput, RecursivePartitioner};
pub use report::{AnalysisConfig, AnalysisReport, ReportSummary, analyze_all};
pub use subarray::{MaxRun, MaxSubarrayAnalyzer, SubarrayOutput, max_subarray};

use std::time::Instant;

pub(crate) fn elapsed_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
