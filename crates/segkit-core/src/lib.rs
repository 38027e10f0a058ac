// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for segkit: segments, result records, errors and the
//! execution context threaded through the analysis stages.

pub mod diagnostics;
pub mod error;
pub mod execution_context;
pub mod observability;
pub mod repro;
pub mod results;
pub mod segment;

pub use diagnostics::{PairScanStats, StageDiagnostics};
pub use error::SegError;
pub use execution_context::AnalysisContext;
#[cfg(feature = "tracing")]
pub use observability::TracingEventSink;
pub use observability::{AnalysisEvent, EventSink, ProgressSink};
pub use repro::ReproMode;
pub use results::{ClosestPair, Cluster, SubarrayResult};
pub use segment::{
    DEFAULT_MAX_SEGMENTS, DEFAULT_MAX_WINDOWS, DEFAULT_MIN_STD, Segment, SegmentFeatures,
    SegmentOrigin, WindowConfig, count_sign_changes, is_informative, mean_and_std, window_signal,
    window_signals,
};
