// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;

/// Counters describing one pair-search run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairScanStats {
    pub pairs_compared: usize,
    pub pairs_failed: usize,
    pub clusters_skipped: usize,
    pub sequences_downsampled: usize,
}

/// Per-stage run metadata.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct StageDiagnostics {
    pub stage: Cow<'static, str>,
    pub engine_version: Option<String>,
    pub runtime_ms: Option<u64>,
    pub inputs: usize,
    pub outputs: usize,
    pub parallel: bool,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub pair_stats: Option<PairScanStats>,
}

impl StageDiagnostics {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage: Cow::Borrowed(stage),
            ..Self::default()
        }
    }
}

impl Default for StageDiagnostics {
    fn default() -> Self {
        Self {
            stage: Cow::Borrowed(""),
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: None,
            inputs: 0,
            outputs: 0,
            parallel: false,
            notes: vec![],
            warnings: vec![],
            pair_stats: None,
        }
    }
}
