// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::pairs::{NearestPairFinder, PairSearchConfig};
use crate::partition::{PartitionConfig, RecursivePartitioner};
use crate::subarray::MaxSubarrayAnalyzer;
use segkit_core::{
    AnalysisContext, ClosestPair, Cluster, SegError, Segment, StageDiagnostics, SubarrayResult,
};

/// Combined configuration for [`analyze_all`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub partition: PartitionConfig,
    pub pairs: PairSearchConfig,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), SegError> {
        self.partition.validate()?;
        self.pairs.validate()
    }
}

/// Aggregate statistics over one analysis run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportSummary {
    pub total_segments: usize,
    pub cluster_count: usize,
    pub min_cluster_size: Option<usize>,
    pub max_cluster_size: Option<usize>,
    pub mean_pair_distance: Option<f64>,
    pub min_pair_distance: Option<f64>,
    pub max_subarray_sum: Option<f64>,
    pub mean_subarray_sum: Option<f64>,
}

impl ReportSummary {
    pub fn from_results(
        total_segments: usize,
        clusters: &[Cluster<'_>],
        pairs: &[ClosestPair<'_>],
        subarrays: &[SubarrayResult],
    ) -> Self {
        let distances: Vec<f64> = pairs.iter().map(|pair| pair.distance).collect();
        let sums: Vec<f64> = subarrays.iter().map(|result| result.max_sum).collect();
        Self {
            total_segments,
            cluster_count: clusters.len(),
            min_cluster_size: clusters.iter().map(Cluster::len).min(),
            max_cluster_size: clusters.iter().map(Cluster::len).max(),
            mean_pair_distance: mean(&distances),
            min_pair_distance: distances.iter().copied().reduce(f64::min),
            max_subarray_sum: sums.iter().copied().reduce(f64::max),
            mean_subarray_sum: mean(&sums),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Outputs of all three stages over one batch.
#[derive(Clone, Debug)]
pub struct AnalysisReport<'a> {
    pub clusters: Vec<Cluster<'a>>,
    pub closest_pairs: Vec<ClosestPair<'a>>,
    pub subarrays: Vec<SubarrayResult>,
    pub summary: ReportSummary,
    pub diagnostics: Vec<StageDiagnostics>,
}

/// Runs partitioning, pair search and the subarray scan over `segments`.
///
/// Only configuration errors and the `Error` length-mismatch policy fail the
/// call; degenerate inputs produce empty or single-cluster results.
pub fn analyze_all<'a>(
    segments: &'a [Segment],
    config: &AnalysisConfig,
    ctx: &AnalysisContext<'_>,
) -> Result<AnalysisReport<'a>, SegError> {
    config.validate()?;
    let partitioner = RecursivePartitioner::new(config.partition.clone())?;
    let finder = NearestPairFinder::new(config.pairs.clone())?;
    let analyzer = MaxSubarrayAnalyzer::new();

    let subarray = analyzer.analyze_with_diagnostics(segments, ctx);
    let partition = partitioner.partition_with_diagnostics(segments, ctx);
    let pairs = finder.find_with_diagnostics(&partition.clusters, ctx)?;

    let summary = ReportSummary::from_results(
        segments.len(),
        &partition.clusters,
        &pairs.pairs,
        &subarray.results,
    );

    Ok(AnalysisReport {
        clusters: partition.clusters,
        closest_pairs: pairs.pairs,
        subarrays: subarray.results,
        summary,
        diagnostics: vec![
            partition.diagnostics,
            pairs.diagnostics,
            subarray.diagnostics,
        ],
    })
}
