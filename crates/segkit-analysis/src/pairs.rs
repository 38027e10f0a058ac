// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::elapsed_ms;
use segkit_core::{
    AnalysisContext, AnalysisEvent, ClosestPair, Cluster, PairScanStats, SegError, Segment,
    StageDiagnostics,
};
use std::borrow::Cow;
use std::time::Instant;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

pub const DEFAULT_DOWNSAMPLE_THRESHOLD: usize = 100;
pub const DEFAULT_DOWNSAMPLE_STRIDE: usize = 10;

/// What to do when two (possibly downsampled) sequences differ in length.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LengthMismatchPolicy {
    /// Report the pair as failed and keep scanning.
    #[default]
    Skip,
    /// Compare the common prefix only.
    Truncate,
    /// Abort the whole search with `SegError::InvalidInput`.
    Error,
}

impl LengthMismatchPolicy {
    pub fn parse(raw: &str) -> Result<Self, SegError> {
        match raw.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "truncate" => Ok(Self::Truncate),
            "error" => Ok(Self::Error),
            _ => Err(SegError::invalid_input(format!(
                "invalid length mismatch policy '{raw}'; expected one of: skip, truncate, error"
            ))),
        }
    }
}

/// Configuration for [`NearestPairFinder`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairSearchConfig {
    /// Sequences strictly longer than this are downsampled before comparison.
    pub downsample_threshold: usize,
    pub downsample_stride: usize,
    pub length_mismatch: LengthMismatchPolicy,
}

impl Default for PairSearchConfig {
    fn default() -> Self {
        Self {
            downsample_threshold: DEFAULT_DOWNSAMPLE_THRESHOLD,
            downsample_stride: DEFAULT_DOWNSAMPLE_STRIDE,
            length_mismatch: LengthMismatchPolicy::Skip,
        }
    }
}

impl PairSearchConfig {
    pub fn validate(&self) -> Result<(), SegError> {
        if self.downsample_stride == 0 {
            return Err(SegError::invalid_input(
                "downsample_stride must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// Keeps every `stride`-th sample (starting at index 0) when `samples` is
/// longer than `threshold`; otherwise borrows the input unchanged.
pub fn downsample(samples: &[f64], threshold: usize, stride: usize) -> Cow<'_, [f64]> {
    if samples.len() > threshold && stride > 1 {
        Cow::Owned(samples.iter().step_by(stride).copied().collect())
    } else {
        Cow::Borrowed(samples)
    }
}

/// Euclidean distance between equal-length sequences.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Result<f64, SegError> {
    if a.len() != b.len() {
        return Err(SegError::invalid_input(format!(
            "sequence length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(squared_sum(a, b).sqrt())
}

fn squared_sum(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Closest pairs plus run metadata.
#[derive(Clone, Debug)]
pub struct PairSearchOutput<'a> {
    pub pairs: Vec<ClosestPair<'a>>,
    pub diagnostics: StageDiagnostics,
}

/// Exhaustive all-pairs search for the closest member pair in each cluster.
#[derive(Clone, Debug, Default)]
pub struct NearestPairFinder {
    config: PairSearchConfig,
}

#[derive(Debug)]
struct PairFailure {
    first: usize,
    second: usize,
    reason: String,
}

#[derive(Debug, Default)]
struct ClusterScan {
    best: Option<(usize, usize, f64)>,
    compared: usize,
    downsampled: usize,
    failures: Vec<PairFailure>,
}

impl NearestPairFinder {
    pub fn new(config: PairSearchConfig) -> Result<Self, SegError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PairSearchConfig {
        &self.config
    }

    /// Distance between two segments after applying the downsampling rule.
    pub fn distance(&self, first: &Segment, second: &Segment) -> Result<f64, SegError> {
        let a = self.prepare(first.samples());
        let b = self.prepare(second.samples());
        self.compare(&a, &b)
    }

    /// One record per cluster with >= 2 members and at least one successful comparison.
    pub fn find_closest_pairs<'a>(
        &self,
        clusters: &[Cluster<'a>],
        ctx: &AnalysisContext<'_>,
    ) -> Result<Vec<ClosestPair<'a>>, SegError> {
        Ok(self.find_with_diagnostics(clusters, ctx)?.pairs)
    }

    pub fn find_with_diagnostics<'a>(
        &self,
        clusters: &[Cluster<'a>],
        ctx: &AnalysisContext<'_>,
    ) -> Result<PairSearchOutput<'a>, SegError> {
        let started_at = Instant::now();
        let mut diagnostics = StageDiagnostics::new("pairs");
        diagnostics.inputs = clusters.len();
        diagnostics.notes.push(format!(
            "downsample_threshold={}, downsample_stride={}, length_mismatch={:?}",
            self.config.downsample_threshold,
            self.config.downsample_stride,
            self.config.length_mismatch
        ));

        let (scans, parallel) = self.scan_all(clusters, ctx);
        diagnostics.parallel = parallel;

        let mut stats = PairScanStats::default();
        let mut pairs = Vec::new();
        for (cluster_index, (cluster, scan)) in clusters.iter().zip(scans).enumerate() {
            let progress = (cluster_index + 1) as f32 / clusters.len() as f32;
            let members = cluster.members();
            if members.len() < 2 {
                stats.clusters_skipped += 1;
                ctx.emit(AnalysisEvent::ClusterTooSmall {
                    cluster_index,
                    size: members.len(),
                });
                ctx.report_progress(progress);
                continue;
            }

            let scan = scan?;
            stats.pairs_compared += scan.compared;
            stats.pairs_failed += scan.failures.len();
            stats.sequences_downsampled += scan.downsampled;
            for failure in scan.failures {
                ctx.emit(AnalysisEvent::PairComparisonFailed {
                    cluster_index,
                    first_id: members[failure.first].id(),
                    second_id: members[failure.second].id(),
                    reason: failure.reason,
                });
            }

            match scan.best {
                Some((i, j, distance)) => {
                    ctx.emit(AnalysisEvent::ClosestPairFound {
                        cluster_index,
                        first_id: members[i].id(),
                        second_id: members[j].id(),
                        distance,
                    });
                    pairs.push(ClosestPair {
                        cluster_index,
                        first: members[i],
                        second: members[j],
                        distance,
                    });
                }
                None => diagnostics.warnings.push(format!(
                    "cluster {cluster_index}: no pair could be compared"
                )),
            }
            ctx.report_progress(progress);
        }

        if stats.pairs_failed > 0 {
            diagnostics.warnings.push(format!(
                "{} pair comparisons failed and were skipped",
                stats.pairs_failed
            ));
        }
        diagnostics.outputs = pairs.len();
        diagnostics.pair_stats = Some(stats);
        diagnostics.runtime_ms = Some(elapsed_ms(started_at));
        Ok(PairSearchOutput { pairs, diagnostics })
    }

    #[cfg(feature = "rayon")]
    fn scan_all(
        &self,
        clusters: &[Cluster<'_>],
        ctx: &AnalysisContext<'_>,
    ) -> (Vec<Result<ClusterScan, SegError>>, bool) {
        if ctx.parallel_allowed() && clusters.len() > 1 {
            let scans = clusters
                .par_iter()
                .map(|cluster| self.scan_cluster(cluster.members()))
                .collect();
            return (scans, true);
        }
        (self.scan_sequential(clusters), false)
    }

    #[cfg(not(feature = "rayon"))]
    fn scan_all(
        &self,
        clusters: &[Cluster<'_>],
        _ctx: &AnalysisContext<'_>,
    ) -> (Vec<Result<ClusterScan, SegError>>, bool) {
        (self.scan_sequential(clusters), false)
    }

    fn scan_sequential(&self, clusters: &[Cluster<'_>]) -> Vec<Result<ClusterScan, SegError>> {
        clusters
            .iter()
            .map(|cluster| self.scan_cluster(cluster.members()))
            .collect()
    }

    fn scan_cluster(&self, members: &[&Segment]) -> Result<ClusterScan, SegError> {
        let mut scan = ClusterScan::default();
        if members.len() < 2 {
            return Ok(scan);
        }

        let prepared: Vec<Cow<'_, [f64]>> = members
            .iter()
            .map(|segment| self.prepare(segment.samples()))
            .collect();
        scan.downsampled = prepared
            .iter()
            .filter(|seq| matches!(seq, Cow::Owned(_)))
            .count();

        let mut min_dist = f64::INFINITY;
        for i in 0..prepared.len() {
            for j in (i + 1)..prepared.len() {
                match self.compare(&prepared[i], &prepared[j]) {
                    Ok(dist) => {
                        scan.compared += 1;
                        if dist < min_dist {
                            min_dist = dist;
                            scan.best = Some((i, j, dist));
                        }
                    }
                    Err(err) => match self.config.length_mismatch {
                        LengthMismatchPolicy::Error => {
                            return Err(err.with_context(format!(
                                "segments {} and {}",
                                members[i].id(),
                                members[j].id()
                            )));
                        }
                        _ => scan.failures.push(PairFailure {
                            first: i,
                            second: j,
                            reason: err.message().to_string(),
                        }),
                    },
                }
            }
        }
        Ok(scan)
    }

    fn prepare<'s>(&self, samples: &'s [f64]) -> Cow<'s, [f64]> {
        downsample(
            samples,
            self.config.downsample_threshold,
            self.config.downsample_stride,
        )
    }

    fn compare(&self, a: &[f64], b: &[f64]) -> Result<f64, SegError> {
        if self.config.length_mismatch == LengthMismatchPolicy::Truncate {
            let len = a.len().min(b.len());
            return Ok(squared_sum(&a[..len], &b[..len]).sqrt());
        }
        let dist = euclidean_distance(a, b)?;
        if dist.is_nan() {
            return Err(SegError::numerical_issue("distance evaluated to NaN"));
        }
        Ok(dist)
    }
}
