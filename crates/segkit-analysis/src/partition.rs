// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::elapsed_ms;
use crate::features::{SplitFeatures, max_variance_dimension, median};
use segkit_core::{AnalysisContext, AnalysisEvent, Cluster, SegError, Segment, StageDiagnostics};
use std::time::Instant;

const DEFAULT_MIN_CLUSTER_SIZE: usize = 5;
const DEFAULT_MAX_DEPTH: usize = 5;

/// Configuration for [`RecursivePartitioner`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Groups at or below this size become terminal clusters. Must be >= 1.
    pub min_cluster_size: usize,
    /// Maximum number of splits along any path.
    pub max_depth: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl PartitionConfig {
    pub fn validate(&self) -> Result<(), SegError> {
        if self.min_cluster_size == 0 {
            return Err(SegError::invalid_input(
                "min_cluster_size must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// Partition plus run metadata.
#[derive(Clone, Debug)]
pub struct PartitionOutput<'a> {
    pub clusters: Vec<Cluster<'a>>,
    /// Deepest split level at which a terminal cluster was emitted.
    pub depth_reached: usize,
    pub diagnostics: StageDiagnostics,
}

/// Variance-driven, axis-aligned recursive splitter.
#[derive(Clone, Debug)]
pub struct RecursivePartitioner {
    config: PartitionConfig,
}

struct Frame {
    members: Vec<usize>,
    depth: usize,
}

impl RecursivePartitioner {
    pub fn new(config: PartitionConfig) -> Result<Self, SegError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Splits `segments` into non-empty clusters covering every input exactly once.
    pub fn partition<'a>(
        &self,
        segments: &'a [Segment],
        ctx: &AnalysisContext<'_>,
    ) -> Vec<Cluster<'a>> {
        self.partition_refs(segments.iter().collect(), ctx).clusters
    }

    pub fn partition_with_diagnostics<'a>(
        &self,
        segments: &'a [Segment],
        ctx: &AnalysisContext<'_>,
    ) -> PartitionOutput<'a> {
        self.partition_refs(segments.iter().collect(), ctx)
    }

    /// Same as [`partition`](Self::partition) over an arbitrary borrowed subset.
    pub fn partition_refs<'a>(
        &self,
        segments: Vec<&'a Segment>,
        ctx: &AnalysisContext<'_>,
    ) -> PartitionOutput<'a> {
        let started_at = Instant::now();
        let min_cluster_size = self.config.min_cluster_size;
        let mut diagnostics = StageDiagnostics::new("partition");
        diagnostics.inputs = segments.len();
        ctx.emit(AnalysisEvent::PartitionStarted {
            segments: segments.len(),
        });

        if segments.len() <= min_cluster_size {
            ctx.emit(AnalysisEvent::PartitionTooSmall {
                segments: segments.len(),
                min_cluster_size,
            });
            diagnostics.notes.push(format!(
                "input size {} <= min_cluster_size={min_cluster_size}; returned single cluster",
                segments.len()
            ));
            let clusters: Vec<Cluster<'a>> = Cluster::new(segments).into_iter().collect();
            ctx.report_progress(1.0);
            return self.finish(clusters, 0, diagnostics, started_at, ctx);
        }

        // Features depend only on samples, so compute them once per segment.
        let features: Vec<SplitFeatures> = segments
            .iter()
            .map(|segment| SplitFeatures::from_samples(segment.samples()))
            .collect();

        let mut clusters = Vec::new();
        let mut depth_reached = 0usize;
        let mut splits = 0usize;
        let mut covered = 0usize;
        let mut stack = vec![Frame {
            members: (0..segments.len()).collect(),
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            if frame.members.len() <= min_cluster_size || frame.depth >= self.config.max_depth {
                depth_reached = depth_reached.max(frame.depth);
                covered += frame.members.len();
                let members = frame.members.iter().map(|&idx| segments[idx]).collect();
                clusters.extend(Cluster::new(members));
                ctx.report_progress(covered as f32 / segments.len() as f32);
                continue;
            }

            let frame_features: Vec<SplitFeatures> =
                frame.members.iter().map(|&idx| features[idx]).collect();
            let (dim, _) = max_variance_dimension(&frame_features);
            let column: Vec<f64> = frame_features.iter().map(|f| f.value(dim)).collect();
            // Non-empty here: the frame holds more than min_cluster_size >= 1 members.
            let Some(split_value) = median(&column) else {
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = frame
                .members
                .into_iter()
                .partition(|&idx| features[idx].value(dim) <= split_value);
            splits += 1;

            // Right is pushed first so the left side is emitted first.
            let depth = frame.depth + 1;
            if !right.is_empty() {
                stack.push(Frame {
                    members: right,
                    depth,
                });
            }
            if !left.is_empty() {
                stack.push(Frame {
                    members: left,
                    depth,
                });
            }
        }

        diagnostics.notes.push(format!(
            "min_cluster_size={min_cluster_size}, max_depth={}, splits={splits}",
            self.config.max_depth
        ));
        self.finish(clusters, depth_reached, diagnostics, started_at, ctx)
    }

    fn finish<'a>(
        &self,
        clusters: Vec<Cluster<'a>>,
        depth_reached: usize,
        mut diagnostics: StageDiagnostics,
        started_at: Instant,
        ctx: &AnalysisContext<'_>,
    ) -> PartitionOutput<'a> {
        diagnostics.outputs = clusters.len();
        diagnostics.runtime_ms = Some(elapsed_ms(started_at));
        ctx.emit(AnalysisEvent::PartitionCompleted {
            cluster_sizes: clusters.iter().map(Cluster::len).collect(),
        });
        PartitionOutput {
            clusters,
            depth_reached,
            diagnostics,
        }
    }
}
