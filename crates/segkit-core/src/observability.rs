// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Structured events emitted by the analysis stages.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisEvent {
    PartitionStarted {
        segments: usize,
    },
    /// Input was at or below `min_cluster_size`; a single cluster is returned.
    PartitionTooSmall {
        segments: usize,
        min_cluster_size: usize,
    },
    PartitionCompleted {
        cluster_sizes: Vec<usize>,
    },
    /// Cluster has fewer than two members; no pair search is possible.
    ClusterTooSmall {
        cluster_index: usize,
        size: usize,
    },
    PairComparisonFailed {
        cluster_index: usize,
        first_id: u64,
        second_id: u64,
        reason: String,
    },
    ClosestPairFound {
        cluster_index: usize,
        first_id: u64,
        second_id: u64,
        distance: f64,
    },
    SubarrayScanCompleted {
        segments: usize,
    },
}

impl AnalysisEvent {
    /// Short stable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PartitionStarted { .. } => "partition_started",
            Self::PartitionTooSmall { .. } => "partition_too_small",
            Self::PartitionCompleted { .. } => "partition_completed",
            Self::ClusterTooSmall { .. } => "cluster_too_small",
            Self::PairComparisonFailed { .. } => "pair_comparison_failed",
            Self::ClosestPairFound { .. } => "closest_pair_found",
            Self::SubarrayScanCompleted { .. } => "subarray_scan_completed",
        }
    }
}

/// Receiver for structured stage events.
pub trait EventSink {
    fn on_event(&self, event: &AnalysisEvent);
}

/// Receiver for coarse progress updates in `[0.0, 1.0]`.
pub trait ProgressSink {
    fn on_progress(&self, fraction: f32);
}

/// Forwards events to `tracing`.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

#[cfg(feature = "tracing")]
impl EventSink for TracingEventSink {
    fn on_event(&self, event: &AnalysisEvent) {
        match event {
            AnalysisEvent::PartitionStarted { segments } => {
                tracing::info!(event = event.kind(), segments, "clustering segments");
            }
            AnalysisEvent::PartitionTooSmall {
                segments,
                min_cluster_size,
            } => {
                tracing::info!(
                    event = event.kind(),
                    segments,
                    min_cluster_size,
                    "too few segments for clustering, returning single cluster"
                );
            }
            AnalysisEvent::PartitionCompleted { cluster_sizes } => {
                tracing::info!(
                    event = event.kind(),
                    clusters = cluster_sizes.len(),
                    "partition completed"
                );
                for (cluster_index, size) in cluster_sizes.iter().enumerate() {
                    tracing::debug!(cluster_index, size, "cluster size");
                }
            }
            AnalysisEvent::ClusterTooSmall {
                cluster_index,
                size,
            } => {
                tracing::debug!(
                    event = event.kind(),
                    cluster_index,
                    size,
                    "too few segments for closest pair"
                );
            }
            AnalysisEvent::PairComparisonFailed {
                cluster_index,
                first_id,
                second_id,
                reason,
            } => {
                tracing::warn!(
                    event = event.kind(),
                    cluster_index,
                    first_id,
                    second_id,
                    reason = reason.as_str(),
                    "distance computation failed"
                );
            }
            AnalysisEvent::ClosestPairFound {
                cluster_index,
                first_id,
                second_id,
                distance,
            } => {
                tracing::debug!(
                    event = event.kind(),
                    cluster_index,
                    first_id,
                    second_id,
                    distance,
                    "closest pair found"
                );
            }
            AnalysisEvent::SubarrayScanCompleted { segments } => {
                tracing::info!(event = event.kind(), segments, "maximum subarray scan completed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AnalysisEvent;

    #[test]
    fn event_kinds_are_distinct() {
        let events = [
            AnalysisEvent::PartitionStarted { segments: 1 },
            AnalysisEvent::PartitionTooSmall {
                segments: 1,
                min_cluster_size: 5,
            },
            AnalysisEvent::PartitionCompleted {
                cluster_sizes: vec![1],
            },
            AnalysisEvent::ClusterTooSmall {
                cluster_index: 0,
                size: 1,
            },
            AnalysisEvent::PairComparisonFailed {
                cluster_index: 0,
                first_id: 0,
                second_id: 1,
                reason: "length mismatch".to_string(),
            },
            AnalysisEvent::ClosestPairFound {
                cluster_index: 0,
                first_id: 0,
                second_id: 1,
                distance: 0.5,
            },
            AnalysisEvent::SubarrayScanCompleted { segments: 1 },
        ];
        let mut kinds: Vec<_> = events.iter().map(AnalysisEvent::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), events.len());
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn tracing_sink_accepts_every_event_without_subscriber() {
        use super::{EventSink, TracingEventSink};

        let sink = TracingEventSink;
        sink.on_event(&AnalysisEvent::PartitionCompleted {
            cluster_sizes: vec![2, 3],
        });
        sink.on_event(&AnalysisEvent::PairComparisonFailed {
            cluster_index: 1,
            first_id: 2,
            second_id: 3,
            reason: "length mismatch".to_string(),
        });
    }
}
