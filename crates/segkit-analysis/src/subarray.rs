// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::elapsed_ms;
use segkit_core::{AnalysisContext, AnalysisEvent, Segment, StageDiagnostics, SubarrayResult};
use std::time::Instant;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Best contiguous run of one sequence; `start..=end` is inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaxRun {
    pub max_sum: f64,
    pub start: usize,
    pub end: usize,
}

/// Single-pass maximum-subarray scan.
///
/// Empty input returns `{0.0, 0, 0}`. The running sum restarts at the
/// current element whenever it is negative, and the best run only moves on
/// a strictly larger sum, so the leftmost optimum wins.
pub fn max_subarray(samples: &[f64]) -> MaxRun {
    let Some((&first, rest)) = samples.split_first() else {
        return MaxRun {
            max_sum: 0.0,
            start: 0,
            end: 0,
        };
    };

    let mut best = MaxRun {
        max_sum: first,
        start: 0,
        end: 0,
    };
    let mut current = first;
    let mut candidate_start = 0usize;

    for (offset, &value) in rest.iter().enumerate() {
        let idx = offset + 1;
        if current < 0.0 {
            current = value;
            candidate_start = idx;
        } else {
            current += value;
        }

        if current > best.max_sum {
            best = MaxRun {
                max_sum: current,
                start: candidate_start,
                end: idx,
            };
        }
    }

    best
}

/// Subarray results plus run metadata.
#[derive(Clone, Debug)]
pub struct SubarrayOutput {
    pub results: Vec<SubarrayResult>,
    pub diagnostics: StageDiagnostics,
}

/// Per-segment maximum-subarray analysis, independent of clustering.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxSubarrayAnalyzer;

impl MaxSubarrayAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_segment(&self, segment: &Segment) -> SubarrayResult {
        let run = max_subarray(segment.samples());
        SubarrayResult {
            segment_id: segment.id(),
            max_sum: run.max_sum,
            start: run.start,
            end: run.end,
        }
    }

    /// One result per segment, in input order.
    pub fn analyze(&self, segments: &[Segment], ctx: &AnalysisContext<'_>) -> Vec<SubarrayResult> {
        self.analyze_with_diagnostics(segments, ctx).results
    }

    pub fn analyze_with_diagnostics(
        &self,
        segments: &[Segment],
        ctx: &AnalysisContext<'_>,
    ) -> SubarrayOutput {
        let started_at = Instant::now();
        let mut diagnostics = StageDiagnostics::new("subarray");
        diagnostics.inputs = segments.len();

        let (results, parallel) = self.scan_all(segments, ctx);
        diagnostics.parallel = parallel;
        ctx.report_progress(1.0);

        let empty = segments.iter().filter(|segment| segment.is_empty()).count();
        if empty > 0 {
            diagnostics
                .notes
                .push(format!("{empty} empty segments reported as max_sum=0"));
        }
        diagnostics.outputs = results.len();
        diagnostics.runtime_ms = Some(elapsed_ms(started_at));
        ctx.emit(AnalysisEvent::SubarrayScanCompleted {
            segments: segments.len(),
        });
        SubarrayOutput {
            results,
            diagnostics,
        }
    }

    #[cfg(feature = "rayon")]
    fn scan_all(
        &self,
        segments: &[Segment],
        ctx: &AnalysisContext<'_>,
    ) -> (Vec<SubarrayResult>, bool) {
        if ctx.parallel_allowed() && segments.len() > 1 {
            let results = segments
                .par_iter()
                .map(|segment| self.analyze_segment(segment))
                .collect();
            return (results, true);
        }
        (self.scan_sequential(segments), false)
    }

    #[cfg(not(feature = "rayon"))]
    fn scan_all(
        &self,
        segments: &[Segment],
        _ctx: &AnalysisContext<'_>,
    ) -> (Vec<SubarrayResult>, bool) {
        (self.scan_sequential(segments), false)
    }

    fn scan_sequential(&self, segments: &[Segment]) -> Vec<SubarrayResult> {
        segments
            .iter()
            .map(|segment| self.analyze_segment(segment))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{MaxRun, MaxSubarrayAnalyzer, max_subarray};
    use segkit_core::{AnalysisContext, ProgressSink, ReproMode, Segment};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProgress {
        values: Mutex<Vec<f32>>,
    }

    impl ProgressSink for RecordingProgress {
        fn on_progress(&self, fraction: f32) {
            self.values
                .lock()
                .expect("progress mutex should lock")
                .push(fraction);
        }
    }

    #[test]
    fn scan_reports_completion_progress() {
        let segments = vec![Segment::new(0, vec![1.0, -2.0]), Segment::new(1, vec![3.0])];
        let progress = RecordingProgress::default();
        let ctx = AnalysisContext::new().with_progress_sink(&progress);

        let output = MaxSubarrayAnalyzer::new().analyze_with_diagnostics(&segments, &ctx);
        assert_eq!(output.results.len(), 2);
        let values = progress.values.lock().expect("progress mutex should lock");
        assert_eq!(values.last(), Some(&1.0));
    }

    #[test]
    fn classic_fixture() {
        let run = max_subarray(&[-2.0, 1.0, -3.0, 4.0, -1.0, 2.0, 1.0, -5.0, 4.0]);
        assert_eq!(
            run,
            MaxRun {
                max_sum: 6.0,
                start: 3,
                end: 6,
            }
        );
    }

    #[test]
    fn empty_input_is_zero_run() {
        assert_eq!(
            max_subarray(&[]),
            MaxRun {
                max_sum: 0.0,
                start: 0,
                end: 0,
            }
        );
    }

    #[test]
    fn all_negative_picks_least_negative_element() {
        assert_eq!(
            max_subarray(&[-5.0, -1.0, -3.0]),
            MaxRun {
                max_sum: -1.0,
                start: 1,
                end: 1,
            }
        );
    }

    #[test]
    fn ties_keep_leftmost_run() {
        let run = max_subarray(&[3.0, -5.0, 3.0]);
        assert_eq!((run.max_sum, run.start, run.end), (3.0, 0, 0));
    }

    #[test]
    fn zero_running_sum_extends_rather_than_restarts() {
        let run = max_subarray(&[2.0, -2.0, 5.0]);
        assert_eq!((run.max_sum, run.start, run.end), (5.0, 0, 2));
    }

    #[test]
    fn single_element() {
        assert_eq!(
            max_subarray(&[-7.5]),
            MaxRun {
                max_sum: -7.5,
                start: 0,
                end: 0,
            }
        );
    }

    #[test]
    fn analyzer_keys_results_by_segment_id_in_input_order() {
        let segments = vec![
            Segment::new(42, vec![1.0, 2.0, -10.0, 4.0]),
            Segment::new(7, vec![]),
            Segment::new(3, vec![-1.0, 5.0]),
        ];
        let output = MaxSubarrayAnalyzer::new()
            .analyze_with_diagnostics(&segments, &AnalysisContext::new());
        let summary: Vec<(u64, f64, usize, usize)> = output
            .results
            .iter()
            .map(|r| (r.segment_id, r.max_sum, r.start, r.end))
            .collect();
        assert_eq!(
            summary,
            vec![(42, 4.0, 3, 3), (7, 0.0, 0, 0), (3, 5.0, 1, 1)]
        );
        assert_eq!(output.diagnostics.notes.len(), 1);
    }

    #[test]
    fn strict_and_parallel_modes_agree() {
        let segments: Vec<Segment> = (0..64)
            .map(|idx| {
                let samples = (0..50).map(|t| ((t + idx) as f64 * 0.7).sin()).collect();
                Segment::new(idx as u64, samples)
            })
            .collect();
        let analyzer = MaxSubarrayAnalyzer::new();
        let strict = analyzer.analyze(
            &segments,
            &AnalysisContext::new().with_repro_mode(ReproMode::Strict),
        );
        let balanced = analyzer.analyze(&segments, &AnalysisContext::new());
        assert_eq!(strict, balanced);
    }
}
