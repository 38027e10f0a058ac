// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use libfuzzer_sys::fuzz_target;
use segkit_analysis::{
    LengthMismatchPolicy, MaxSubarrayAnalyzer, NearestPairFinder, PairSearchConfig,
    PartitionConfig, RecursivePartitioner, max_subarray,
};
use segkit_core::{AnalysisContext, ReproMode, Segment};

fn build_policy(seed: u8) -> LengthMismatchPolicy {
    match seed % 3 {
        0 => LengthMismatchPolicy::Skip,
        1 => LengthMismatchPolicy::Truncate,
        _ => LengthMismatchPolicy::Error,
    }
}

fn build_repro_mode(seed: u8) -> ReproMode {
    match seed % 3 {
        0 => ReproMode::Strict,
        1 => ReproMode::Balanced,
        _ => ReproMode::Fast,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);

    let partition = PartitionConfig {
        min_cluster_size: common::bounded(cursor.next_u8(), 0, 12),
        max_depth: common::bounded(cursor.next_u8(), 0, 10),
    };
    let pairs = PairSearchConfig {
        downsample_threshold: common::bounded(cursor.next_u8(), 0, 160),
        downsample_stride: common::bounded(cursor.next_u8(), 0, 16),
        length_mismatch: build_policy(cursor.next_u8()),
    };
    let ctx = AnalysisContext::new().with_repro_mode(build_repro_mode(cursor.next_u8()));

    let segment_count = common::bounded(cursor.next_u8(), 0, 48);
    let mut segments = Vec::with_capacity(segment_count);
    for id in 0..segment_count {
        let len = common::bounded(cursor.next_u8(), 0, 200);
        let samples = common::decode_finite_f64s(&cursor.take_padded(len * 8), len);

        let run = max_subarray(&samples);
        if samples.is_empty() {
            assert_eq!((run.max_sum, run.start, run.end), (0.0, 0, 0));
        } else {
            assert!(run.start <= run.end && run.end < samples.len());
        }

        segments.push(Segment::new(id as u64, samples));
    }

    let subarrays = MaxSubarrayAnalyzer::new().analyze(&segments, &ctx);
    assert_eq!(subarrays.len(), segments.len());

    let Ok(partitioner) = RecursivePartitioner::new(partition) else {
        return;
    };
    let clusters = partitioner.partition(&segments, &ctx);
    let covered: usize = clusters.iter().map(|cluster| cluster.len()).sum();
    assert_eq!(covered, segments.len());

    let Ok(finder) = NearestPairFinder::new(pairs) else {
        return;
    };
    if let Ok(found) = finder.find_closest_pairs(&clusters, &ctx) {
        for pair in found {
            assert!(pair.distance.is_finite() && pair.distance >= 0.0);
        }
    }
});
