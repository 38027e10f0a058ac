// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use segkit_analysis::{
    LengthMismatchPolicy, MaxSubarrayAnalyzer, NearestPairFinder, PairSearchConfig,
    PartitionConfig, RecursivePartitioner, max_subarray,
};
use segkit_core::{AnalysisContext, Cluster, ReproMode, Segment};
use std::collections::BTreeSet;

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn build_segments(raw: Vec<Vec<i16>>) -> Vec<Segment> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, values)| {
            let samples = values.into_iter().map(|v| f64::from(v) / 8.0).collect();
            Segment::new(idx as u64, samples)
        })
        .collect()
}

fn segment_batch(max_segments: usize, max_len: usize) -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec(
        prop::collection::vec(-64i16..=64, 0..=max_len),
        0..=max_segments,
    )
    .prop_map(build_segments)
}

fn equal_length_batch(
    max_segments: usize,
    len: std::ops::RangeInclusive<usize>,
) -> impl Strategy<Value = Vec<Segment>> {
    len.prop_flat_map(move |n| {
        prop::collection::vec(prop::collection::vec(-64i16..=64, n), 2..=max_segments)
    })
    .prop_map(build_segments)
}

fn brute_force_max(samples: &[f64]) -> f64 {
    let mut best = f64::NEG_INFINITY;
    for start in 0..samples.len() {
        let mut sum = 0.0;
        for &value in &samples[start..] {
            sum += value;
            best = best.max(sum);
        }
    }
    best
}

fn brute_force_first_end(samples: &[f64], target: f64) -> usize {
    for end in 0..samples.len() {
        let mut sum = 0.0;
        for start in (0..=end).rev() {
            sum += samples[start];
            if sum == target {
                return end;
            }
        }
    }
    usize::MAX
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        ..ProptestConfig::default()
    })]

    #[test]
    fn partition_covers_each_segment_exactly_once(
        segments in segment_batch(40, 24),
        min_cluster_size in 1usize..=6,
        max_depth in 0usize..=6,
    ) {
        let partitioner = RecursivePartitioner::new(PartitionConfig { min_cluster_size, max_depth })
            .expect("generated config is valid");
        let output = partitioner.partition_with_diagnostics(&segments, &AnalysisContext::new());

        let mut seen = BTreeSet::new();
        for cluster in &output.clusters {
            prop_assert!(!cluster.is_empty());
            for id in cluster.ids() {
                prop_assert!(seen.insert(id), "segment {} assigned twice", id);
            }
        }
        prop_assert_eq!(seen.len(), segments.len());
        prop_assert!(output.depth_reached <= max_depth);

        if segments.len() <= min_cluster_size {
            prop_assert_eq!(output.clusters.len(), usize::from(!segments.is_empty()));
        }
    }

    #[test]
    fn partition_is_deterministic(
        segments in segment_batch(30, 16),
        min_cluster_size in 1usize..=4,
        max_depth in 0usize..=5,
    ) {
        let partitioner = RecursivePartitioner::new(PartitionConfig { min_cluster_size, max_depth })
            .expect("generated config is valid");
        let ctx = AnalysisContext::new();
        let first: Vec<Vec<u64>> = partitioner.partition(&segments, &ctx).iter().map(Cluster::ids).collect();
        let second: Vec<Vec<u64>> = partitioner.partition(&segments, &ctx).iter().map(Cluster::ids).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn closest_pair_is_minimal_within_cluster(segments in equal_length_batch(8, 1..=160)) {
        let finder = NearestPairFinder::new(PairSearchConfig::default())
            .expect("default config is valid");
        let refs: Vec<&Segment> = segments.iter().collect();
        let clusters = vec![Cluster::new(refs.clone()).expect("batch has >= 2 segments")];

        let pairs = finder
            .find_closest_pairs(&clusters, &AnalysisContext::new())
            .expect("equal-length batch never fails");
        prop_assert_eq!(pairs.len(), 1);
        let best = pairs[0];
        prop_assert!(best.distance >= 0.0);

        for i in 0..refs.len() {
            for j in (i + 1)..refs.len() {
                let dist = finder.distance(refs[i], refs[j]).expect("equal lengths compare");
                prop_assert!(best.distance <= dist);
            }
        }
    }

    #[test]
    fn singleton_clusters_never_produce_pairs(segments in segment_batch(10, 8)) {
        let clusters: Vec<Cluster<'_>> = segments
            .iter()
            .filter_map(|segment| Cluster::new(vec![segment]))
            .collect();
        let finder = NearestPairFinder::new(PairSearchConfig {
            length_mismatch: LengthMismatchPolicy::Skip,
            ..PairSearchConfig::default()
        })
        .expect("config is valid");
        let pairs = finder
            .find_closest_pairs(&clusters, &AnalysisContext::new())
            .expect("singletons never fail");
        prop_assert!(pairs.is_empty());
    }

    #[test]
    fn max_subarray_matches_brute_force(values in prop::collection::vec(-50i32..=50, 1..=64)) {
        let samples: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
        let run = max_subarray(&samples);

        prop_assert!(run.start <= run.end);
        prop_assert!(run.end < samples.len());
        let window_sum: f64 = samples[run.start..=run.end].iter().sum();
        prop_assert_eq!(window_sum, run.max_sum);
        prop_assert_eq!(run.max_sum, brute_force_max(&samples));
        prop_assert_eq!(run.end, brute_force_first_end(&samples, run.max_sum));
    }

    #[test]
    fn subarray_scan_is_mode_independent(segments in segment_batch(20, 32)) {
        let analyzer = MaxSubarrayAnalyzer::new();
        let strict = analyzer.analyze(&segments, &AnalysisContext::new().with_repro_mode(ReproMode::Strict));
        let fast = analyzer.analyze(&segments, &AnalysisContext::new().with_repro_mode(ReproMode::Fast));
        prop_assert_eq!(strict.len(), segments.len());
        prop_assert_eq!(strict, fast);
    }
}
