// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic synthetic inputs shared by the segkit benchmarks.

use segkit_core::Segment;

pub fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Uniform sample in `[-1, 1)` drawn from the top 53 bits of the generator.
pub fn lcg_unit(state: &mut u64) -> f64 {
    let bits = lcg_next(state) >> 11;
    (bits as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
}

/// Builds `count` segments of `len` samples each.
///
/// Segments fall into a handful of regimes (offset, amplitude and frequency)
/// so that the partitioner has real structure to split on.
pub fn synthetic_segments(count: usize, len: usize, seed: u64) -> Vec<Segment> {
    let mut state = seed;
    (0..count)
        .map(|idx| {
            let regime = (lcg_next(&mut state) % 4) as f64;
            let offset = regime * 0.75 - 1.0;
            let amplitude = 0.5 + regime * 0.25;
            let frequency = 0.02 + regime * 0.015;
            let samples = (0..len)
                .map(|t| {
                    let x = t as f64;
                    offset + amplitude * (x * frequency).sin() + 0.1 * lcg_unit(&mut state)
                })
                .collect();
            Segment::new(idx as u64, samples)
        })
        .collect()
}
