// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use segkit_core::{count_sign_changes, mean_and_std};

/// Axis used by the partitioner, in tie-break order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitDimension {
    Mean,
    StdDev,
    SignChanges,
}

impl SplitDimension {
    pub const ALL: [SplitDimension; 3] = [Self::Mean, Self::StdDev, Self::SignChanges];
}

/// Fixed three-axis feature vector the partitioner splits on.
///
/// Recomputed from samples; never read from [`segkit_core::SegmentFeatures`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitFeatures {
    pub mean: f64,
    pub std_dev: f64,
    pub sign_changes: f64,
}

impl SplitFeatures {
    pub fn from_samples(samples: &[f64]) -> Self {
        let (mean, std_dev) = mean_and_std(samples);
        Self {
            mean,
            std_dev,
            sign_changes: count_sign_changes(samples) as f64,
        }
    }

    pub fn value(&self, dim: SplitDimension) -> f64 {
        match dim {
            SplitDimension::Mean => self.mean,
            SplitDimension::StdDev => self.std_dev,
            SplitDimension::SignChanges => self.sign_changes,
        }
    }
}

/// Population variance; zero for empty input.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Picks the axis with the largest variance across `features`.
///
/// Strict `>` keeps the earliest axis on ties, so an all-equal set splits on `Mean`.
pub fn max_variance_dimension(features: &[SplitFeatures]) -> (SplitDimension, f64) {
    let mut best = (SplitDimension::Mean, f64::NEG_INFINITY);
    let mut column = Vec::with_capacity(features.len());
    for dim in SplitDimension::ALL {
        column.clear();
        column.extend(features.iter().map(|f| f.value(dim)));
        let variance = population_variance(&column);
        if variance > best.1 {
            best = (dim, variance);
        }
    }
    best
}

/// Median with midpoint averaging for even counts. `None` for empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}
