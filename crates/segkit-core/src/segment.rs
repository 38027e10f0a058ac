// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SegError;

pub const DEFAULT_MAX_WINDOWS: usize = 100;
pub const DEFAULT_MAX_SEGMENTS: usize = 1_000;
/// Default population standard deviation below which a window is treated as flat.
pub const DEFAULT_MIN_STD: f64 = 0.1;

/// Scalar statistics derived once from a segment's samples.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SegmentFeatures {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub zero_crossings: usize,
    pub duration_seconds: Option<f64>,
}

impl SegmentFeatures {
    pub const NAMES: [&'static str; 6] =
        ["mean", "std", "min", "max", "zero_crossings", "duration_seconds"];

    /// Computes the stored statistics. Empty input yields all-zero features.
    pub fn from_samples(samples: &[f64], sampling_rate_hz: Option<f64>) -> Self {
        let duration_seconds = sampling_rate_hz
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .map(|hz| samples.len() as f64 / hz);

        if samples.is_empty() {
            return Self {
                duration_seconds,
                ..Self::default()
            };
        }

        let (mean, std) = mean_and_std(samples);
        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        Self {
            mean,
            std,
            min,
            max,
            zero_crossings: count_sign_changes(samples),
            duration_seconds,
        }
    }

    /// Named lookup; `zero_crossings` is widened to `f64`.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "mean" => Some(self.mean),
            "std" => Some(self.std),
            "min" => Some(self.min),
            "max" => Some(self.max),
            "zero_crossings" => Some(self.zero_crossings as f64),
            "duration_seconds" => self.duration_seconds,
            _ => None,
        }
    }

    /// Iterates present `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        Self::NAMES
            .iter()
            .filter_map(|&name| self.get(name).map(|value| (name, value)))
    }
}

/// Position of a segment's samples in the loader input.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentOrigin {
    /// Index of the input record (signal) the samples were taken from.
    pub source_index: usize,
    /// Offset of the first sample within that record.
    pub start_index: usize,
}

/// One analysis unit: an opaque id, its processed samples and derived features.
///
/// Segments are immutable once built; stages only ever borrow them.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    id: u64,
    samples: Vec<f64>,
    features: SegmentFeatures,
    origin: Option<SegmentOrigin>,
}

impl Segment {
    pub fn new(id: u64, samples: Vec<f64>) -> Self {
        let features = SegmentFeatures::from_samples(&samples, None);
        Self {
            id,
            samples,
            features,
            origin: None,
        }
    }

    pub fn with_sampling_rate(id: u64, samples: Vec<f64>, sampling_rate_hz: f64) -> Self {
        let features = SegmentFeatures::from_samples(&samples, Some(sampling_rate_hz));
        Self {
            id,
            samples,
            features,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: SegmentOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn origin(&self) -> Option<SegmentOrigin> {
        self.origin
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn features(&self) -> &SegmentFeatures {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Population mean and standard deviation. Returns `(0.0, 0.0)` for empty input.
pub fn mean_and_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples
        .iter()
        .map(|&v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

/// Counts adjacent sample pairs with strictly opposite signs.
///
/// Exact zeros never count as a crossing; fewer than two samples yield zero.
pub fn count_sign_changes(samples: &[f64]) -> usize {
    samples
        .windows(2)
        .filter(|pair| pair[0] * pair[1] < 0.0)
        .count()
}

/// Returns false for flat windows: all samples equal or std below `min_std`.
pub fn is_informative(samples: &[f64], min_std: f64) -> bool {
    let Some(&first) = samples.first() else {
        return false;
    };
    if samples.iter().all(|&v| v == first) {
        return false;
    }
    let (_, std) = mean_and_std(samples);
    std >= min_std
}

/// Slicing rules for turning one long signal into fixed-length segments.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct WindowConfig {
    pub segment_length: usize,
    /// Window advance; `None` means half of `segment_length` (50% overlap).
    pub step: Option<usize>,
    /// Per-signal window cap.
    pub max_windows: Option<usize>,
    /// Batch-wide segment cap applied by [`window_signals`].
    pub max_segments: Option<usize>,
    /// Drop windows that fail [`is_informative`]; `None` keeps every window.
    pub min_std: Option<f64>,
    pub sampling_rate_hz: Option<f64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            segment_length: 2_500,
            step: None,
            max_windows: Some(DEFAULT_MAX_WINDOWS),
            max_segments: Some(DEFAULT_MAX_SEGMENTS),
            min_std: Some(DEFAULT_MIN_STD),
            sampling_rate_hz: None,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), SegError> {
        if self.segment_length == 0 {
            return Err(SegError::invalid_input(
                "window segment_length must be >= 1; got 0",
            ));
        }
        if self.step == Some(0) {
            return Err(SegError::invalid_input("window step must be >= 1; got 0"));
        }
        if self.max_windows == Some(0) || self.max_segments == Some(0) {
            return Err(SegError::invalid_input(
                "window max_windows and max_segments must be >= 1 when set",
            ));
        }
        if let Some(min_std) = self.min_std
            && (!min_std.is_finite() || min_std < 0.0)
        {
            return Err(SegError::invalid_input(format!(
                "window min_std must be finite and >= 0.0; got {min_std}"
            )));
        }
        if let Some(hz) = self.sampling_rate_hz
            && (!hz.is_finite() || hz <= 0.0)
        {
            return Err(SegError::invalid_input(format!(
                "sampling_rate_hz must be finite and > 0.0; got {hz}"
            )));
        }
        Ok(())
    }

    pub fn effective_step(&self) -> usize {
        self.step.unwrap_or(self.segment_length / 2).max(1)
    }
}

/// Slices `signal` into windows per `config`, assigning dense ids from `first_id`.
///
/// Every segment records `source_index` and its window offset as its
/// [`SegmentOrigin`]. Rejected (flat) windows consume no id. A signal shorter
/// than one window yields no segments.
pub fn window_signal(
    signal: &[f64],
    config: &WindowConfig,
    source_index: usize,
    first_id: u64,
) -> Result<Vec<Segment>, SegError> {
    config.validate()?;
    if let Some((idx, value)) = signal.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(SegError::invalid_input(format!(
            "signal contains non-finite sample at index {idx}: {value}"
        )));
    }

    let len = config.segment_length;
    let step = config.effective_step();
    let mut out = Vec::new();
    let mut next_id = first_id;
    let mut start = 0usize;

    while start
        .checked_add(len)
        .is_some_and(|end| end <= signal.len())
    {
        if config.max_windows.is_some_and(|cap| out.len() >= cap) {
            break;
        }
        let window = &signal[start..start + len];
        let keep = config
            .min_std
            .is_none_or(|min_std| is_informative(window, min_std));
        if keep {
            let samples = window.to_vec();
            let segment = match config.sampling_rate_hz {
                Some(hz) => Segment::with_sampling_rate(next_id, samples, hz),
                None => Segment::new(next_id, samples),
            };
            out.push(segment.with_origin(SegmentOrigin {
                source_index,
                start_index: start,
            }));
            next_id = next_id
                .checked_add(1)
                .ok_or_else(|| SegError::invalid_input("segment id overflow"))?;
        }
        start += step;
    }

    Ok(out)
}

/// Windows a batch of signals with ids dense from `first_id`, stopping once
/// `config.max_segments` segments have been produced.
pub fn window_signals<'s, I>(
    signals: I,
    config: &WindowConfig,
    first_id: u64,
) -> Result<Vec<Segment>, SegError>
where
    I: IntoIterator<Item = &'s [f64]>,
{
    config.validate()?;
    let mut out: Vec<Segment> = Vec::new();
    for (source_index, signal) in signals.into_iter().enumerate() {
        let next_id = u64::try_from(out.len())
            .ok()
            .and_then(|produced| first_id.checked_add(produced))
            .ok_or_else(|| SegError::invalid_input("segment id overflow"))?;
        let windows = window_signal(signal, config, source_index, next_id)
            .map_err(|err| err.with_context(format!("signal {source_index}")))?;
        out.extend(windows);
        if let Some(cap) = config.max_segments
            && out.len() >= cap
        {
            out.truncate(cap);
            break;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{
        Segment, SegmentFeatures, SegmentOrigin, WindowConfig, count_sign_changes,
        is_informative, mean_and_std, window_signal, window_signals,
    };

    #[test]
    fn features_match_population_statistics() {
        let segment = Segment::new(7, vec![1.0, -1.0, 1.0, -1.0]);
        let features = segment.features();
        assert_eq!(segment.id(), 7);
        assert_eq!(features.mean, 0.0);
        assert_eq!(features.std, 1.0);
        assert_eq!(features.min, -1.0);
        assert_eq!(features.max, 1.0);
        assert_eq!(features.zero_crossings, 3);
        assert!(features.duration_seconds.is_none());
    }

    #[test]
    fn empty_samples_yield_zero_features() {
        let features = SegmentFeatures::from_samples(&[], None);
        assert_eq!(features, SegmentFeatures::default());
    }

    #[test]
    fn duration_uses_sampling_rate() {
        let segment = Segment::with_sampling_rate(0, vec![0.5; 500], 250.0);
        assert_eq!(segment.features().duration_seconds, Some(2.0));
        assert_eq!(segment.features().get("duration_seconds"), Some(2.0));
    }

    #[test]
    fn named_lookup_and_iteration_agree() {
        let features = SegmentFeatures::from_samples(&[2.0, -2.0], None);
        let pairs: Vec<_> = features.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("mean", 0.0),
                ("std", 2.0),
                ("min", -2.0),
                ("max", 2.0),
                ("zero_crossings", 1.0),
            ]
        );
        assert_eq!(features.get("unknown"), None);
    }

    #[test]
    fn sign_changes_ignore_zeros_and_short_input() {
        assert_eq!(count_sign_changes(&[]), 0);
        assert_eq!(count_sign_changes(&[3.0]), 0);
        assert_eq!(count_sign_changes(&[1.0, 0.0, -1.0]), 0);
        assert_eq!(count_sign_changes(&[1.0, -1.0, -2.0, 4.0]), 2);
    }

    #[test]
    fn mean_and_std_of_constant_series() {
        assert_eq!(mean_and_std(&[4.0, 4.0, 4.0]), (4.0, 0.0));
        assert_eq!(mean_and_std(&[]), (0.0, 0.0));
    }

    #[test]
    fn flat_windows_are_not_informative() {
        assert!(!is_informative(&[], 0.1));
        assert!(!is_informative(&[1.0, 1.0, 1.0], 0.0));
        assert!(!is_informative(&[1.0, 1.01, 1.0, 1.01], 0.1));
        assert!(is_informative(&[0.0, 1.0, 0.0, 1.0], 0.1));
    }

    #[test]
    fn window_signal_uses_half_overlap_by_default() {
        let signal: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let config = WindowConfig {
            segment_length: 4,
            min_std: None,
            ..WindowConfig::default()
        };
        let segments = window_signal(&signal, &config, 0, 100).expect("windowing should succeed");
        let starts: Vec<f64> = segments.iter().map(|s| s.samples()[0]).collect();
        let ids: Vec<u64> = segments.iter().map(Segment::id).collect();
        assert_eq!(starts, vec![0.0, 2.0, 4.0, 6.0]);
        assert_eq!(ids, vec![100, 101, 102, 103]);
    }

    #[test]
    fn windows_record_their_source_and_offset() {
        let signal: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let config = WindowConfig {
            segment_length: 4,
            step: Some(4),
            min_std: None,
            ..WindowConfig::default()
        };
        let segments = window_signal(&signal, &config, 3, 0).expect("windowing should succeed");
        let origins: Vec<_> = segments.iter().filter_map(Segment::origin).collect();
        assert_eq!(
            origins,
            vec![
                SegmentOrigin {
                    source_index: 3,
                    start_index: 0,
                },
                SegmentOrigin {
                    source_index: 3,
                    start_index: 4,
                },
                SegmentOrigin {
                    source_index: 3,
                    start_index: 8,
                },
            ]
        );
        assert_eq!(Segment::new(0, vec![1.0]).origin(), None);
    }

    #[test]
    fn default_caps_follow_loader_limits() {
        let config = WindowConfig::default();
        assert_eq!(config.max_windows, Some(100));
        assert_eq!(config.max_segments, Some(1_000));

        let signal: Vec<f64> = (0..1_000).map(|i| (i as f64 * 0.7).sin()).collect();
        let config = WindowConfig {
            segment_length: 4,
            step: Some(4),
            min_std: None,
            ..WindowConfig::default()
        };
        let segments = window_signal(&signal, &config, 0, 0).expect("windowing should succeed");
        assert_eq!(segments.len(), 100);
    }

    #[test]
    fn batch_windowing_caps_total_segments_and_keeps_ids_dense() {
        let first: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let second: Vec<f64> = (0..8).map(|i| -(i as f64)).collect();
        let config = WindowConfig {
            segment_length: 4,
            step: Some(2),
            max_segments: Some(4),
            min_std: None,
            ..WindowConfig::default()
        };
        let segments = window_signals([first.as_slice(), second.as_slice()], &config, 10)
            .expect("windowing should succeed");

        let ids: Vec<u64> = segments.iter().map(Segment::id).collect();
        assert_eq!(ids, vec![10, 11, 12, 13]);
        let last = segments[3].origin().expect("windowed segments carry an origin");
        assert_eq!(
            last,
            SegmentOrigin {
                source_index: 1,
                start_index: 0,
            }
        );
    }

    #[test]
    fn zero_caps_are_rejected() {
        let config = WindowConfig {
            max_segments: Some(0),
            ..WindowConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn window_signal_skips_flat_windows_without_consuming_ids() {
        let mut signal = vec![0.0; 4];
        signal.extend([1.0, -1.0, 1.0, -1.0]);
        let config = WindowConfig {
            segment_length: 4,
            step: Some(4),
            ..WindowConfig::default()
        };
        let segments = window_signal(&signal, &config, 0, 0).expect("windowing should succeed");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id(), 0);
        assert_eq!(segments[0].samples(), &[1.0, -1.0, 1.0, -1.0]);
    }

    #[test]
    fn window_signal_respects_max_windows() {
        let signal: Vec<f64> = (0..100).map(|i| (i as f64).sin()).collect();
        let config = WindowConfig {
            segment_length: 10,
            step: Some(5),
            max_windows: Some(3),
            max_segments: None,
            min_std: None,
            sampling_rate_hz: None,
        };
        let segments = window_signal(&signal, &config, 0, 0).expect("windowing should succeed");
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn window_signal_rejects_bad_config_and_non_finite_samples() {
        let zero_len = WindowConfig {
            segment_length: 0,
            ..WindowConfig::default()
        };
        assert!(window_signal(&[1.0], &zero_len, 0, 0).is_err());

        let zero_step = WindowConfig {
            segment_length: 2,
            step: Some(0),
            ..WindowConfig::default()
        };
        assert!(window_signal(&[1.0, 2.0], &zero_step, 0, 0).is_err());

        let config = WindowConfig {
            segment_length: 2,
            ..WindowConfig::default()
        };
        let err = window_signal(&[1.0, f64::NAN], &config, 0, 0)
            .expect_err("non-finite samples must be rejected");
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn short_signal_yields_no_windows() {
        let config = WindowConfig {
            segment_length: 8,
            min_std: None,
            ..WindowConfig::default()
        };
        let segments = window_signal(&[1.0, 2.0], &config, 0, 0).expect("windowing should succeed");
        assert!(segments.is_empty());
    }
}
