// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Input decoding for the `segkit` binary: JSON/CSV signal records turned
//! into validated [`Segment`]s, optionally windowed.

use segkit_core::{SegError, Segment, SegmentOrigin, WindowConfig, window_signals};
use serde::Deserialize;
use std::collections::BTreeSet;

/// One decoded input record before it becomes a segment.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSignal {
    pub id: Option<u64>,
    pub samples: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignalRecord {
    Bare(Vec<f64>),
    Full {
        #[serde(default)]
        id: Option<u64>,
        samples: Vec<f64>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignalDocument {
    List(Vec<SignalRecord>),
    Wrapped { segments: Vec<SignalRecord> },
}

/// Accepts a top-level array (or `{"segments": [...]}`) whose items are
/// either `{"id": .., "samples": [..]}` or bare sample arrays.
pub fn parse_json_signals(raw: &str) -> Result<Vec<RawSignal>, SegError> {
    let document: SignalDocument = serde_json::from_str(raw)
        .map_err(|err| SegError::invalid_input(format!("invalid segment JSON: {err}")))?;
    let records = match document {
        SignalDocument::Wrapped { segments } => segments,
        SignalDocument::List(records) => records,
    };
    Ok(records
        .into_iter()
        .map(|record| match record {
            SignalRecord::Full { id, samples } => RawSignal { id, samples },
            SignalRecord::Bare(samples) => RawSignal { id: None, samples },
        })
        .collect())
}

/// One signal per non-empty row; rows may differ in length. A first row
/// made only of non-numeric cells is treated as a header and skipped.
pub fn parse_csv_signals(raw: &str) -> Result<Vec<RawSignal>, SegError> {
    let rows = raw
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return Err(SegError::invalid_input("CSV input is empty"));
    }

    let skip = usize::from(row_is_header(rows[0].1));
    let mut out = Vec::with_capacity(rows.len() - skip);
    for &(line_no, row) in &rows[skip..] {
        let mut samples = Vec::new();
        for (col_idx, cell) in row.split(',').map(str::trim).enumerate() {
            if cell.is_empty() {
                return Err(SegError::invalid_input(format!(
                    "CSV row {line_no} column {} is empty",
                    col_idx + 1
                )));
            }
            let value = cell.parse::<f64>().map_err(|_| {
                SegError::invalid_input(format!(
                    "CSV row {line_no} column {} is not a valid float: '{cell}'",
                    col_idx + 1
                ))
            })?;
            samples.push(value);
        }
        out.push(RawSignal { id: None, samples });
    }

    Ok(out)
}

fn row_is_header(row: &str) -> bool {
    row.split(',')
        .map(str::trim)
        .all(|cell| !cell.is_empty() && cell.parse::<f64>().is_err())
}

/// Validates and converts decoded signals into segments.
///
/// Without a window each record is one segment (id from the record or its
/// position). With a window every record is sliced, ids run densely across
/// the whole batch and `max_segments` caps the total. Every segment keeps
/// its record index and sample offset as its origin.
pub fn build_segments(
    signals: Vec<RawSignal>,
    window: Option<&WindowConfig>,
    sampling_rate_hz: Option<f64>,
) -> Result<Vec<Segment>, SegError> {
    for (idx, signal) in signals.iter().enumerate() {
        if let Some((pos, value)) = signal
            .samples
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(SegError::invalid_input(format!(
                "record {idx} has non-finite sample at index {pos}: {value}"
            )));
        }
    }

    if let Some(window) = window {
        let window = WindowConfig {
            sampling_rate_hz: window.sampling_rate_hz.or(sampling_rate_hz),
            ..window.clone()
        };
        return window_signals(
            signals.iter().map(|signal| signal.samples.as_slice()),
            &window,
            0,
        );
    }

    let mut seen = BTreeSet::new();
    let mut segments = Vec::with_capacity(signals.len());
    for (idx, signal) in signals.into_iter().enumerate() {
        let id = signal.id.unwrap_or(idx as u64);
        if !seen.insert(id) {
            return Err(SegError::invalid_input(format!("duplicate segment id {id}")));
        }
        if signal.samples.is_empty() {
            return Err(SegError::invalid_input(format!(
                "segment {id} has no samples"
            )));
        }
        let segment = match sampling_rate_hz {
            Some(hz) => Segment::with_sampling_rate(id, signal.samples, hz),
            None => Segment::new(id, signal.samples),
        };
        segments.push(segment.with_origin(SegmentOrigin {
            source_index: idx,
            start_index: 0,
        }));
    }
    Ok(segments)
}
