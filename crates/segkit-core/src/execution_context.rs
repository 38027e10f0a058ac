// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::observability::{AnalysisEvent, EventSink, ProgressSink};
use crate::repro::ReproMode;

/// Execution context passed through every analysis stage.
///
/// The default context is silent: no sinks, balanced reproducibility.
#[derive(Clone, Copy, Default)]
pub struct AnalysisContext<'a> {
    pub repro_mode: ReproMode,
    pub events: Option<&'a dyn EventSink>,
    pub progress: Option<&'a dyn ProgressSink>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reproducibility mode.
    pub fn with_repro_mode(mut self, repro_mode: ReproMode) -> Self {
        self.repro_mode = repro_mode;
        self
    }

    /// Sets an optional event sink.
    pub fn with_event_sink(mut self, events: &'a dyn EventSink) -> Self {
        self.events = Some(events);
        self
    }

    /// Sets an optional progress sink.
    pub fn with_progress_sink(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Forwards an event to the sink, if configured.
    pub fn emit(&self, event: AnalysisEvent) {
        if let Some(sink) = self.events {
            sink.on_event(&event);
        }
    }

    /// Emits clamped progress to the sink, if configured.
    pub fn report_progress(&self, fraction: f32) {
        if !fraction.is_finite() {
            return;
        }

        if let Some(sink) = self.progress {
            sink.on_progress(fraction.clamp(0.0, 1.0));
        }
    }

    /// True when the `rayon` path may be taken for this call.
    pub fn parallel_allowed(&self) -> bool {
        self.repro_mode.allows_parallel()
    }
}

impl std::fmt::Debug for AnalysisContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("repro_mode", &self.repro_mode)
            .field("events", &self.events.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
