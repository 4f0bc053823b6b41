//! Telemetry counter hook.
//!
//! The core only ever *increments named counters*; transporting them is
//! someone else's job. The default sink discards everything.

use std::cell::RefCell;

/// Counter ids the resolution core can bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// A remote registry commit carried no versions database.
    RegistryNoVersionsAtCommit,
    /// A remote registry's baseline could not be located.
    RegistryBaselineNotFound,
}

/// Counter sink.
pub trait MetricsSink {
    fn track(&self, metric: Metric);
}

/// Discards all counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn track(&self, _metric: Metric) {}
}

/// Records counters in memory; used by tests.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    tracked: RefCell<Vec<Metric>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, metric: Metric) -> usize {
        self.tracked.borrow().iter().filter(|m| **m == metric).count()
    }
}

impl MetricsSink for RecordingMetrics {
    fn track(&self, metric: Metric) {
        self.tracked.borrow_mut().push(metric);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_counts_per_metric() {
        let sink = RecordingMetrics::new();
        sink.track(Metric::RegistryBaselineNotFound);
        sink.track(Metric::RegistryBaselineNotFound);
        sink.track(Metric::RegistryNoVersionsAtCommit);
        assert_eq!(sink.count(Metric::RegistryBaselineNotFound), 2);
        assert_eq!(sink.count(Metric::RegistryNoVersionsAtCommit), 1);
    }
}
