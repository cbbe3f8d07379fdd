//! Resolution statistics.

use std::time::Duration;

use serde::{Serialize, Serializer};

/// Counters accumulated by one resolver across its resolution passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Distinct documents entered, counted once per pass.
    pub documents_processed: usize,
    /// Loads answered from the document cache.
    pub cached_reuse_count: usize,
    /// Deepest reference hop reached; the entry document is depth 0.
    pub max_depth_reached: usize,
    /// Distinct cycles detected.
    pub circular_dependencies_detected: usize,
    /// Wall-clock time spent resolving.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl ResolutionStats {
    pub(crate) fn record_document(&mut self, depth: usize) {
        self.documents_processed += 1;
        self.max_depth_reached = self.max_depth_reached.max(depth);
    }

    pub(crate) fn record_cache_hit(&mut self) {
        self.cached_reuse_count += 1;
    }

    pub(crate) fn record_cycle(&mut self) {
        self.circular_dependencies_detected += 1;
    }

    pub(crate) fn add_elapsed(&mut self, elapsed: Duration) {
        self.elapsed += elapsed;
    }
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_depth_keeps_maximum() {
        let mut stats = ResolutionStats::default();
        stats.record_document(0);
        stats.record_document(3);
        stats.record_document(1);

        assert_eq!(stats.documents_processed, 3);
        assert_eq!(stats.max_depth_reached, 3);
    }

    #[test]
    fn serializes_elapsed_as_millis() {
        let stats = ResolutionStats {
            elapsed: Duration::from_millis(250),
            ..Default::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["elapsed_ms"], 250.0);
        assert_eq!(json["documents_processed"], 0);
    }
}
