//! Circular reference detection against the walker's active path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Outcome of checking one reference edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CycleCheck {
    /// Target is not on the active path.
    Clear,
    /// Target is on the active path but nothing new is recorded: detection
    /// is off, or this cycle was already reported.
    Skip,
    /// A new cycle, allowed by policy. Members run from the re-entered
    /// document back to itself.
    Recorded(Vec<PathBuf>),
    /// A new cycle that policy disallows.
    Fatal(Vec<PathBuf>),
}

/// Tracks which cycles were reported so each is counted once per pass,
/// however many of its edges are traversed.
#[derive(Debug)]
pub(crate) struct CycleDetector {
    detect: bool,
    allow: bool,
    reported: HashSet<Vec<PathBuf>>,
}

impl CycleDetector {
    pub(crate) fn new(detect: bool, allow: bool) -> Self {
        Self {
            detect,
            allow,
            reported: HashSet::new(),
        }
    }

    /// Check an edge to `target` given the active path (entry first).
    pub(crate) fn check(&mut self, active: &[PathBuf], target: &Path) -> CycleCheck {
        let Some(start) = active.iter().position(|p| p == target) else {
            return CycleCheck::Clear;
        };

        if !self.detect {
            return CycleCheck::Skip;
        }

        let members = &active[start..];
        if !self.reported.insert(normalize(members)) {
            return CycleCheck::Skip;
        }

        let mut cycle = members.to_vec();
        cycle.push(target.to_path_buf());

        if self.allow {
            CycleCheck::Recorded(cycle)
        } else {
            CycleCheck::Fatal(cycle)
        }
    }
}

/// Rotate cycle members so the smallest path comes first; the same cycle
/// entered from different documents then compares equal.
fn normalize(members: &[PathBuf]) -> Vec<PathBuf> {
    let pivot = members
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);

    members[pivot..]
        .iter()
        .chain(&members[..pivot])
        .cloned()
        .collect()
}
