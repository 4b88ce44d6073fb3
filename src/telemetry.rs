//! Telemetry collection for pipeline stages.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

/// Pipeline stages that run an external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Encode,
    Upload,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Encode => "encode",
            Stage::Upload => "upload",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct TelemetryState {
    stage_counts: HashMap<Stage, u64>,
    stage_failures: HashMap<Stage, u64>,
    completed_jobs: u64,
}

/// Snapshot of telemetry suitable for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub stage_counts: Vec<(String, u64)>,
    pub stage_failures: Vec<(String, u64)>,
    pub completed_jobs: u64,
}

impl TelemetrySnapshot {
    /// Number of times `stage` ran.
    pub fn runs(&self, stage: Stage) -> u64 {
        lookup(&self.stage_counts, stage)
    }

    /// Number of times `stage` ended in an error.
    pub fn failures(&self, stage: Stage) -> u64 {
        lookup(&self.stage_failures, stage)
    }
}

fn lookup(counts: &[(String, u64)], stage: Stage) -> u64 {
    counts
        .iter()
        .find(|(name, _)| name == stage.as_str())
        .map_or(0, |(_, count)| *count)
}

/// Shared sink capturing per-stage events.
#[derive(Clone, Default)]
pub struct TelemetrySink {
    state: Arc<Mutex<TelemetryState>>,
}

impl TelemetrySink {
    /// Records that a stage ran, whatever its outcome.
    pub fn record_stage(&self, stage: Stage) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        *state.stage_counts.entry(stage).or_insert(0) += 1;
    }

    /// Records a failed stage run.
    pub fn record_failure(&self, stage: Stage) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        *state.stage_failures.entry(stage).or_insert(0) += 1;
    }

    /// Records a job that made it through the whole pipeline.
    pub fn record_completed(&self) {
        let mut state = self.state.lock().expect("telemetry mutex poisoned");
        state.completed_jobs += 1;
    }

    /// Exposes a snapshot for diagnostics and testing.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let state = self.state.lock().expect("telemetry mutex poisoned");
        TelemetrySnapshot {
            stage_counts: collect(&state.stage_counts),
            stage_failures: collect(&state.stage_failures),
            completed_jobs: state.completed_jobs,
        }
    }
}

fn collect(counts: &HashMap<Stage, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<_> = counts
        .iter()
        .map(|(stage, count)| (stage.to_string(), *count))
        .collect();
    entries.sort();
    entries
}
