//! Per-process scheduler statistics.
//!
//! Kept in memory only and logged at shutdown; nothing here is persisted.

use std::time::Duration;

/// Counters accumulated over the scheduler's lifetime.
#[derive(Debug, Default, Clone)]
pub struct CycleStats {
    /// Completed cycles.
    pub cycles: u64,
    /// Characters whose turns were processed (including failed turns).
    pub characters_processed: u64,
    /// Actions obtained from the model and submitted for execution.
    pub actions_attempted: u64,
    /// Actions that executed successfully.
    pub actions_succeeded: u64,
    /// Turns that failed anywhere in the pipeline (model, parse, execute).
    pub actions_failed: u64,
    /// Rolling average cycle duration in milliseconds.
    avg_cycle_ms: f64,
}

impl CycleStats {
    /// Record a completed cycle and fold its duration into the rolling
    /// average.
    pub fn record_cycle(&mut self, duration: Duration) {
        self.cycles = self.cycles.saturating_add(1);
        let ms = duration.as_secs_f64() * 1000.0;
        // Incremental mean: avg += (x - avg) / n.
        #[allow(clippy::cast_precision_loss)]
        let n = self.cycles as f64;
        self.avg_cycle_ms += (ms - self.avg_cycle_ms) / n;
    }

    /// The rolling average cycle duration in milliseconds.
    pub const fn avg_cycle_ms(&self) -> f64 {
        self.avg_cycle_ms
    }

    /// Log the totals (called once at shutdown).
    pub fn log_summary(&self) {
        tracing::info!(
            cycles = self.cycles,
            characters_processed = self.characters_processed,
            actions_attempted = self.actions_attempted,
            actions_succeeded = self.actions_succeeded,
            actions_failed = self.actions_failed,
            avg_cycle_ms = format!("{:.1}", self.avg_cycle_ms),
            "scheduler statistics"
        );
    }
}
