//! Per-search progress logging.
//!
//! One logger value per tuning run, threaded through the driver; there is
//! no process-wide logging state. Events go through `tracing`, so callers
//! pick the subscriber and the sink.

use std::time::Instant;

/// Announces which grid of a grid list is being searched.
pub(crate) fn log_grid_header(verbose: i32, grid_index: usize) {
    if verbose > 0 {
        tracing::info!(grid = grid_index, "searching parameter grid");
    }
}

/// Announces the closing cross-validation on the best candidate.
pub(crate) fn log_final_quality(verbose: i32) {
    if verbose > 0 {
        tracing::info!("estimating final quality");
    }
}

/// Emits per-candidate progress and timing for one tuning run.
pub(crate) struct SearchLogger {
    /// Logging period in candidates; zero or negative silences output.
    verbose: i32,
    total: u64,
    started: Instant,
    candidate_started: Instant,
}

impl SearchLogger {
    pub(crate) fn new(verbose: i32, total: u64) -> Self {
        let now = Instant::now();
        Self {
            verbose,
            total,
            started: now,
            candidate_started: now,
        }
    }

    #[allow(clippy::cast_sign_loss)]
    fn enabled_for(&self, index: u64) -> bool {
        self.verbose > 0 && index % self.verbose as u64 == 0
    }

    /// Marks the start of one candidate evaluation.
    pub(crate) fn start_candidate(&mut self) {
        self.candidate_started = Instant::now();
    }

    /// Reports one evaluated candidate together with the running best.
    pub(crate) fn candidate(
        &self,
        index: u64,
        metric: &str,
        value: f64,
        best_value: f64,
        best_index: u64,
    ) {
        if !self.enabled_for(index) {
            return;
        }
        tracing::info!(
            candidate = index + 1,
            total = self.total,
            metric,
            value,
            best_value,
            best_candidate = best_index + 1,
            candidate_secs = self.candidate_started.elapsed().as_secs_f64(),
            elapsed_secs = self.started.elapsed().as_secs_f64(),
            "candidate evaluated"
        );
    }
}
