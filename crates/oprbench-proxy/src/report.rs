//! Benchmark results of one profiling pass.

use serde::Serialize;

/// Measurement of one candidate algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateTiming {
    /// Algorithm name.
    pub algorithm: String,
    /// Wall time of the measured batch in microseconds.
    pub elapsed_us: u64,
    /// Workspace the candidate asked for.
    pub workspace_bytes: usize,
}

impl CandidateTiming {
    /// Elapsed time in milliseconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_us as f64 / 1e3
    }

    /// The one-line report: milliseconds with three decimals, then the name.
    pub fn summary_line(&self) -> String {
        format!("{:.3}ms {}", self.elapsed_ms(), self.algorithm)
    }
}

/// Every candidate measured during profiling, in catalog order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BenchmarkReport {
    /// Warm-up runs per candidate.
    pub warmup_times: usize,
    /// Measured runs per candidate.
    pub exec_times: usize,
    /// Measurements in catalog order.
    pub candidates: Vec<CandidateTiming>,
    /// Name of the committed algorithm, if any candidate was measured.
    pub selected: Option<String>,
    /// Position of the committed algorithm in `candidates`.
    pub selected_index: Option<usize>,
}

impl BenchmarkReport {
    /// Empty report for the given loop counts.
    pub const fn new(warmup_times: usize, exec_times: usize) -> Self {
        Self {
            warmup_times,
            exec_times,
            candidates: Vec::new(),
            selected: None,
            selected_index: None,
        }
    }

    /// Whether nothing was measured.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The committed candidate's measurement.
    ///
    /// Looked up by position, since distinct algorithms may share a name.
    pub fn best(&self) -> Option<&CandidateTiming> {
        self.candidates.get(self.selected_index?)
    }

    /// Report as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "warmup_times": self.warmup_times,
            "exec_times": self.exec_times,
            "candidates": self.candidates,
            "selected": self.selected,
            "selected_index": self.selected_index,
        })
    }
}
