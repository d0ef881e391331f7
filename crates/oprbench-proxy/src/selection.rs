//! Algorithm selection state and the benchmark loop.
//!
//! Selection moves through three states:
//!
//! ```text
//! NoAlgorithmChosen --profile--> AlgorithmFixed
//!         \______ (profiling off) ______/ operator default, never fixed
//! ```
//!
//! Once an algorithm is fixed it stays fixed for the life of the state.

use anyhow::Result;
use oprbench_core::{Handle, TensorLayout, TensorND};
use tracing::{debug, info, warn};

use crate::config::ProxyConfig;
use crate::operator::{AlgoOperator, AlgorithmHandle, PreprocessedFilter};
use crate::report::{BenchmarkReport, CandidateTiming};
use crate::workspace::WorkspaceWrapper;

/// Produces the preprocessed filter passed alongside an execution.
///
/// Implemented by [`NoPreprocess`] for plain operators and by
/// [`WeightPreprocessor`](crate::preprocess::WeightPreprocessor) for
/// operators with weight preprocessing.
pub trait FilterPreparer<O: AlgoOperator + ?Sized> {
    /// Build a bundle for `algorithm`, or `None` if the operator takes none.
    ///
    /// The execution policy already names `algorithm` when this is called.
    fn prepare(
        opr: &mut O,
        tensors: &[TensorND],
        layouts: &[TensorLayout],
        algorithm: Option<&AlgorithmHandle>,
    ) -> Result<Option<PreprocessedFilter>>;
}

/// Preparer for operators without weight preprocessing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreprocess;

impl<O: AlgoOperator + ?Sized> FilterPreparer<O> for NoPreprocess {
    fn prepare(
        _opr: &mut O,
        _tensors: &[TensorND],
        _layouts: &[TensorLayout],
        _algorithm: Option<&AlgorithmHandle>,
    ) -> Result<Option<PreprocessedFilter>> {
        Ok(None)
    }
}

/// Mutable selection state of one proxy instance.
#[derive(Debug)]
pub struct SelectionState {
    /// Untimed runs per candidate.
    pub warmup_times: usize,
    /// Timed runs per candidate.
    pub exec_times: usize,
    profiling: bool,
    print_report: bool,
    target_algo: Option<AlgorithmHandle>,
    // Set when the caller fixed the algorithm and it has not been applied yet.
    pending_commit: bool,
    workspace: WorkspaceWrapper,
    report: Option<BenchmarkReport>,
}

impl SelectionState {
    /// Fresh state: no algorithm chosen, no workspace bound.
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            warmup_times: config.warmup_times,
            exec_times: config.exec_times,
            profiling: config.profiling,
            print_report: config.print_report,
            target_algo: None,
            pending_commit: false,
            workspace: WorkspaceWrapper::invalid(),
            report: None,
        }
    }

    /// Whether profiling was requested.
    pub const fn profiling(&self) -> bool {
        self.profiling
    }

    /// The committed algorithm, if any.
    pub const fn target_algorithm(&self) -> Option<&AlgorithmHandle> {
        self.target_algo.as_ref()
    }

    /// Fix the algorithm up front; profiling will not run.
    pub fn set_target_algorithm(&mut self, algorithm: AlgorithmHandle) {
        self.target_algo = Some(algorithm);
        self.pending_commit = true;
    }

    /// The workspace owned by this state.
    pub const fn workspace(&self) -> &WorkspaceWrapper {
        &self.workspace
    }

    /// Measurements from the profiling pass, once it has run.
    pub const fn report(&self) -> Option<&BenchmarkReport> {
        self.report.as_ref()
    }

    /// Whether the next dispatch must benchmark the catalog.
    pub(crate) const fn needs_profiling(&self) -> bool {
        self.profiling && self.target_algo.is_none()
    }

    /// Whether a caller-fixed algorithm still has to be written to the policy.
    pub(crate) const fn pending_commit(&self) -> bool {
        self.pending_commit
    }

    pub(crate) fn take_pending_commit(&mut self) -> bool {
        std::mem::take(&mut self.pending_commit)
    }

    /// Bind the workspace to `handle` with zero capacity if it is unbound.
    pub(crate) fn ensure_workspace(&mut self, handle: &Handle) -> Result<()> {
        if !self.workspace.valid() {
            self.workspace = WorkspaceWrapper::new(handle, 0)?;
        }
        Ok(())
    }

    pub(crate) fn workspace_mut(&mut self) -> &mut WorkspaceWrapper {
        &mut self.workspace
    }
}

/// Benchmark every candidate and commit the fastest.
///
/// For each algorithm in catalog order: write it to the execution policy,
/// grow the workspace to its demand, run `warmup_times` untimed executions,
/// synchronize, time `exec_times` executions up to a second barrier. A
/// candidate replaces the best only if strictly faster, so the first of equal
/// candidates wins. Afterwards the winner (or `None` for an empty catalog) is
/// written to the policy and the workspace is sized for it.
pub fn profile<O, P>(
    state: &mut SelectionState,
    opr: &mut O,
    tensors: &[TensorND],
    layouts: &[TensorLayout],
) -> Result<()>
where
    O: AlgoOperator + ?Sized,
    P: FilterPreparer<O>,
{
    let handle = opr.handle().clone();
    let candidates = opr.get_all_algorithms(layouts)?;
    if candidates.is_empty() {
        warn!("algorithm catalog is empty; falling back to operator default");
    }

    let mut report = BenchmarkReport::new(state.warmup_times, state.exec_times);
    let mut min_time = u64::MAX;
    let mut best: Option<(usize, AlgorithmHandle)> = None;

    for (index, algo) in candidates.into_iter().enumerate() {
        opr.execution_policy_mut().algorithm = Some(algo.clone());
        let filter = P::prepare(opr, tensors, layouts, Some(&algo))?;

        let workspace_bytes = opr.get_workspace_in_bytes(layouts, filter.as_ref())?;
        state.workspace.update(workspace_bytes)?;
        let workspace = state.workspace.workspace();

        for _ in 0..state.warmup_times {
            opr.exec(tensors, filter.as_ref(), workspace)?;
        }
        handle.synchronize()?;

        let mut timer = handle.timer();
        timer.start();
        for _ in 0..state.exec_times {
            opr.exec(tensors, filter.as_ref(), workspace)?;
        }
        handle.synchronize()?;
        timer.stop();

        let timing = CandidateTiming {
            algorithm: algo.name().to_string(),
            elapsed_us: timer.get_time_in_us(),
            workspace_bytes,
        };
        if state.print_report {
            println!("{}", timing.summary_line());
        }
        debug!(
            algorithm = %timing.algorithm,
            elapsed_us = timing.elapsed_us,
            workspace_bytes,
            "measured candidate"
        );

        if timing.elapsed_us < min_time {
            min_time = timing.elapsed_us;
            best = Some((index, algo));
        }
        report.candidates.push(timing);
    }

    // Nothing is committed until the winner's policy and workspace are in place.
    let (selected_index, target) = best.unzip();
    opr.execution_policy_mut().algorithm = target.clone();
    let filter = P::prepare(opr, tensors, layouts, target.as_ref())?;
    let workspace_bytes = opr.get_workspace_in_bytes(layouts, filter.as_ref())?;
    state.workspace.update(workspace_bytes)?;

    if let Some(algo) = &target {
        info!(
            algorithm = algo.name(),
            elapsed_us = min_time,
            workspace_bytes,
            "committed algorithm"
        );
        report.selected = Some(algo.name().to_string());
        report.selected_index = selected_index;
    }
    state.target_algo = target;
    state.report = Some(report);
    Ok(())
}
