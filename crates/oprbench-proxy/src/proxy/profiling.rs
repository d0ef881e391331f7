//! Proxies for operators with an algorithm catalog.

use std::fmt;
use std::marker::PhantomData;

use anyhow::Result;
use oprbench_core::{TensorLayout, TensorND};

use super::{deduce_fixed_arity, OperatorProxy};
use crate::config::ProxyConfig;
use crate::dispatch::dispatch;
use crate::operator::{AlgoOperator, AlgorithmHandle};
use crate::preprocess::WeightPreprocessor;
use crate::report::BenchmarkReport;
use crate::selection::{FilterPreparer, NoPreprocess, SelectionState};

/// Proxy that optionally benchmarks the catalog once and then runs the
/// winner on every call.
///
/// `P` decides whether a preprocessed filter accompanies each execution; use
/// the [`ProfilingProxy`] and [`WeightPreprocessProxy`] aliases.
pub struct AlgoProxy<O: ?Sized, P> {
    state: SelectionState,
    _marker: PhantomData<(fn(&mut O), P)>,
}

/// Algorithm-selecting proxy without weight preprocessing.
pub type ProfilingProxy<O> = AlgoProxy<O, NoPreprocess>;

/// Algorithm-selecting proxy that preprocesses the filter before every
/// timed candidate and every execution.
pub type WeightPreprocessProxy<O> = AlgoProxy<O, WeightPreprocessor>;

impl<O: ?Sized, P> AlgoProxy<O, P> {
    /// Proxy with default loop counts; profiles on first use if `profiling`.
    pub fn new(profiling: bool) -> Self {
        Self::with_config(&ProxyConfig::new().with_profiling(profiling))
    }

    /// Proxy configured by `config`.
    pub fn with_config(config: &ProxyConfig) -> Self {
        Self {
            state: SelectionState::new(config),
            _marker: PhantomData,
        }
    }

    /// Fix the algorithm without profiling. It is written to the execution
    /// policy on the next call.
    pub fn set_target_algorithm(&mut self, algorithm: AlgorithmHandle) {
        self.state.set_target_algorithm(algorithm);
    }

    /// The committed algorithm, if any.
    pub fn selected_algorithm(&self) -> Option<&AlgorithmHandle> {
        self.state.target_algorithm()
    }

    /// Current workspace capacity in bytes.
    pub fn workspace_capacity(&self) -> usize {
        self.state.workspace().capacity()
    }

    /// Measurements from the profiling pass, if it ran.
    pub fn report(&self) -> Option<&BenchmarkReport> {
        self.state.report()
    }

    /// Selection state.
    pub const fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Mutable selection state, e.g. to change loop counts before first use.
    pub fn state_mut(&mut self) -> &mut SelectionState {
        &mut self.state
    }
}

impl<O: ?Sized, P> Default for AlgoProxy<O, P> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<O: ?Sized, P> fmt::Debug for AlgoProxy<O, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgoProxy").field("state", &self.state).finish()
    }
}

impl<O, P> OperatorProxy<O> for AlgoProxy<O, P>
where
    O: AlgoOperator + ?Sized,
    P: FilterPreparer<O>,
{
    fn from_config(config: &ProxyConfig) -> Self {
        Self::with_config(config)
    }

    fn deduce_layout(&self, opr: &O, layouts: &mut [TensorLayout]) -> Result<()> {
        deduce_fixed_arity(opr, layouts)
    }

    fn exec(&mut self, opr: &mut O, tensors: &[TensorND]) -> Result<()> {
        dispatch::<O, P>(&mut self.state, opr, tensors)
    }
}
