//! Execution dispatch for algorithm-selecting operators.
//!
//! One generic routine serves every arity; the operand count comes from
//! [`FixedArityOperator::ARITY`](crate::operator::FixedArityOperator::ARITY)
//! and preprocessing from the [`FilterPreparer`] type parameter.

use anyhow::Result;
use oprbench_core::{layouts_of, TensorND};

use crate::operator::AlgoOperator;
use crate::selection::{profile, FilterPreparer, SelectionState};

/// Execute `opr` once on `tensors`, selecting an algorithm first if needed.
///
/// The first call binds the workspace to the operator's device and, when
/// profiling is on and nothing is fixed yet, benchmarks the catalog. Every
/// call then prepares the filter for the committed algorithm, sizes the
/// workspace from the operator default when no algorithm is committed, and
/// runs one execution.
///
/// # Panics
///
/// Panics if `tensors.len()` differs from the operator's arity.
pub fn dispatch<O, P>(state: &mut SelectionState, opr: &mut O, tensors: &[TensorND]) -> Result<()>
where
    O: AlgoOperator + ?Sized,
    P: FilterPreparer<O>,
{
    assert_eq!(
        tensors.len(),
        O::ARITY,
        "operator takes {} tensors, got {}",
        O::ARITY,
        tensors.len()
    );
    let layouts = layouts_of(tensors);

    let handle = opr.handle().clone();
    state.ensure_workspace(&handle)?;

    if state.needs_profiling() {
        profile::<O, P>(state, opr, tensors, &layouts)?;
    }
    if state.pending_commit() {
        opr.execution_policy_mut().algorithm = state.target_algorithm().cloned();
    }

    let filter = P::prepare(opr, tensors, &layouts, state.target_algorithm())?;
    if state.target_algorithm().is_none() || state.take_pending_commit() {
        let bytes = opr.get_workspace_in_bytes(&layouts, filter.as_ref())?;
        state.workspace_mut().update(bytes)?;
    }

    opr.exec(tensors, filter.as_ref(), state.workspace().workspace())
}
