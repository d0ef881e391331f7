//! Weight preprocessing.

use anyhow::Result;
use oprbench_core::{TensorLayout, TensorND};
use tracing::debug;

use crate::operator::{AlgorithmHandle, PreprocessedFilter, WeightPreprocessOperator};
use crate::selection::FilterPreparer;
use crate::tensors::alloc_tensors;
use crate::workspace::WorkspaceWrapper;

/// Preparer that pretransforms the filter operand for the policy's algorithm.
///
/// Each call allocates fresh preprocessed buffers, runs the operator's
/// preprocessing step with a scratch workspace that lives only for that step,
/// and waits for the device before handing the bundle back.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightPreprocessor;

impl<O: WeightPreprocessOperator + ?Sized> FilterPreparer<O> for WeightPreprocessor {
    fn prepare(
        opr: &mut O,
        tensors: &[TensorND],
        layouts: &[TensorLayout],
        algorithm: Option<&AlgorithmHandle>,
    ) -> Result<Option<PreprocessedFilter>> {
        let handle = opr.handle().clone();

        let filter_layouts = opr.deduce_preprocessed_filter_layout(layouts)?;
        let bundle = PreprocessedFilter {
            algorithm: algorithm.cloned(),
            tensors: alloc_tensors(&handle, &filter_layouts)?,
        };

        let scratch_bytes = opr.get_preprocess_workspace_in_bytes(layouts)?;
        let scratch = WorkspaceWrapper::new(&handle, scratch_bytes)?;
        opr.exec_preprocess(layouts, &tensors[O::FILTER_INDEX], &bundle, scratch.workspace())?;
        drop(scratch);

        handle.synchronize()?;
        debug!(
            algorithm = algorithm.map(AlgorithmHandle::name),
            buffers = filter_layouts.len(),
            scratch_bytes,
            "preprocessed filter"
        );
        Ok(Some(bundle))
    }
}
