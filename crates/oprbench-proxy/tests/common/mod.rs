//! Fake operators shared by the proxy integration tests.
//!
//! Every fake runs on a [`TrackingDevice`] and a [`ManualClock`]: executing
//! an algorithm advances the clock by its configured cost, so measured times
//! are exact, and every buffer is counted, so leaks show up as outstanding
//! allocations.

#![allow(dead_code)]

use std::cell::Cell;
use std::sync::Arc;

use anyhow::{anyhow, bail, ensure, Result};
use oprbench_core::{DataType, Handle, ManualClock, TensorLayout, TensorND, TrackingDevice};
use oprbench_proxy::{
    alloc_tensors, AlgoOperator, AlgorithmHandle, DeviceTensors, ExecutionPolicy,
    FixedArityOperator, HasProxy, ListOperator, NamedAlgorithm, OperandSplit, Operator,
    PreprocessedFilter, ProfilingProxy, SimpleOperator, WeightPreprocessOperator,
    WeightPreprocessProxy, Workspace,
};

/// Tracked device, manual clock and the handle joining them.
pub struct Rig {
    pub device: Arc<TrackingDevice>,
    pub clock: Arc<ManualClock>,
    pub handle: Handle,
}

impl Rig {
    pub fn new() -> Self {
        let device = Arc::new(TrackingDevice::host());
        let clock = Arc::new(ManualClock::new());
        let handle = Handle::with_clock(device.clone(), clock.clone());
        Self {
            device,
            clock,
            handle,
        }
    }

    pub fn tensors(&self, layouts: &[TensorLayout]) -> Arc<DeviceTensors> {
        alloc_tensors(&self.handle, layouts).expect("allocate test tensors")
    }

    /// `n` contiguous 4x4 f32 tensors.
    pub fn square_tensors(&self, n: usize) -> Arc<DeviceTensors> {
        self.tensors(&vec![square(); n])
    }
}

pub fn square() -> TensorLayout {
    TensorLayout::new(vec![4, 4], DataType::F32)
}

/// One catalog entry with its simulated cost.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub algo: AlgorithmHandle,
    pub cost_us: u64,
    pub workspace_bytes: usize,
}

pub fn candidate(name: &str, cost_us: u64, workspace_bytes: usize) -> Candidate {
    Candidate {
        algo: AlgorithmHandle::new(NamedAlgorithm::new(name)),
        cost_us,
        workspace_bytes,
    }
}

/// Algorithm-selecting operator with `N` operands and a preprocessable filter.
pub struct FakeAlgoOpr<const N: usize> {
    handle: Handle,
    clock: Arc<ManualClock>,
    policy: ExecutionPolicy,
    pub catalog: Vec<Candidate>,
    pub default_cost_us: u64,
    pub default_workspace_bytes: usize,
    pub preprocess_workspace_bytes: usize,
    pub preprocessed_buffers: usize,
    pub fail_exec: bool,
    /// Keep the logs below; benchmarks turn this off.
    pub record: bool,
    /// Algorithm named by the policy at each execution, `None` for default.
    pub exec_log: Vec<Option<String>>,
    /// Workspace size passed to each execution.
    pub workspace_log: Vec<usize>,
    /// Whether each execution received a preprocessed filter.
    pub filter_log: Vec<bool>,
    /// Algorithm each preprocessing pass ran for.
    pub preprocess_log: Vec<Option<String>>,
    pub catalog_queries: Cell<usize>,
}

/// Three operands, like a convolution.
pub type FakeConv = FakeAlgoOpr<3>;
/// Five operands, like a fused convolution with bias and residual.
pub type FakeConvBias = FakeAlgoOpr<5>;
/// Eight operands, like a deformable convolution backward pass.
pub type FakeDeformableBackward = FakeAlgoOpr<8>;

impl<const N: usize> FakeAlgoOpr<N> {
    pub fn new(rig: &Rig, catalog: Vec<Candidate>) -> Self {
        Self {
            handle: rig.handle.clone(),
            clock: rig.clock.clone(),
            policy: ExecutionPolicy::default(),
            catalog,
            default_cost_us: 50,
            default_workspace_bytes: 96,
            preprocess_workspace_bytes: 48,
            preprocessed_buffers: 2,
            fail_exec: false,
            record: true,
            exec_log: Vec::new(),
            workspace_log: Vec::new(),
            filter_log: Vec::new(),
            preprocess_log: Vec::new(),
            catalog_queries: Cell::new(0),
        }
    }

    pub fn algo(&self, name: &str) -> AlgorithmHandle {
        self.catalog
            .iter()
            .find(|c| c.algo.name() == name)
            .map(|c| c.algo.clone())
            .expect("algorithm in catalog")
    }

    pub fn policy_name(&self) -> Option<String> {
        self.policy.algorithm.as_ref().map(|a| a.name().to_string())
    }

    fn current(&self) -> Result<(u64, usize)> {
        match &self.policy.algorithm {
            None => Ok((self.default_cost_us, self.default_workspace_bytes)),
            Some(algo) => self
                .catalog
                .iter()
                .find(|c| &c.algo == algo)
                .map(|c| (c.cost_us, c.workspace_bytes))
                .ok_or_else(|| anyhow!("algorithm {} is not in the catalog", algo.name())),
        }
    }
}

impl<const N: usize> Operator for FakeAlgoOpr<N> {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl<const N: usize> FixedArityOperator for FakeAlgoOpr<N> {
    const ARITY: usize = N;
    const CAN_DEDUCE_LAYOUT: bool = true;

    fn deduce_layout(&self, inputs: &[TensorLayout], outputs: &mut [TensorLayout]) -> Result<()> {
        ensure!(!inputs.is_empty(), "no inputs to deduce from");
        outputs[0] = inputs[0].clone();
        Ok(())
    }
}

impl<const N: usize> AlgoOperator for FakeAlgoOpr<N> {
    fn get_all_algorithms(&self, layouts: &[TensorLayout]) -> Result<Vec<AlgorithmHandle>> {
        ensure!(layouts.len() == N, "catalog queried with {} layouts", layouts.len());
        self.catalog_queries.set(self.catalog_queries.get() + 1);
        Ok(self.catalog.iter().map(|c| c.algo.clone()).collect())
    }

    fn execution_policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    fn execution_policy_mut(&mut self) -> &mut ExecutionPolicy {
        &mut self.policy
    }

    fn get_workspace_in_bytes(
        &self,
        _layouts: &[TensorLayout],
        _preprocessed_filter: Option<&PreprocessedFilter>,
    ) -> Result<usize> {
        self.current().map(|(_, bytes)| bytes)
    }

    fn exec(
        &mut self,
        tensors: &[TensorND],
        preprocessed_filter: Option<&PreprocessedFilter>,
        workspace: Workspace,
    ) -> Result<()> {
        if self.fail_exec {
            bail!("injected kernel failure");
        }
        ensure!(tensors.len() == N, "executed with {} tensors", tensors.len());
        let (cost_us, needed) = self.current()?;
        ensure!(
            workspace.size >= needed,
            "workspace too small: {} < {needed}",
            workspace.size
        );
        if let Some(filter) = preprocessed_filter {
            ensure!(
                filter.algorithm == self.policy.algorithm,
                "filter prepared for a different algorithm"
            );
            ensure!(filter.tensors.len() == self.preprocessed_buffers);
        }

        self.clock.advance_us(cost_us);
        if self.record {
            self.exec_log.push(self.policy_name());
            self.workspace_log.push(workspace.size);
            self.filter_log.push(preprocessed_filter.is_some());
        }
        Ok(())
    }
}

impl<const N: usize> WeightPreprocessOperator for FakeAlgoOpr<N> {
    fn deduce_preprocessed_filter_layout(&self, layouts: &[TensorLayout]) -> Result<Vec<TensorLayout>> {
        let filter = &layouts[Self::FILTER_INDEX];
        Ok(vec![filter.clone(); self.preprocessed_buffers])
    }

    fn get_preprocess_workspace_in_bytes(&self, _layouts: &[TensorLayout]) -> Result<usize> {
        Ok(self.preprocess_workspace_bytes)
    }

    fn exec_preprocess(
        &mut self,
        layouts: &[TensorLayout],
        filter: &TensorND,
        preprocessed_filter: &PreprocessedFilter,
        workspace: Workspace,
    ) -> Result<()> {
        ensure!(filter.layout == layouts[Self::FILTER_INDEX], "wrong filter operand");
        ensure!(workspace.size >= self.preprocess_workspace_bytes);
        ensure!(
            preprocessed_filter.algorithm == self.policy.algorithm,
            "preprocessing for an algorithm the policy does not name"
        );
        if self.record {
            self.preprocess_log.push(self.policy_name());
        }
        Ok(())
    }
}

impl HasProxy for FakeConv {
    type Proxy = ProfilingProxy<Self>;
}

impl HasProxy for FakeConvBias {
    type Proxy = WeightPreprocessProxy<Self>;
}

/// Matrix multiply `[m, k] x [k, n] -> [m, n]` with one implementation.
pub struct FakeMatmul {
    handle: Handle,
    pub workspace_bytes: usize,
    pub workspace_log: Vec<usize>,
}

impl FakeMatmul {
    pub fn new(rig: &Rig) -> Self {
        Self {
            handle: rig.handle.clone(),
            workspace_bytes: 128,
            workspace_log: Vec::new(),
        }
    }
}

impl Operator for FakeMatmul {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl FixedArityOperator for FakeMatmul {
    const ARITY: usize = 3;
    const CAN_DEDUCE_LAYOUT: bool = true;

    fn deduce_layout(&self, inputs: &[TensorLayout], outputs: &mut [TensorLayout]) -> Result<()> {
        let (a, b) = (&inputs[0], &inputs[1]);
        ensure!(
            a.ndim() == 2 && b.ndim() == 2 && a.shape[1] == b.shape[0],
            "shape mismatch: {a} x {b}"
        );
        outputs[0] = TensorLayout::new(vec![a.shape[0], b.shape[1]], a.dtype);
        Ok(())
    }
}

impl SimpleOperator for FakeMatmul {
    fn get_workspace_in_bytes(&self, _layouts: &[TensorLayout]) -> Result<usize> {
        Ok(self.workspace_bytes)
    }

    fn exec(&mut self, tensors: &[TensorND], workspace: Workspace) -> Result<()> {
        ensure!(tensors.len() == 3);
        ensure!(workspace.size >= self.workspace_bytes && workspace.raw_ptr.is_some());
        self.workspace_log.push(workspace.size);
        Ok(())
    }
}

/// Two-operand copy that never needs a workspace and cannot deduce.
pub struct FakeCopy {
    handle: Handle,
    pub calls: usize,
}

impl FakeCopy {
    pub fn new(rig: &Rig) -> Self {
        Self {
            handle: rig.handle.clone(),
            calls: 0,
        }
    }
}

impl Operator for FakeCopy {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl FixedArityOperator for FakeCopy {
    const ARITY: usize = 2;
}

impl SimpleOperator for FakeCopy {
    const HAS_WORKSPACE: bool = false;

    fn exec(&mut self, _tensors: &[TensorND], workspace: Workspace) -> Result<()> {
        ensure!(workspace == Workspace::empty());
        self.calls += 1;
        Ok(())
    }
}

/// One recorded list-operator execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCall {
    pub inputs: usize,
    pub outputs: usize,
    pub workspace_bytes: usize,
}

/// Concatenation along the first axis.
pub struct FakeConcat {
    handle: Handle,
    pub calls: Vec<ListCall>,
}

/// Split of the first operand into the rest.
pub struct FakeSplit {
    handle: Handle,
    pub calls: Vec<ListCall>,
}

/// Elementwise operator over same-shaped inputs.
pub struct FakeElemwise {
    handle: Handle,
    pub calls: Vec<ListCall>,
}

macro_rules! list_fake {
    ($($name:ident),*) => {$(
        impl $name {
            pub fn new(rig: &Rig) -> Self {
                Self {
                    handle: rig.handle.clone(),
                    calls: Vec::new(),
                }
            }
        }

        impl Operator for $name {
            fn handle(&self) -> &Handle {
                &self.handle
            }
        }
    )*};
}

list_fake!(FakeConcat, FakeSplit, FakeElemwise);

fn record(calls: &mut Vec<ListCall>, inputs: &[TensorND], outputs: &[TensorND], workspace: Workspace) {
    calls.push(ListCall {
        inputs: inputs.len(),
        outputs: outputs.len(),
        workspace_bytes: workspace.size,
    });
}

impl ListOperator for FakeConcat {
    const OPERAND_SPLIT: OperandSplit = OperandSplit::TrailingOutput;
    const CAN_DEDUCE_LAYOUT: bool = true;
    const HAS_WORKSPACE: bool = true;

    fn deduce_layout(&self, inputs: &[TensorLayout], output: &mut TensorLayout) -> Result<()> {
        let first = &inputs[0];
        ensure!(
            inputs.iter().all(|l| l.shape[1..] == first.shape[1..]),
            "concat inputs disagree outside axis 0"
        );
        let mut shape = first.shape.clone();
        shape[0] = inputs.iter().map(|l| l.shape[0]).sum();
        *output = TensorLayout::new(shape, first.dtype);
        Ok(())
    }

    fn get_workspace_in_bytes(&self, inputs: &[TensorLayout], _outputs: &[TensorLayout]) -> Result<usize> {
        Ok(16 * inputs.len())
    }

    fn exec(&mut self, inputs: &[TensorND], outputs: &[TensorND], workspace: Workspace) -> Result<()> {
        ensure!(workspace.size == 16 * inputs.len());
        record(&mut self.calls, inputs, outputs, workspace);
        Ok(())
    }
}

impl ListOperator for FakeSplit {
    const OPERAND_SPLIT: OperandSplit = OperandSplit::LeadingInput;
    const HAS_WORKSPACE: bool = true;

    fn get_workspace_in_bytes(&self, _inputs: &[TensorLayout], outputs: &[TensorLayout]) -> Result<usize> {
        Ok(32 * outputs.len())
    }

    fn exec(&mut self, inputs: &[TensorND], outputs: &[TensorND], workspace: Workspace) -> Result<()> {
        ensure!(workspace.size == 32 * outputs.len());
        record(&mut self.calls, inputs, outputs, workspace);
        Ok(())
    }
}

impl ListOperator for FakeElemwise {
    const OPERAND_SPLIT: OperandSplit = OperandSplit::TrailingOutput;
    const CAN_DEDUCE_LAYOUT: bool = true;

    fn deduce_layout(&self, inputs: &[TensorLayout], output: &mut TensorLayout) -> Result<()> {
        ensure!(
            inputs.iter().all(|l| l.eq_shape(&inputs[0])),
            "elementwise inputs differ in shape"
        );
        *output = inputs[0].clone();
        Ok(())
    }

    fn exec(&mut self, inputs: &[TensorND], outputs: &[TensorND], workspace: Workspace) -> Result<()> {
        ensure!(workspace == Workspace::empty());
        record(&mut self.calls, inputs, outputs, workspace);
        Ok(())
    }
}
