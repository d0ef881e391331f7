//! Operator capability traits.
//!
//! An operator kind opts into proxy behaviour by implementing the traits
//! matching what it can do. The proxies are generic over these traits, so
//! the choice between "deduce layouts or not", "profile algorithms or not"
//! and "preprocess weights or not" is made at compile time per kind.
//!
//! - [`Operator`]: every kind; exposes its [`Handle`].
//! - [`FixedArityOperator`]: a fixed number of tensor operands, optional layout deduction.
//! - [`AlgoOperator`]: several interchangeable algorithms plus an execution policy.
//! - [`WeightPreprocessOperator`]: algorithms that can pretransform the filter.
//! - [`SimpleOperator`]: a single implementation with a fixed arity.
//! - [`ListOperator`]: a variable-length operand list (concat, split, elementwise).

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use oprbench_core::{Handle, TensorLayout, TensorND};

use crate::tensors::DeviceTensors;
use crate::workspace::Workspace;

/// One implementation strategy of an operator.
pub trait Algorithm: Send + Sync + fmt::Debug {
    /// Name used in benchmark reports.
    fn name(&self) -> &str;

    /// Whether repeated runs produce bit-identical output.
    fn is_reproducible(&self) -> bool {
        true
    }
}

/// Algorithm carrying nothing but its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAlgorithm {
    name: String,
}

impl NamedAlgorithm {
    /// Create a named algorithm.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Algorithm for NamedAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Shared reference to a long-lived algorithm.
///
/// Equality is identity: two handles are equal only if they point at the
/// same algorithm object, regardless of name.
#[derive(Clone)]
pub struct AlgorithmHandle(Arc<dyn Algorithm>);

impl AlgorithmHandle {
    /// Wrap an algorithm.
    pub fn new(algorithm: impl Algorithm + 'static) -> Self {
        Self(Arc::new(algorithm))
    }

    /// Name used in benchmark reports.
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Access the algorithm object.
    pub fn algorithm(&self) -> &dyn Algorithm {
        self.0.as_ref()
    }
}

impl From<Arc<dyn Algorithm>> for AlgorithmHandle {
    fn from(algorithm: Arc<dyn Algorithm>) -> Self {
        Self(algorithm)
    }
}

impl PartialEq for AlgorithmHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for AlgorithmHandle {}

impl fmt::Debug for AlgorithmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AlgorithmHandle").field(&self.name()).finish()
    }
}

/// Which algorithm an operator runs. `None` leaves the choice to the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Selected algorithm.
    pub algorithm: Option<AlgorithmHandle>,
}

/// Weight buffers pretransformed for one algorithm.
///
/// The tensor set is reference counted; its device buffers are freed when
/// the last clone of the bundle goes away.
#[derive(Debug, Clone)]
pub struct PreprocessedFilter {
    /// Algorithm the buffers were prepared for.
    pub algorithm: Option<AlgorithmHandle>,
    /// Prepared buffers.
    pub tensors: Arc<DeviceTensors>,
}

/// Base trait of every operator kind.
pub trait Operator {
    /// Device and stream context.
    fn handle(&self) -> &Handle;
}

/// Operator with a fixed number of tensor operands.
///
/// Operands are ordered inputs first; the last [`NR_OUTPUTS`](Self::NR_OUTPUTS)
/// operands are outputs.
pub trait FixedArityOperator: Operator {
    /// Number of tensor operands, inputs plus outputs.
    const ARITY: usize;

    /// Number of trailing output operands.
    const NR_OUTPUTS: usize = 1;

    /// Whether [`deduce_layout`](Self::deduce_layout) is implemented.
    const CAN_DEDUCE_LAYOUT: bool = false;

    /// Fill `outputs` from fully specified `inputs`.
    fn deduce_layout(&self, inputs: &[TensorLayout], outputs: &mut [TensorLayout]) -> Result<()> {
        let _ = (inputs, outputs);
        bail!("operator cannot deduce output layouts")
    }
}

/// Operator offering several algorithms selected through an execution policy.
pub trait AlgoOperator: FixedArityOperator {
    /// Candidate algorithms for this layout combination, in catalog order.
    fn get_all_algorithms(&self, layouts: &[TensorLayout]) -> Result<Vec<AlgorithmHandle>>;

    /// Current execution policy.
    fn execution_policy(&self) -> &ExecutionPolicy;

    /// Mutable execution policy.
    fn execution_policy_mut(&mut self) -> &mut ExecutionPolicy;

    /// Workspace needed by the policy's algorithm (or the operator's default
    /// choice when the policy is empty).
    fn get_workspace_in_bytes(
        &self,
        layouts: &[TensorLayout],
        preprocessed_filter: Option<&PreprocessedFilter>,
    ) -> Result<usize>;

    /// Run the operator on all operands.
    fn exec(
        &mut self,
        tensors: &[TensorND],
        preprocessed_filter: Option<&PreprocessedFilter>,
        workspace: Workspace,
    ) -> Result<()>;
}

/// Operator whose algorithms can pretransform the filter operand.
pub trait WeightPreprocessOperator: AlgoOperator {
    /// Operand index of the filter.
    const FILTER_INDEX: usize = 1;

    /// Layouts of the preprocessed buffers for the current policy.
    fn deduce_preprocessed_filter_layout(&self, layouts: &[TensorLayout]) -> Result<Vec<TensorLayout>>;

    /// Scratch memory needed by [`exec_preprocess`](Self::exec_preprocess).
    fn get_preprocess_workspace_in_bytes(&self, layouts: &[TensorLayout]) -> Result<usize>;

    /// Write the preprocessed filter into `preprocessed_filter`'s buffers.
    ///
    /// Only the filter's data is read; every other operand is described by
    /// its layout alone.
    fn exec_preprocess(
        &mut self,
        layouts: &[TensorLayout],
        filter: &TensorND,
        preprocessed_filter: &PreprocessedFilter,
        workspace: Workspace,
    ) -> Result<()>;
}

/// Fixed-arity operator with exactly one implementation.
pub trait SimpleOperator: FixedArityOperator {
    /// Whether the operator ever needs a workspace.
    const HAS_WORKSPACE: bool = true;

    /// Workspace needed for these layouts.
    fn get_workspace_in_bytes(&self, layouts: &[TensorLayout]) -> Result<usize> {
        let _ = layouts;
        Ok(0)
    }

    /// Run the operator on all operands.
    fn exec(&mut self, tensors: &[TensorND], workspace: Workspace) -> Result<()>;
}

/// How a variable-length operand list divides into inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSplit {
    /// Every operand but the last is an input; the last is the output.
    TrailingOutput,
    /// The first operand is the input; the rest are outputs.
    LeadingInput,
}

impl OperandSplit {
    /// Split `items` into `(inputs, outputs)`.
    ///
    /// An empty list splits into two empty slices.
    pub fn split<T>(self, items: &[T]) -> (&[T], &[T]) {
        match self {
            Self::TrailingOutput => items.split_at(items.len().saturating_sub(1)),
            Self::LeadingInput => items.split_at(items.len().min(1)),
        }
    }
}

/// Operator over a variable number of operands.
pub trait ListOperator: Operator {
    /// Input/output convention.
    const OPERAND_SPLIT: OperandSplit;

    /// Whether [`deduce_layout`](Self::deduce_layout) is implemented.
    const CAN_DEDUCE_LAYOUT: bool = false;

    /// Whether the operator ever needs a workspace.
    const HAS_WORKSPACE: bool = false;

    /// Compute the single output layout from the inputs.
    fn deduce_layout(&self, inputs: &[TensorLayout], output: &mut TensorLayout) -> Result<()> {
        let _ = (inputs, output);
        bail!("operator cannot deduce output layouts")
    }

    /// Workspace needed for these layouts.
    fn get_workspace_in_bytes(&self, inputs: &[TensorLayout], outputs: &[TensorLayout]) -> Result<usize> {
        let _ = (inputs, outputs);
        Ok(0)
    }

    /// Run the operator.
    fn exec(&mut self, inputs: &[TensorND], outputs: &[TensorND], workspace: Workspace) -> Result<()>;
}
