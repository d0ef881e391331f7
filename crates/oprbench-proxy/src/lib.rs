//! oprbench operator proxy
//!
//! This crate drives compute operators on behalf of a test harness. Given an
//! operator and its tensors it deduces missing output layouts, sizes the
//! scratch workspace, optionally benchmarks every candidate algorithm and
//! keeps the fastest, and executes, preprocessing the filter first when the
//! operator supports it.
//!
//! ## Architecture
//!
//! - **Operator**: capability traits an operator kind implements
//! - **Workspace**: grow-only scratch buffer released on drop
//! - **Tensors**: shared device tensor sets freed with their last reference
//! - **Selection**: selection state and the benchmark loop
//! - **Preprocess**: weight preprocessing for filter-carrying operators
//! - **Dispatch**: the arity-checked execution entry point
//! - **Proxy**: per-kind proxies and the kind-to-proxy registration
//!
//! ## Example
//!
//! ```rust
//! use anyhow::Result;
//! use oprbench_core::{DataType, Handle, HostDevice, TensorLayout, TensorND};
//! use oprbench_proxy::{
//!     alloc_tensors, DefaultProxy, FixedArityOperator, Operator, OperatorProxy,
//!     SimpleOperator, Workspace,
//! };
//! use std::sync::Arc;
//!
//! struct Identity {
//!     handle: Handle,
//! }
//!
//! impl Operator for Identity {
//!     fn handle(&self) -> &Handle {
//!         &self.handle
//!     }
//! }
//!
//! impl FixedArityOperator for Identity {
//!     const ARITY: usize = 2;
//! }
//!
//! impl SimpleOperator for Identity {
//!     const HAS_WORKSPACE: bool = false;
//!
//!     fn exec(&mut self, _tensors: &[TensorND], _workspace: Workspace) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let handle = Handle::new(Arc::new(HostDevice::new()));
//! let layout = TensorLayout::new(vec![4], DataType::F32);
//! let tensors = alloc_tensors(&handle, &[layout.clone(), layout])?;
//!
//! let mut opr = Identity { handle };
//! let mut proxy = DefaultProxy::<Identity>::new();
//! proxy.exec(&mut opr, &tensors)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod dispatch;
pub mod operator;
pub mod preprocess;
pub mod proxy;
pub mod report;
pub mod selection;
pub mod tensors;
pub mod workspace;

pub use config::ProxyConfig;
pub use dispatch::dispatch;
pub use operator::{
    AlgoOperator, Algorithm, AlgorithmHandle, ExecutionPolicy, FixedArityOperator, ListOperator,
    NamedAlgorithm, OperandSplit, Operator, PreprocessedFilter, SimpleOperator,
    WeightPreprocessOperator,
};
pub use preprocess::WeightPreprocessor;
pub use proxy::{
    proxy_for, AlgoProxy, DefaultProxy, HasProxy, ListProxy, OperatorProxy, ProfilingProxy,
    WeightPreprocessProxy,
};
pub use report::{BenchmarkReport, CandidateTiming};
pub use selection::{profile, FilterPreparer, NoPreprocess, SelectionState};
pub use tensors::{alloc_tensors, DeviceTensors};
pub use workspace::{Workspace, WorkspaceWrapper};

/// Result type used throughout the proxy.
pub type Result<T> = anyhow::Result<T>;
