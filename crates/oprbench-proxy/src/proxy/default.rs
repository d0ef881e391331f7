//! Proxy for single-implementation operators.

use std::fmt;
use std::marker::PhantomData;

use anyhow::Result;
use oprbench_core::{layouts_of, TensorLayout, TensorND};

use super::{deduce_fixed_arity, OperatorProxy};
use crate::config::ProxyConfig;
use crate::operator::SimpleOperator;
use crate::workspace::{Workspace, WorkspaceWrapper};

/// Deduce when capable, then execute with a workspace scoped to the call.
pub struct DefaultProxy<O: ?Sized> {
    _marker: PhantomData<fn(&mut O)>,
}

impl<O: ?Sized> DefaultProxy<O> {
    /// A new proxy. It holds no state.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<O: ?Sized> Default for DefaultProxy<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ?Sized> fmt::Debug for DefaultProxy<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultProxy")
    }
}

impl<O: SimpleOperator + ?Sized> OperatorProxy<O> for DefaultProxy<O> {
    fn from_config(_config: &ProxyConfig) -> Self {
        Self::new()
    }

    fn deduce_layout(&self, opr: &O, layouts: &mut [TensorLayout]) -> Result<()> {
        deduce_fixed_arity(opr, layouts)
    }

    fn exec(&mut self, opr: &mut O, tensors: &[TensorND]) -> Result<()> {
        assert_eq!(
            tensors.len(),
            O::ARITY,
            "operator takes {} tensors, got {}",
            O::ARITY,
            tensors.len()
        );
        if !O::HAS_WORKSPACE {
            return opr.exec(tensors, Workspace::empty());
        }

        let bytes = opr.get_workspace_in_bytes(&layouts_of(tensors))?;
        let workspace = WorkspaceWrapper::new(opr.handle(), bytes)?;
        opr.exec(tensors, workspace.workspace())
    }
}
