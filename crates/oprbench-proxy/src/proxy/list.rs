//! Proxy for operators over a variable-length operand list.
//!
//! Concatenation and the elementwise family take every operand but the last
//! as input; split takes the first as input. None of them profile.

use std::fmt;
use std::marker::PhantomData;

use anyhow::Result;
use oprbench_core::{layouts_of, TensorLayout, TensorND};

use super::OperatorProxy;
use crate::config::ProxyConfig;
use crate::operator::{ListOperator, OperandSplit};
use crate::workspace::{Workspace, WorkspaceWrapper};

/// Proxy for [`ListOperator`] kinds.
pub struct ListProxy<O: ?Sized> {
    _marker: PhantomData<fn(&mut O)>,
}

impl<O: ?Sized> ListProxy<O> {
    /// A new proxy. It holds no state.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<O: ?Sized> Default for ListProxy<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ?Sized> fmt::Debug for ListProxy<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ListProxy")
    }
}

fn assert_list_len(len: usize) {
    assert!(len >= 2, "operand list needs at least 2 entries, got {len}");
}

impl<O: ListOperator + ?Sized> OperatorProxy<O> for ListProxy<O> {
    fn from_config(_config: &ProxyConfig) -> Self {
        Self::new()
    }

    /// Writes the last layout from the others for trailing-output kinds.
    /// Leading-input kinds never deduce.
    fn deduce_layout(&self, opr: &O, layouts: &mut [TensorLayout]) -> Result<()> {
        if !O::CAN_DEDUCE_LAYOUT || O::OPERAND_SPLIT == OperandSplit::LeadingInput {
            return Ok(());
        }
        assert_list_len(layouts.len());
        let last = layouts.len() - 1;
        let (inputs, output) = layouts.split_at_mut(last);
        opr.deduce_layout(inputs, &mut output[0])
    }

    fn exec(&mut self, opr: &mut O, tensors: &[TensorND]) -> Result<()> {
        assert_list_len(tensors.len());
        let (inputs, outputs) = O::OPERAND_SPLIT.split(tensors);
        if !O::HAS_WORKSPACE {
            return opr.exec(inputs, outputs, Workspace::empty());
        }

        let bytes = opr.get_workspace_in_bytes(&layouts_of(inputs), &layouts_of(outputs))?;
        let workspace = WorkspaceWrapper::new(opr.handle(), bytes)?;
        opr.exec(inputs, outputs, workspace.workspace())
    }
}
