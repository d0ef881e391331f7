//! Per-kind proxies.
//!
//! Every operator kind maps to exactly one proxy type through [`HasProxy`]:
//!
//! | Kind                                   | Proxy                     |
//! |----------------------------------------|---------------------------|
//! | several algorithms                     | [`ProfilingProxy`]        |
//! | several algorithms, preprocessed filter| [`WeightPreprocessProxy`] |
//! | single implementation, fixed arity     | [`DefaultProxy`]          |
//! | variable operand list                  | [`ListProxy`]             |
//!
//! The harness builds the proxy with [`proxy_for`] and drives it through
//! [`OperatorProxy`].

mod default;
mod list;
mod profiling;

use anyhow::Result;
use oprbench_core::{TensorLayout, TensorND};

use crate::config::ProxyConfig;
use crate::operator::FixedArityOperator;

pub use default::DefaultProxy;
pub use list::ListProxy;
pub use profiling::{AlgoProxy, ProfilingProxy, WeightPreprocessProxy};

/// Harness-facing interface of a proxy for operator kind `O`.
pub trait OperatorProxy<O: ?Sized> {
    /// Build a proxy from `config`. Proxies without tunables ignore it.
    fn from_config(config: &ProxyConfig) -> Self
    where
        Self: Sized;

    /// Fill the output layouts of `layouts` in place when `O` can deduce
    /// them; otherwise leave the list untouched.
    fn deduce_layout(&self, opr: &O, layouts: &mut [TensorLayout]) -> Result<()>;

    /// Run `opr` once on `tensors`.
    fn exec(&mut self, opr: &mut O, tensors: &[TensorND]) -> Result<()>;
}

/// Compile-time registration of an operator kind's proxy.
pub trait HasProxy {
    /// Proxy driving this kind.
    type Proxy: OperatorProxy<Self>;
}

/// Build the registered proxy for `O`.
pub fn proxy_for<O: HasProxy + ?Sized>(config: &ProxyConfig) -> O::Proxy {
    <O::Proxy as OperatorProxy<O>>::from_config(config)
}

/// Layout deduction for fixed-arity kinds: inputs first, the trailing
/// `NR_OUTPUTS` entries are written.
///
/// # Panics
///
/// Panics if `O` can deduce and `layouts.len()` differs from its arity.
pub(crate) fn deduce_fixed_arity<O>(opr: &O, layouts: &mut [TensorLayout]) -> Result<()>
where
    O: FixedArityOperator + ?Sized,
{
    if !O::CAN_DEDUCE_LAYOUT {
        return Ok(());
    }
    assert_eq!(
        layouts.len(),
        O::ARITY,
        "operator takes {} layouts, got {}",
        O::ARITY,
        layouts.len()
    );
    let (inputs, outputs) = layouts.split_at_mut(O::ARITY - O::NR_OUTPUTS);
    opr.deduce_layout(inputs, outputs)
}
