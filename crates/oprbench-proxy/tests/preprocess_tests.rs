//! Weight preprocessing through `WeightPreprocessProxy`.

mod common;

use anyhow::Result;
use common::{candidate, FakeConv, FakeConvBias, Rig};
use oprbench_core::CoreError;
use oprbench_proxy::{proxy_for, OperatorProxy, ProxyConfig, WeightPreprocessProxy};

fn conv(rig: &Rig) -> FakeConv {
    FakeConv::new(
        rig,
        vec![candidate("winograd", 12, 128), candidate("im2col", 8, 512)],
    )
}

#[test]
fn test_preprocess_runs_for_every_candidate_and_call() -> Result<()> {
    let rig = Rig::new();
    let tensors = rig.square_tensors(3);
    let mut opr = conv(&rig);
    let mut proxy = WeightPreprocessProxy::<FakeConv>::with_config(&ProxyConfig::quick());

    proxy.exec(&mut opr, &tensors)?;
    assert_eq!(proxy.selected_algorithm(), Some(&opr.algo("im2col")));
    // One pass per candidate, one after committing, one for the call itself.
    let expected: Vec<Option<String>> = ["winograd", "im2col", "im2col", "im2col"]
        .iter()
        .map(|name| Some((*name).to_string()))
        .collect();
    assert_eq!(opr.preprocess_log, expected);
    assert!(opr.filter_log.iter().all(|used| *used));

    proxy.exec(&mut opr, &tensors)?;
    assert_eq!(opr.preprocess_log.len(), 5);
    Ok(())
}

#[test]
fn test_preprocessed_buffers_do_not_outlive_the_call() -> Result<()> {
    let rig = Rig::new();
    let tensors = rig.square_tensors(3);
    let mut opr = conv(&rig);
    let mut proxy = WeightPreprocessProxy::<FakeConv>::with_config(&ProxyConfig::quick());

    for _ in 0..3 {
        proxy.exec(&mut opr, &tensors)?;
        // Three operands plus the proxy's workspace; no filter or scratch buffers.
        assert_eq!(rig.device.outstanding(), 4);
    }
    drop(proxy);
    assert_eq!(rig.device.outstanding(), 3);
    Ok(())
}

#[test]
fn test_barrier_follows_each_preprocess_pass() -> Result<()> {
    let rig = Rig::new();
    let tensors = rig.square_tensors(3);
    let mut opr = conv(&rig);
    let mut proxy = WeightPreprocessProxy::<FakeConv>::with_config(&ProxyConfig::quick());

    proxy.exec(&mut opr, &tensors)?;
    // Per candidate: preprocess, warm-up, measured batch. Then commit and call.
    assert_eq!(rig.device.stats().sync_count, 2 * 3 + 2);

    proxy.exec(&mut opr, &tensors)?;
    assert_eq!(rig.device.stats().sync_count, 2 * 3 + 3);
    Ok(())
}

#[test]
fn test_profiling_disabled_still_preprocesses() -> Result<()> {
    let rig = Rig::new();
    let tensors = rig.square_tensors(3);
    let mut opr = conv(&rig);
    let mut proxy = WeightPreprocessProxy::<FakeConv>::new(false);

    proxy.exec(&mut opr, &tensors)?;
    assert!(proxy.selected_algorithm().is_none());
    assert_eq!(opr.preprocess_log, vec![None]);
    assert_eq!(opr.filter_log, vec![true]);
    assert_eq!(proxy.workspace_capacity(), opr.default_workspace_bytes);
    Ok(())
}

#[test]
fn test_caller_fixed_algorithm_is_preprocessed() -> Result<()> {
    let rig = Rig::new();
    let tensors = rig.square_tensors(3);
    let mut opr = conv(&rig);
    let mut proxy = WeightPreprocessProxy::<FakeConv>::new(true);
    proxy.set_target_algorithm(opr.algo("winograd"));

    proxy.exec(&mut opr, &tensors)?;
    assert_eq!(opr.catalog_queries.get(), 0);
    assert_eq!(opr.preprocess_log, vec![Some("winograd".to_string())]);
    assert_eq!(proxy.workspace_capacity(), 128);
    Ok(())
}

#[test]
fn test_filter_allocation_failure_frees_partial_set() {
    let rig = Rig::new();
    let tensors = rig.square_tensors(5);
    let mut opr = FakeConvBias::new(&rig, vec![candidate("only", 1, 0)]);
    opr.preprocessed_buffers = 3;
    let mut proxy = proxy_for::<FakeConvBias>(&ProxyConfig::quick());
    // The first preprocessed buffer succeeds, the second does not.
    rig.device.fail_after(1);

    let err = proxy.exec(&mut opr, &tensors).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CoreError>(),
        Some(CoreError::Allocation { .. })
    ));
    assert!(opr.preprocess_log.is_empty());

    drop(proxy);
    assert_eq!(rig.device.outstanding(), 5);
}
