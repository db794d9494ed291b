//! End-to-end scan scenarios
//!
//! Drive the runtime with paused time against scripted fakes.

use labeltrace_core::prelude::*;
use labeltrace_core::{ComplianceStatus, Identifier};
use labeltrace_test_utils::{
    drain_events, sample_record, FakeCamera, GatedResolver, ScriptedDecoder, StubResolver,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn config() -> ScanConfig {
    ScanConfig::new().with_tick_interval(Duration::from_millis(500))
}

#[tokio::test(start_paused = true)]
async fn scenario_url_payload_resolves_compliant() {
    let (camera, probe) = FakeCamera::new();
    let decoder = ScriptedDecoder::detect_on(3, "https://trace.example/t/BATCH77");
    let resolver = StubResolver::new()
        .with_record("BATCH77", sample_record("BATCH77", ComplianceStatus::Compliant));

    let (controller, mut events) = ScanController::new(camera, decoder.clone(), &config());
    let (handle, task) = ScanRuntime::spawn(controller, resolver.clone(), &config());

    handle.start().await.unwrap();
    let end = handle.wait_for_state(ScanState::is_terminal).await.unwrap();
    assert_eq!(end, ScanState::Resolved);
    assert_eq!(decoder.calls(), 3);

    let seen = drain_events(&mut events);
    let n = seen.len();
    assert!(n >= 2);
    assert_eq!(seen[n - 2], ScanEvent::StateChanged(ScanState::Resolving));
    match &seen[n - 1] {
        ScanEvent::ResolutionSucceeded(record) => {
            assert_eq!(record.compliance_status, ComplianceStatus::Compliant);
            assert_eq!(record.product.batch_number.as_deref(), Some("BATCH77"));
        }
        other => panic!("unexpected final event: {other:?}"),
    }
    assert!(seen.contains(&ScanEvent::CodeDetected {
        identifier: Identifier::new("BATCH77"),
        payload: "https://trace.example/t/BATCH77".into(),
    }));

    let calls = resolver.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.as_str(), "BATCH77");

    handle.stop().await.unwrap();
    assert!(!probe.is_acquired());
    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn scenario_unknown_identifier_fails_without_retry() {
    let (camera, probe) = FakeCamera::new();
    let decoder = ScriptedDecoder::detect_on(1, "UNKNOWN99");
    let resolver = StubResolver::new();

    let (controller, mut events) = ScanController::new(camera, decoder.clone(), &config());
    let (handle, task) = ScanRuntime::spawn(controller, resolver.clone(), &config());

    handle.start().await.unwrap();
    let end = handle.wait_for_state(ScanState::is_terminal).await.unwrap();
    assert_eq!(end, ScanState::Failed);

    // Plenty of time for any retry to show up
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(resolver.calls().len(), 1);
    assert_eq!(decoder.calls(), 1);

    let seen = drain_events(&mut events);
    assert_eq!(
        seen.last(),
        Some(&ScanEvent::ResolutionFailed(ErrorKind::NotFound))
    );

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    assert!(!probe.is_acquired());
}

#[tokio::test(start_paused = true)]
async fn scenario_stop_discards_pending_resolution() {
    let (camera, probe) = FakeCamera::new();
    let decoder = ScriptedDecoder::detect_on(1, "X");
    let resolver = GatedResolver::new(
        StubResolver::new().with_record("X", sample_record("X", ComplianceStatus::Pending)),
    );

    let (controller, mut events) = ScanController::new(camera, decoder, &config());
    let (handle, task) = ScanRuntime::spawn(controller, resolver.clone(), &config());

    handle.start().await.unwrap();
    handle
        .wait_for_state(|s| s == ScanState::Resolving)
        .await
        .unwrap();
    handle.stop().await.unwrap();
    assert!(!probe.is_acquired());

    resolver.release(1);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(resolver.started(), 1);
    assert_eq!(handle.state(), ScanState::Idle);
    let seen = drain_events(&mut events);
    assert!(
        !seen.iter().any(|e| matches!(
            e,
            ScanEvent::ResolutionSucceeded(_) | ScanEvent::ResolutionFailed(_)
        )),
        "late result leaked: {seen:?}"
    );

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn restart_keeps_only_newest_result() {
    let (camera, probe) = FakeCamera::new();
    let decoder = ScriptedDecoder::detect_on(1, "FIRST");
    decoder.push(Some("SECOND".into()));
    let resolver = GatedResolver::new(
        StubResolver::new()
            .with_record("FIRST", sample_record("FIRST", ComplianceStatus::NonCompliant))
            .with_record("SECOND", sample_record("SECOND", ComplianceStatus::Compliant)),
    );

    let (controller, mut events) = ScanController::new(camera, decoder, &config());
    let (handle, task) = ScanRuntime::spawn(controller, resolver.clone(), &config());

    let first = handle.start().await.unwrap();
    handle
        .wait_for_state(|s| s == ScanState::Resolving)
        .await
        .unwrap();

    let second = handle.start().await.unwrap();
    assert_ne!(first, second);
    assert!(!probe.saw_double_acquire());
    handle
        .wait_for_state(|s| s == ScanState::Resolving)
        .await
        .unwrap();

    // The superseded lookup queued first, so it is released first
    resolver.release(1);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.state(), ScanState::Resolving);

    resolver.release(1);
    let end = handle.wait_for_state(ScanState::is_terminal).await.unwrap();
    assert_eq!(end, ScanState::Resolved);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let calls = resolver.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0.as_str(), "FIRST");
    assert_eq!(calls[1].0.as_str(), "SECOND");
    assert_ne!(calls[0].1, calls[1].1);

    let outcomes: Vec<_> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            ScanEvent::ResolutionSucceeded(record) => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].product.name, "SECOND");
    assert_eq!(outcomes[0].compliance_status, ComplianceStatus::Compliant);
    assert_eq!(probe.starts(), 2);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn thousand_misses_stay_capturing_silently() {
    let (camera, _probe) = FakeCamera::new();
    let decoder = ScriptedDecoder::blind();

    let (controller, mut events) = ScanController::new(camera, decoder.clone(), &config());
    let (handle, task) = ScanRuntime::spawn(controller, StubResolver::new(), &config());

    handle.start().await.unwrap();
    drain_events(&mut events);

    tokio::time::sleep(Duration::from_millis(500 * 1000 + 250)).await;

    assert_eq!(decoder.calls(), 1000);
    assert_eq!(handle.state(), ScanState::Capturing);
    assert!(drain_events(&mut events).is_empty());

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn warming_camera_is_not_an_error() {
    let (camera, probe) = FakeCamera::new();
    let camera = camera.warming_up(5);
    let decoder = ScriptedDecoder::detect_on(1, "ABC123");
    let resolver = StubResolver::new()
        .with_record("ABC123", sample_record("ABC123", ComplianceStatus::Compliant));

    let (controller, mut events) = ScanController::new(camera, decoder.clone(), &config());
    let (handle, task) = ScanRuntime::spawn(controller, resolver, &config());

    handle.start().await.unwrap();
    let end = handle.wait_for_state(ScanState::is_terminal).await.unwrap();

    assert_eq!(end, ScanState::Resolved);
    assert_eq!(probe.captures(), 6);
    assert_eq!(decoder.calls(), 1);
    assert!(!drain_events(&mut events).iter().any(ScanEvent::is_error));

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn denied_camera_surfaces_device_failure() {
    let (camera, probe) = FakeCamera::denied();
    let (controller, mut events) =
        ScanController::new(camera, ScriptedDecoder::blind(), &config());
    let (handle, task) = ScanRuntime::spawn(controller, StubResolver::new(), &config());

    let err = handle.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceUnavailable);
    assert_eq!(handle.state(), ScanState::Idle);
    assert!(!probe.is_acquired());
    assert_eq!(
        drain_events(&mut events),
        vec![ScanEvent::DeviceFailed(ErrorKind::DeviceUnavailable)]
    );

    drop(handle);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_releases_camera() {
    let (camera, probe) = FakeCamera::new();
    let (controller, _events) =
        ScanController::new(camera, ScriptedDecoder::blind(), &config());
    let (handle, task) = ScanRuntime::spawn(controller, StubResolver::new(), &config());

    handle.start().await.unwrap();
    assert!(probe.is_acquired());

    drop(handle);
    task.await.unwrap();
    assert!(!probe.is_acquired());
}
