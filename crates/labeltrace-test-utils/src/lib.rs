//! Testing utilities for LabelTrace workspace
//!
//! Scripted camera, decoder and resolver fakes plus record fixtures.

#![allow(missing_docs)]

use labeltrace_core::{
    CodeDecoder, ComplianceStatus, EventReceiver, Frame, FrameSource, Identifier, LabelEntry,
    ProductSnapshot, QualityCheck, ResolutionToken, ScanError, ScanEvent, TraceabilityRecord,
    TraceabilityResolver, WorkflowLogEntry,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Observable device bookkeeping shared with a `FakeCamera`
#[derive(Debug, Default)]
pub struct CameraProbe {
    acquired: Mutex<bool>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    captures: AtomicUsize,
    /// Set when `start` ran while the device was still held
    double_acquire: Mutex<bool>,
}

impl CameraProbe {
    pub fn is_acquired(&self) -> bool {
        *self.acquired.lock()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn saw_double_acquire(&self) -> bool {
        *self.double_acquire.lock()
    }
}

/// Camera that serves blank frames, or scripted capture failures
#[derive(Debug)]
pub struct FakeCamera {
    probe: Arc<CameraProbe>,
    start_error: Option<ScanError>,
    script: VecDeque<Result<Frame, ScanError>>,
}

impl FakeCamera {
    /// Camera that always has a frame
    pub fn new() -> (Self, Arc<CameraProbe>) {
        let probe = Arc::new(CameraProbe::default());
        let camera = Self {
            probe: Arc::clone(&probe),
            start_error: None,
            script: VecDeque::new(),
        };
        (camera, probe)
    }

    /// Camera whose permission request is denied
    pub fn denied() -> (Self, Arc<CameraProbe>) {
        let (mut camera, probe) = Self::new();
        camera.start_error = Some(ScanError::DeviceUnavailable("permission denied".into()));
        (camera, probe)
    }

    /// Serve these capture results first, then blank frames
    pub fn with_script(mut self, script: impl IntoIterator<Item = Result<Frame, ScanError>>) -> Self {
        self.script = script.into_iter().collect();
        self
    }

    /// Report `NoFrameAvailable` for the first `ticks` captures
    pub fn warming_up(self, ticks: usize) -> Self {
        self.with_script((0..ticks).map(|_| Err(ScanError::NoFrameAvailable)))
    }
}

impl FrameSource for FakeCamera {
    fn start(&mut self) -> Result<(), ScanError> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }
        let mut acquired = self.probe.acquired.lock();
        if *acquired {
            *self.probe.double_acquire.lock() = true;
        }
        *acquired = true;
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<Frame, ScanError> {
        self.probe.captures.fetch_add(1, Ordering::SeqCst);
        if !self.probe.is_acquired() {
            return Err(ScanError::DeviceUnavailable("camera not started".into()));
        }
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(Frame::blank(8, 8)))
    }

    fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        *self.probe.acquired.lock() = false;
    }
}

/// Decoder that follows a script of per-call results.
///
/// Calls past the end of the script return `None`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecoder {
    script: Arc<Mutex<VecDeque<Option<String>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDecoder {
    pub fn new(script: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Misses on every call before `tick`, then yields `payload` once
    pub fn detect_on(tick: usize, payload: impl Into<String>) -> Self {
        let misses = tick.saturating_sub(1);
        let payload = payload.into();
        Self::new(
            std::iter::repeat(None)
                .take(misses)
                .chain(std::iter::once(Some(payload))),
        )
    }

    /// Never finds a code
    pub fn blind() -> Self {
        Self::new([])
    }

    /// Queue another payload after the current script
    pub fn push(&self, payload: Option<String>) {
        self.script.lock().push_back(payload);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CodeDecoder for ScriptedDecoder {
    fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().pop_front().flatten()
    }
}

/// In-memory lookup service keyed by identifier.
///
/// Unknown identifiers resolve to `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct StubResolver {
    entries: Arc<Mutex<HashMap<String, Result<TraceabilityRecord, ScanError>>>>,
    calls: Arc<Mutex<Vec<(Identifier, ResolutionToken)>>>,
}

impl StubResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, identifier: &str, record: TraceabilityRecord) -> Self {
        self.entries.lock().insert(identifier.to_string(), Ok(record));
        self
    }

    pub fn with_error(self, identifier: &str, error: ScanError) -> Self {
        self.entries.lock().insert(identifier.to_string(), Err(error));
        self
    }

    /// Every lookup issued so far, in order
    pub fn calls(&self) -> Vec<(Identifier, ResolutionToken)> {
        self.calls.lock().clone()
    }

    fn lookup(&self, identifier: &Identifier) -> Result<TraceabilityRecord, ScanError> {
        self.entries
            .lock()
            .get(identifier.as_str())
            .cloned()
            .unwrap_or_else(|| Err(ScanError::NotFound("Product not found".into())))
    }
}

#[async_trait::async_trait]
impl TraceabilityResolver for StubResolver {
    async fn resolve(
        &self,
        identifier: &Identifier,
        token: ResolutionToken,
    ) -> Result<TraceabilityRecord, ScanError> {
        self.calls.lock().push((identifier.clone(), token));
        self.lookup(identifier)
    }
}

/// `StubResolver` whose lookups block until the test releases them
#[derive(Debug, Clone)]
pub struct GatedResolver {
    inner: StubResolver,
    gate: Arc<Semaphore>,
    started: Arc<AtomicUsize>,
}

impl GatedResolver {
    pub fn new(inner: StubResolver) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Let `n` pending or future lookups complete
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Lookups that have begun (completed or not)
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(Identifier, ResolutionToken)> {
        self.inner.calls()
    }
}

#[async_trait::async_trait]
impl TraceabilityResolver for GatedResolver {
    async fn resolve(
        &self,
        identifier: &Identifier,
        token: ResolutionToken,
    ) -> Result<TraceabilityRecord, ScanError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        match self.gate.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return Err(ScanError::Unavailable("gate closed".into())),
        }
        self.inner.resolve(identifier, token).await
    }
}

/// Minimal record for `name` with the given compliance verdict
pub fn sample_record(name: &str, compliance: ComplianceStatus) -> TraceabilityRecord {
    TraceabilityRecord {
        product: ProductSnapshot {
            id: Some(format!("{name}-id")),
            name: name.to_string(),
            category: Some("Grains".into()),
            manufacturer: Some("Acme Mills".into()),
            batch_number: Some(name.to_string()),
            workflow_status: Some("completed".into()),
            ..Default::default()
        },
        quality_checks: vec![QualityCheck {
            parameter_name: "Moisture Content".into(),
            expected_value: Some("12.5".into()),
            actual_value: Some("12.1".into()),
            unit: Some("%".into()),
            status: Some("passed".into()),
            ..Default::default()
        }],
        labels: vec![LabelEntry {
            label_type: "qr_code".into(),
            label_data: Some(format!("https://trace.example/t/{name}")),
            is_verified: true,
            ..Default::default()
        }],
        workflow_logs: vec![WorkflowLogEntry {
            action: "quality_check".into(),
            status: "success".into(),
            ..Default::default()
        }],
        traceability_score: 85.0,
        compliance_status: compliance,
    }
}

/// Everything currently buffered on an event stream
pub fn drain_events(rx: &mut EventReceiver) -> Vec<ScanEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
