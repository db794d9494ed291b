//! Scan controller
//!
//! Owns the one active `ScanSession` and every lifecycle decision:
//! - Acquires and releases the camera device
//! - Samples a frame per tick and runs the decoder on it
//! - Normalizes the first detection and issues exactly one lookup
//! - Accepts lookup results only when their token is still active
//!
//! The controller is synchronous. Timing and the asynchronous lookup are
//! driven from outside (see `ScanRuntime`), which keeps every transition
//! testable without a clock.

use crate::config::ScanConfig;
use crate::decoder::{decode_frame, CodeDecoder, DecodedPayload};
use crate::error::ScanError;
use crate::event::{EventReceiver, EventSink, ScanEvent};
use crate::frame::FrameSource;
use crate::normalize::normalize;
use crate::resolver::ResolutionRequest;
use crate::state_machine::{validate_transition, ScanState};
use crate::types::{Identifier, ResolutionToken, SessionId, TraceabilityRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Where a session is in its single scan
#[derive(Debug, Clone)]
enum SessionPhase {
    Capturing,
    Resolving {
        identifier: Identifier,
        token: ResolutionToken,
    },
    Resolved(Arc<TraceabilityRecord>),
    Failed(ScanError),
}

impl SessionPhase {
    fn state(&self) -> ScanState {
        match self {
            Self::Capturing => ScanState::Capturing,
            Self::Resolving { .. } => ScanState::Resolving,
            Self::Resolved(_) => ScanState::Resolved,
            Self::Failed(_) => ScanState::Failed,
        }
    }
}

/// One "start scanning" action.
///
/// Created on start, dropped on stop or restart. The lookup token only exists
/// while the phase is `Resolving`, so "loading" without a session, or a token
/// outliving its session, cannot be expressed.
#[derive(Debug, Clone)]
pub struct ScanSession {
    id: SessionId,
    started_at: DateTime<Utc>,
    last_detection: Option<DecodedPayload>,
    phase: SessionPhase,
    missed_frames: u32,
}

impl ScanSession {
    fn new() -> Self {
        Self {
            id: SessionId::new(),
            started_at: Utc::now(),
            last_detection: None,
            phase: SessionPhase::Capturing,
            missed_frames: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.phase.state()
    }

    /// Payload that moved the session out of `Capturing`
    #[inline]
    #[must_use]
    pub fn last_detection(&self) -> Option<&DecodedPayload> {
        self.last_detection.as_ref()
    }

    /// Token of the in-flight lookup, if any
    #[must_use]
    pub fn active_resolution(&self) -> Option<ResolutionToken> {
        match &self.phase {
            SessionPhase::Resolving { token, .. } => Some(*token),
            _ => None,
        }
    }

    /// Identifier being resolved, if any
    #[must_use]
    pub fn resolving_identifier(&self) -> Option<&Identifier> {
        match &self.phase {
            SessionPhase::Resolving { identifier, .. } => Some(identifier),
            _ => None,
        }
    }
}

/// Orchestrates frame sampling, detection and lookup for one camera
pub struct ScanController<S: FrameSource, D: CodeDecoder> {
    source: S,
    decoder: D,
    stalled_frame_warning_ticks: u32,
    events: EventSink,
    session: Option<ScanSession>,
}

impl<S: FrameSource, D: CodeDecoder> ScanController<S, D> {
    /// Create a controller and the event stream the presenter reads
    #[must_use]
    pub fn new(source: S, decoder: D, config: &ScanConfig) -> (Self, EventReceiver) {
        let (events, rx) = EventSink::channel();
        let controller = Self {
            source,
            decoder,
            stalled_frame_warning_ticks: config.stalled_frame_warning_ticks,
            events,
            session: None,
        };
        (controller, rx)
    }

    /// Current state; `Idle` when there is no session
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.session
            .as_ref()
            .map_or(ScanState::Idle, ScanSession::state)
    }

    #[inline]
    #[must_use]
    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn active_resolution(&self) -> Option<ResolutionToken> {
        self.session.as_ref().and_then(ScanSession::active_resolution)
    }

    /// Record resolved by the current session
    #[must_use]
    pub fn record(&self) -> Option<Arc<TraceabilityRecord>> {
        match self.session.as_ref().map(|s| &s.phase) {
            Some(SessionPhase::Resolved(record)) => Some(Arc::clone(record)),
            _ => None,
        }
    }

    /// Error that failed the current session
    #[must_use]
    pub fn last_error(&self) -> Option<&ScanError> {
        match self.session.as_ref().map(|s| &s.phase) {
            Some(SessionPhase::Failed(err)) => Some(err),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.state() == ScanState::Capturing
    }

    /// Begin a new scan session.
    ///
    /// Any existing session is stopped first: its device is released and its
    /// lookup token invalidated. Device failures are emitted as
    /// `DeviceFailed` and returned; the controller stays `Idle`.
    pub fn start(&mut self) -> Result<SessionId, ScanError> {
        if self.session.is_some() {
            tracing::debug!("restarting scan, superseding current session");
            self.stop();
        }

        if let Err(err) = self.source.start() {
            tracing::warn!(error = %err, "camera acquisition failed");
            // release any partial acquisition
            self.source.stop();
            self.events.emit(ScanEvent::DeviceFailed(err.kind()));
            return Err(err);
        }

        self.enter(ScanState::Idle, ScanState::Capturing)?;
        let session = ScanSession::new();
        let id = session.id;
        self.session = Some(session);
        tracing::info!(session = %id, "scan session started");
        Ok(id)
    }

    /// Sample one frame.
    ///
    /// Returns the lookup to issue when this tick produced a detection. Ticks
    /// outside `Capturing` are ignored.
    pub fn tick(&mut self) -> Option<ResolutionRequest> {
        if !self.is_capturing() {
            tracing::trace!(state = ?self.state(), "tick ignored");
            return None;
        }

        match self.try_tick() {
            Ok(request) => request,
            Err(err) => {
                tracing::error!(error = %err, "scan tick aborted");
                None
            }
        }
    }

    fn try_tick(&mut self) -> Result<Option<ResolutionRequest>, ScanError> {
        let frame = match self.source.capture_frame() {
            Ok(frame) => frame,
            Err(ScanError::NoFrameAvailable) => {
                self.note_missing_frame();
                return Ok(None);
            }
            Err(err @ ScanError::DeviceUnavailable(_)) => {
                tracing::warn!(error = %err, "camera lost while capturing");
                self.events.emit(ScanEvent::DeviceFailed(err.kind()));
                self.stop();
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if let Some(session) = self.session.as_mut() {
            session.missed_frames = 0;
        }

        match decode_frame(&self.decoder, &frame) {
            Some(payload) => self.on_detection(payload).map(Some),
            None => Ok(None),
        }
    }

    fn note_missing_frame(&mut self) {
        let threshold = self.stalled_frame_warning_ticks;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.missed_frames = session.missed_frames.saturating_add(1);
        if threshold > 0 && session.missed_frames == threshold {
            tracing::warn!(
                session = %session.id,
                ticks = threshold,
                "camera has not produced a frame"
            );
        }
    }

    fn on_detection(&mut self, payload: DecodedPayload) -> Result<ResolutionRequest, ScanError> {
        let identifier = normalize(&payload.text);
        let token = ResolutionToken::new();

        self.enter(ScanState::Capturing, ScanState::Detected)?;
        self.events.emit(ScanEvent::CodeDetected {
            identifier: identifier.clone(),
            payload: payload.text.clone(),
        });
        self.enter(ScanState::Detected, ScanState::Resolving)?;

        let session = self.session.as_mut().ok_or(ScanError::IllegalTransition {
            from: ScanState::Idle,
            to: ScanState::Resolving,
        })?;
        tracing::info!(
            session = %session.id,
            identifier = %identifier,
            token = %token,
            "code detected"
        );
        session.last_detection = Some(payload);
        session.phase = SessionPhase::Resolving {
            identifier: identifier.clone(),
            token,
        };

        Ok(ResolutionRequest { identifier, token })
    }

    /// Apply a settled lookup.
    ///
    /// Returns `false` when the token is no longer active; the result is then
    /// dropped without any state change or event.
    pub fn complete_resolution(
        &mut self,
        token: ResolutionToken,
        result: Result<TraceabilityRecord, ScanError>,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!(token = %token, "discarding lookup result: no session");
            return false;
        };
        let identifier = match &session.phase {
            SessionPhase::Resolving {
                token: active,
                identifier,
            } if *active == token => identifier.clone(),
            _ => {
                tracing::debug!(
                    session = %session.id,
                    token = %token,
                    "discarding stale lookup result"
                );
                return false;
            }
        };
        let session_id = session.id;

        match result {
            Ok(record) => {
                let record = Arc::new(record);
                tracing::info!(
                    session = %session_id,
                    identifier = %identifier,
                    compliance = %record.compliance_status,
                    "traceability record resolved"
                );
                session.phase = SessionPhase::Resolved(Arc::clone(&record));
                self.events.emit(ScanEvent::ResolutionSucceeded(record));
            }
            Err(err) => {
                tracing::warn!(
                    session = %session_id,
                    identifier = %identifier,
                    error = %err,
                    "traceability lookup failed"
                );
                let kind = err.kind();
                session.phase = SessionPhase::Failed(err);
                self.events.emit(ScanEvent::ResolutionFailed(kind));
            }
        }
        true
    }

    /// End the current session and release the device. Idempotent.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let from = session.state();
        if let Err(err) = self.enter(from, ScanState::Stopped) {
            tracing::error!(error = %err, "stop from unexpected state");
        }
        self.source.stop();
        if let Err(err) = self.enter(ScanState::Stopped, ScanState::Idle) {
            tracing::error!(error = %err, "stop from unexpected state");
        }
        tracing::info!(session = %session.id, from = ?from, "scan session stopped");
    }

    fn enter(&self, from: ScanState, to: ScanState) -> Result<(), ScanError> {
        validate_transition(from, to)?;
        tracing::debug!(from = ?from, to = ?to, "scan transition");
        self.events.emit(ScanEvent::StateChanged(to));
        Ok(())
    }
}

impl<S: FrameSource, D: CodeDecoder> Drop for ScanController<S, D> {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            self.source.stop();
        }
    }
}

impl<S: FrameSource, D: CodeDecoder> std::fmt::Debug for ScanController<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
