//! Async driver for `ScanController`
//!
//! A single task owns the controller and processes, one at a time:
//! - commands from `ScanHandle`s (start, stop, shutdown)
//! - sampling ticks, only while capturing
//! - settled lookups, tagged with their resolution token
//!
//! Because every input is handled to completion before the next is polled,
//! ticks never overlap and a stop always lands before any later result.

use crate::config::ScanConfig;
use crate::decoder::CodeDecoder;
use crate::error::ScanError;
use crate::frame::FrameSource;
use crate::resolver::{ResolutionRequest, TraceabilityResolver};
use crate::state_machine::ScanState;
use crate::types::{ResolutionToken, SessionId, TraceabilityRecord};
use crate::controller::ScanController;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Shortest sampling period the runtime will schedule
const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

enum Command {
    Start(oneshot::Sender<Result<SessionId, ScanError>>),
    Stop(oneshot::Sender<()>),
    Shutdown,
}

/// Lookup result travelling back to the runtime task
struct Settled {
    token: ResolutionToken,
    result: Result<TraceabilityRecord, ScanError>,
}

/// Cloneable control surface of a running scan runtime
#[derive(Debug, Clone)]
pub struct ScanHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ScanState>,
}

impl ScanHandle {
    /// Start a new scan session, superseding any current one
    pub async fn start(&self) -> Result<SessionId, ScanError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Start(tx)).await?;
        rx.await.map_err(|_| ScanError::RuntimeClosed)?
    }

    /// Stop the current session and release the camera
    pub async fn stop(&self) -> Result<(), ScanError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stop(tx)).await?;
        rx.await.map_err(|_| ScanError::RuntimeClosed)
    }

    /// Stop the runtime task. The camera is released before it exits.
    pub async fn shutdown(&self) -> Result<(), ScanError> {
        self.send(Command::Shutdown).await
    }

    /// Latest published state
    #[must_use]
    pub fn state(&self) -> ScanState {
        *self.state.borrow()
    }

    /// Wait until the published state satisfies `pred`
    pub async fn wait_for_state(
        &self,
        mut pred: impl FnMut(ScanState) -> bool,
    ) -> Result<ScanState, ScanError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| pred(*s))
            .await
            .map_err(|_| ScanError::RuntimeClosed)?;
        Ok(*state)
    }

    async fn send(&self, command: Command) -> Result<(), ScanError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ScanError::RuntimeClosed)
    }
}

/// Spawns the task that drives a `ScanController`
pub struct ScanRuntime;

impl ScanRuntime {
    /// Spawn the runtime on the current tokio runtime.
    ///
    /// The task exits on `shutdown` or when every handle is dropped.
    pub fn spawn<S, D, R>(
        controller: ScanController<S, D>,
        resolver: R,
        config: &ScanConfig,
    ) -> (ScanHandle, JoinHandle<()>)
    where
        S: FrameSource + 'static,
        D: CodeDecoder + 'static,
        R: TraceabilityResolver + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(controller.state());

        let mut period = config.tick_interval();
        if period < MIN_TICK_PERIOD {
            tracing::warn!(
                tick_interval_ms = config.tick_interval_ms,
                "tick interval below 1ms, clamping"
            );
            period = MIN_TICK_PERIOD;
        }

        let driver = Driver {
            controller,
            resolver: Arc::new(resolver),
            period,
            state: state_tx,
        };
        let task = tokio::spawn(driver.run(command_rx));

        let handle = ScanHandle {
            commands: command_tx,
            state: state_rx,
        };
        (handle, task)
    }
}

struct Driver<S: FrameSource, D: CodeDecoder, R> {
    controller: ScanController<S, D>,
    resolver: Arc<R>,
    period: Duration,
    state: watch::Sender<ScanState>,
}

impl<S, D, R> Driver<S, D, R>
where
    S: FrameSource + 'static,
    D: CodeDecoder + 'static,
    R: TraceabilityResolver + 'static,
{
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel::<Settled>();
        let mut ticker: Option<Interval> = None;

        tracing::debug!(period_ms = self.period.as_millis() as u64, "scan runtime started");

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Start(reply)) => {
                        let result = self.controller.start();
                        ticker = result.is_ok().then(|| self.new_ticker());
                        self.publish();
                        let _ = reply.send(result);
                    }
                    Some(Command::Stop(reply)) => {
                        self.controller.stop();
                        ticker = None;
                        self.publish();
                        let _ = reply.send(());
                    }
                    Some(Command::Shutdown) | None => break,
                },

                Some(settled) = settled_rx.recv() => {
                    self.controller.complete_resolution(settled.token, settled.result);
                    self.publish();
                }

                () = next_tick(&mut ticker) => {
                    if let Some(request) = self.controller.tick() {
                        self.spawn_resolution(request, settled_tx.clone());
                    }
                    if !self.controller.is_capturing() {
                        ticker = None;
                    }
                    self.publish();
                }
            }
        }

        self.controller.stop();
        self.publish();
        tracing::debug!("scan runtime stopped");
    }

    fn new_ticker(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    fn spawn_resolution(&self, request: ResolutionRequest, settled: mpsc::UnboundedSender<Settled>) {
        let resolver = Arc::clone(&self.resolver);
        tokio::spawn(async move {
            let ResolutionRequest { identifier, token } = request;
            let result = resolver.resolve(&identifier, token).await;
            // runtime gone means the session is gone too
            let _ = settled.send(Settled { token, result });
        });
    }

    fn publish(&self) {
        self.state.send_if_modified(|current| {
            let next = self.controller.state();
            let changed = *current != next;
            *current = next;
            changed
        });
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
