//! [`SessionOrchestrator`] – the bridge's control loop.
//!
//! One cooperative cycle, repeated until interrupted:
//!
//! 1. **Receive** – bounded-wait read from the peer.  Anchor messages go into
//!    the registry; a recalibration request drops the frozen transform.
//!    Timeouts are normal and decode errors are logged and skipped.
//! 2. **Observe** – read the current detection snapshot.
//! 3. **Match** – compute the ready pairs.
//! 4. **Calibrate** – while UNCALIBRATED, try a fit; on success freeze it and
//!    write the audit record (best-effort).
//! 5. **Emit** – while CALIBRATED, send one pose per detection.
//! 6. **Sleep** – `poll_interval`, in [`SessionOrchestrator::run`] only.
//!
//! Only a dead connection ends the loop early.  Depending on the
//! [`ReconnectPolicy`] it is either fatal straight away or retried with
//! exponential backoff; registry and frozen transform survive a reconnect.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use framebridge_middleware::{CorrespondenceSource, Inbound, Outbound, PeerChannel, SessionError};
use framebridge_perception::{CalibrationOutcome, CalibrationRecord, CalibrationResult};
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, trace, warn};
use uuid::Uuid;

use crate::context::SessionContext;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The connection died and no reconnect was allowed.
    #[error("peer connection lost: {0}")]
    Fatal(#[from] SessionError),

    #[error("peer connection lost; {attempts} reconnect attempt(s) failed: {source}")]
    ReconnectExhausted {
        attempts: u32,
        #[source]
        source: SessionError,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// What to do when the connection to the peer dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// `0` makes a dropped connection fatal.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the 1-based `attempt`: doubles each time, capped at
    /// `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

/// Configuration bundle for [`SessionOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between cycles.
    pub poll_interval: Duration,
    /// Upper bound on the receive step of each cycle.
    pub receive_timeout: Duration,
    /// Where to write the audit record after a fit.  `None` disables it.
    pub record_path: Option<PathBuf>,
    pub reconnect: ReconnectPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            receive_timeout: Duration::from_millis(10),
            record_path: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub anchors_registered: usize,
    pub decode_errors: usize,
    pub recalibration_requested: bool,
    pub detections: usize,
    pub ready_pairs: usize,
    /// Set only on the cycle that froze a new transform.
    pub calibrated: Option<CalibrationResult>,
    pub poses_sent: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionOrchestrator
// ─────────────────────────────────────────────────────────────────────────────

pub struct SessionOrchestrator<C, S> {
    channel: C,
    source: S,
    context: SessionContext,
    config: OrchestratorConfig,
}

impl<C: PeerChannel, S: CorrespondenceSource> SessionOrchestrator<C, S> {
    pub fn new(channel: C, source: S, context: SessionContext, config: OrchestratorConfig) -> Self {
        Self {
            channel,
            source,
            context,
            config,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Run cycles until `shutdown` is set, then close the connection.
    ///
    /// # Errors
    ///
    /// [`RuntimeError`] when the connection is lost and the reconnect policy
    /// does not (or can no longer) restore it.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<(), RuntimeError> {
        let span = info_span!("session", session_id = %Uuid::new_v4());
        async {
            info!(
                pairs = self.context.pairing.len(),
                mode = ?self.context.engine.mode(),
                calibrated = self.context.is_calibrated(),
                "session started"
            );
            while !shutdown.load(Ordering::SeqCst) {
                match self.run_cycle().await {
                    Ok(report) => trace!(?report, "cycle complete"),
                    Err(RuntimeError::Fatal(cause)) => {
                        if !self.reconnect(cause, &shutdown).await? {
                            break;
                        }
                    }
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
            info!("interrupted; closing session");
            self.channel.close().await;
            Ok::<(), RuntimeError>(())
        }
        .instrument(span)
        .await
    }

    /// One receive → observe → match → calibrate → emit pass.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Fatal`] when the connection is closed, unreadable or a
    /// send fails.  Everything else is absorbed and counted in the report.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, RuntimeError> {
        let mut report = CycleReport::default();

        // ── 1. Receive ───────────────────────────────────────────────────────
        for message in self.channel.receive(self.config.receive_timeout).await? {
            match message {
                Ok(Inbound::AnchorCreated {
                    anchor_id,
                    position,
                }) => {
                    if let Some(previous) = self.context.registry.register_anchor(anchor_id, position)
                    {
                        debug!(%anchor_id, %previous, %position, "anchor moved");
                    } else {
                        info!(%anchor_id, %position, "anchor registered");
                    }
                    report.anchors_registered += 1;
                }
                Ok(Inbound::Recalibrate) => {
                    if self.context.is_calibrated() {
                        info!("recalibration requested; dropping frozen transform");
                    }
                    self.context.reset();
                    report.recalibration_requested = true;
                }
                Ok(Inbound::Ignored { kind }) => trace!(%kind, "ignoring message"),
                Err(e) => {
                    warn!(error = %e, "discarding undecodable message");
                    report.decode_errors += 1;
                }
            }
        }

        // ── 2. Observe ───────────────────────────────────────────────────────
        let snapshot = self.source.read_snapshot();
        report.detections = snapshot.len();

        // ── 3. Match ─────────────────────────────────────────────────────────
        report.ready_pairs = self
            .context
            .pairing
            .ready_pairs(&self.context.registry, &snapshot)
            .len();

        // ── 4. Calibrate ─────────────────────────────────────────────────────
        if !self.context.is_calibrated() {
            let ctx = &self.context;
            match ctx.engine.calibrate(&ctx.registry, &ctx.pairing, &snapshot) {
                Ok(CalibrationOutcome::NotReady { ready_pairs }) => {
                    debug!(ready_pairs, "not enough pairs to calibrate yet");
                }
                Ok(CalibrationOutcome::Calibrated(result)) => {
                    info!(
                        model = result.transform.model(),
                        rms_error = result.rms_error,
                        pair_count = result.pair_count,
                        "calibration frozen"
                    );
                    self.context.freeze(result);
                    self.write_record(&result);
                    report.calibrated = Some(result);
                }
                Err(e) => warn!(error = %e, "calibration failed; will retry"),
            }
        }

        // ── 5. Emit ──────────────────────────────────────────────────────────
        if let Some(transform) = self.context.transform().copied() {
            for (id, point) in &snapshot {
                let pose = Outbound::pose(*id, &transform.apply(point));
                self.channel.send(&pose).await?;
                report.poses_sent += 1;
            }
        }

        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    fn write_record(&self, result: &CalibrationResult) {
        let Some(path) = &self.config.record_path else {
            return;
        };
        match CalibrationRecord::from_result(result, Utc::now()).save(path) {
            Ok(()) => info!(path = %path.display(), "calibration record written"),
            Err(e) => warn!(error = %e, "could not write calibration record"),
        }
    }

    /// Try to restore the connection after `cause`.  `Ok(false)` means the
    /// shutdown flag was raised while waiting.
    async fn reconnect(
        &mut self,
        cause: SessionError,
        shutdown: &AtomicBool,
    ) -> Result<bool, RuntimeError> {
        let policy = self.config.reconnect;
        if policy.max_attempts == 0 {
            return Err(RuntimeError::Fatal(cause));
        }
        warn!(error = %cause, "connection lost; reconnecting");

        let mut last = cause;
        for attempt in 1..=policy.max_attempts {
            if shutdown.load(Ordering::SeqCst) {
                return Ok(false);
            }
            tokio::time::sleep(policy.backoff(attempt)).await;
            match self.channel.reconnect().await {
                Ok(()) => {
                    info!(attempt, "session restored");
                    return Ok(true);
                }
                Err(e) => {
                    warn!(attempt, max_attempts = policy.max_attempts, error = %e, "reconnect failed");
                    last = e;
                }
            }
        }
        Err(RuntimeError::ReconnectExhausted {
            attempts: policy.max_attempts,
            source: last,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
