//! `framebridge-runtime` – the bridge's control loop.
//!
//! Wires the perception layer (registry, pairing, calibration) to the
//! middleware edges (peer session, detection source) and runs them as one
//! sequential cycle.
//!
//! # Modules
//!
//! - [`context`] – [`SessionContext`][context::SessionContext]: per-session
//!   state and the UNCALIBRATED → CALIBRATED transition.
//! - [`orchestrator`] – [`SessionOrchestrator`][orchestrator::SessionOrchestrator]:
//!   the receive → observe → calibrate → emit cycle, reconnect handling and
//!   the audit record.
//! - [`telemetry`] – `tracing` subscriber and optional OTLP export.

pub mod context;
pub mod orchestrator;
pub mod telemetry;

pub use context::{CalibrationState, SessionContext};
pub use orchestrator::{
    CycleReport, OrchestratorConfig, ReconnectPolicy, RuntimeError, SessionOrchestrator,
};
pub use telemetry::{TracerProviderGuard, init_tracing};
