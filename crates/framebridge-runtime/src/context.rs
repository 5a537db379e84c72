//! [`SessionContext`] – everything one bridge session knows.
//!
//! Holds the anchor registry, the pairing table, the fitter and the
//! UNCALIBRATED → CALIBRATED state machine.  The orchestrator owns exactly one
//! context and is its only writer.

use std::path::Path;

use framebridge_perception::{
    AnchorRegistry, CalibrationEngine, CalibrationRecord, CalibrationResult, PairingTable,
    RecordError, Transform,
};
use tracing::info;

/// Whether a transform has been frozen for this session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CalibrationState {
    #[default]
    Uncalibrated,
    Calibrated(CalibrationResult),
}

#[derive(Debug)]
pub struct SessionContext {
    pub(crate) registry: AnchorRegistry,
    pub(crate) pairing: PairingTable,
    pub(crate) engine: CalibrationEngine,
    state: CalibrationState,
}

impl SessionContext {
    pub fn new(pairing: PairingTable, engine: CalibrationEngine) -> Self {
        Self {
            registry: AnchorRegistry::new(),
            pairing,
            engine,
            state: CalibrationState::Uncalibrated,
        }
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    pub fn pairing(&self) -> &PairingTable {
        &self.pairing
    }

    pub fn engine(&self) -> &CalibrationEngine {
        &self.engine
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// The frozen transform, if any.
    pub fn transform(&self) -> Option<&Transform> {
        match &self.state {
            CalibrationState::Calibrated(result) => Some(&result.transform),
            CalibrationState::Uncalibrated => None,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated(_))
    }

    /// Freeze `result` for the rest of the session.
    pub fn freeze(&mut self, result: CalibrationResult) {
        self.state = CalibrationState::Calibrated(result);
    }

    /// Drop the frozen transform.  Anchors are kept.
    pub fn reset(&mut self) {
        self.state = CalibrationState::Uncalibrated;
    }

    /// Start CALIBRATED from a previously written audit record.
    ///
    /// # Errors
    ///
    /// Any [`RecordError`]; the context is left unchanged on failure.
    pub fn restore_from(&mut self, path: &Path) -> Result<CalibrationResult, RecordError> {
        let result = CalibrationRecord::load(path)?.to_result()?;
        info!(
            path = %path.display(),
            model = result.transform.model(),
            rms_error = result.rms_error,
            "restored calibration from record"
        );
        self.freeze(result);
        Ok(result)
    }
}
