//! `framebridge-perception` – frame calibration layer.
//!
//! Learns how to express detector-frame points in the peer's reference frame
//! from matched anchor/marker pairs.
//!
//! # Modules
//!
//! - [`registry`] – [`AnchorRegistry`][registry::AnchorRegistry]: anchor
//!   positions announced by the peer, upserted by ID.
//! - [`pairing`] – [`PairingTable`][pairing::PairingTable]: the static
//!   anchor ↔ detector declarations and the per-cycle "ready pairs" join.
//! - [`calibration`] – [`CalibrationEngine`][calibration::CalibrationEngine]:
//!   rigid (Kabsch/Umeyama) and affine least-squares fits plus the RMS
//!   residual.
//! - [`transform`] – [`Transform`][transform::Transform]: the fitted models and
//!   their application to detector points.
//! - [`record`] – [`CalibrationRecord`][record::CalibrationRecord]: the JSON
//!   audit record written after a fit.

pub mod calibration;
pub mod pairing;
pub mod record;
pub mod registry;
pub mod transform;

pub use calibration::{
    CalibrationEngine, CalibrationError, CalibrationOutcome, CalibrationResult, FitMode, MIN_PAIRS,
};
pub use pairing::{Correspondence, PairingError, PairingTable};
pub use record::{CalibrationRecord, RecordError};
pub use registry::AnchorRegistry;
pub use transform::{AffineTransform, RigidTransform, Transform};
