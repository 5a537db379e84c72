//! [`CalibrationRecord`] – durable snapshot of a fitted transform.
//!
//! Written as pretty-printed JSON after a successful fit so the result can be
//! audited offline or loaded again at the next start.
//!
//! ```json
//! {
//!   "rotation": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
//!   "translation": [-10.0, -5.0, 0.0],
//!   "scale": 1.0,
//!   "rms_error": 0.0,
//!   "pair_count": 3,
//!   "calibrated_at": "2026-10-16T12:00:00Z"
//! }
//! ```

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use nalgebra::{Matrix3, Matrix3x4, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calibration::CalibrationResult;
use crate::transform::{AffineTransform, RigidTransform, Transform};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to access calibration record at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("calibration record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("calibration record rotation is not a proper rotation (det = {determinant})")]
    ImproperRotation { determinant: f64 },
}

/// Model-specific part of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedModel {
    Rigid {
        /// Row-major 3×3 rotation.
        rotation: [[f64; 3]; 3],
        translation: [f64; 3],
        scale: f64,
    },
    Affine {
        /// Row-major 3×4 matrix.
        matrix: [[f64; 4]; 3],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(flatten)]
    pub model: RecordedModel,
    pub rms_error: f64,
    pub pair_count: usize,
    pub calibrated_at: DateTime<Utc>,
}

impl CalibrationRecord {
    pub fn from_result(result: &CalibrationResult, calibrated_at: DateTime<Utc>) -> Self {
        let model = match &result.transform {
            Transform::Rigid(t) => RecordedModel::Rigid {
                rotation: std::array::from_fn(|r| std::array::from_fn(|c| t.rotation[(r, c)])),
                translation: [t.translation.x, t.translation.y, t.translation.z],
                scale: t.scale,
            },
            Transform::Affine(t) => RecordedModel::Affine {
                matrix: std::array::from_fn(|r| std::array::from_fn(|c| t.matrix[(r, c)])),
            },
        };
        Self {
            model,
            rms_error: result.rms_error,
            pair_count: result.pair_count,
            calibrated_at,
        }
    }

    /// Rebuild the transform, refusing a rigid record whose rotation is not
    /// proper.
    pub fn transform(&self) -> Result<Transform, RecordError> {
        match &self.model {
            RecordedModel::Rigid {
                rotation,
                translation,
                scale,
            } => {
                let t = RigidTransform::new(
                    Matrix3::from_fn(|r, c| rotation[r][c]),
                    Vector3::from(*translation),
                    *scale,
                );
                if !t.is_proper() {
                    return Err(RecordError::ImproperRotation {
                        determinant: t.rotation.determinant(),
                    });
                }
                Ok(Transform::Rigid(t))
            }
            RecordedModel::Affine { matrix } => Ok(Transform::Affine(AffineTransform::new(
                Matrix3x4::from_fn(|r, c| matrix[r][c]),
            ))),
        }
    }

    pub fn to_result(&self) -> Result<CalibrationResult, RecordError> {
        Ok(CalibrationResult {
            transform: self.transform()?,
            rms_error: self.rms_error,
            pair_count: self.pair_count,
        })
    }

    /// Write the record, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        let io_err = |source| RecordError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).map_err(io_err)
    }

    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let raw = fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}
