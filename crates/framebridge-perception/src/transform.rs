//! Detector-to-reference frame transforms.
//!
//! Two models are supported:
//!
//! - [`RigidTransform`] – rotation, translation and a uniform scale:
//!   `q = s · R · p + t`.  `R` is always a proper rotation (det = +1).
//! - [`AffineTransform`] – an unconstrained 3×4 matrix `T` applied to the
//!   homogeneous point: `q = T · [p; 1]`.
//!
//! [`Transform`] wraps either model and is the only way to move a
//! [`Point3<DetectorFrame>`] into the reference frame.
//!
//! # Example
//!
//! ```rust
//! use framebridge_perception::transform::{RigidTransform, Transform};
//! use framebridge_types::{DetectorFrame, Point3};
//! use nalgebra::{Matrix3, Vector3};
//!
//! let shift = RigidTransform::new(Matrix3::identity(), Vector3::new(-10.0, -5.0, 0.0), 1.0);
//! let q = Transform::Rigid(shift).apply(&Point3::<DetectorFrame>::new(10.0, 5.0, 0.0));
//! assert!(q.x.abs() < 1e-12 && q.y.abs() < 1e-12);
//! ```

use framebridge_types::{DetectorFrame, Frame, Point3, ReferenceFrame};
use nalgebra::{Matrix3, Matrix3x4, Vector3, Vector4};

/// Maximum deviation of `det(R)` from +1 (and of `RᵀR` from `I`) accepted by
/// [`RigidTransform::is_proper`].
pub const ROTATION_TOLERANCE: f64 = 1e-6;

// ────────────────────────────────────────────────────────────────────────────
// Conversions
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn to_vector<F: Frame>(p: &Point3<F>) -> Vector3<f64> {
    Vector3::new(p.x, p.y, p.z)
}

pub(crate) fn to_point<F: Frame>(v: &Vector3<f64>) -> Point3<F> {
    Point3::new(v.x, v.y, v.z)
}

// ────────────────────────────────────────────────────────────────────────────
// RigidTransform
// ────────────────────────────────────────────────────────────────────────────

/// Similarity transform `q = s · R · p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub scale: f64,
}

impl RigidTransform {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>, scale: f64) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    /// No rotation, no translation, unit scale.
    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros(), 1.0)
    }

    pub fn apply(&self, p: &Point3<DetectorFrame>) -> Point3<ReferenceFrame> {
        let q = self.rotation * to_vector(p) * self.scale + self.translation;
        to_point(&q)
    }

    /// `true` when the rotation is orthonormal with determinant +1.
    pub fn is_proper(&self) -> bool {
        let orthonormal = (self.rotation.transpose() * self.rotation - Matrix3::identity()).norm()
            <= ROTATION_TOLERANCE;
        orthonormal && (self.rotation.determinant() - 1.0).abs() <= ROTATION_TOLERANCE
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AffineTransform
// ────────────────────────────────────────────────────────────────────────────

/// General affine map `q = T · [p; 1]` with a 3×4 matrix `T`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub matrix: Matrix3x4<f64>,
}

impl AffineTransform {
    pub fn new(matrix: Matrix3x4<f64>) -> Self {
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3x4::identity())
    }

    pub fn apply(&self, p: &Point3<DetectorFrame>) -> Point3<ReferenceFrame> {
        let q = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        to_point(&q)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform
// ────────────────────────────────────────────────────────────────────────────

/// A fitted detector → reference transform of either model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Rigid(RigidTransform),
    Affine(AffineTransform),
}

impl Transform {
    /// Express a detector-frame point in the reference frame.
    pub fn apply(&self, p: &Point3<DetectorFrame>) -> Point3<ReferenceFrame> {
        match self {
            Transform::Rigid(t) => t.apply(p),
            Transform::Affine(t) => t.apply(p),
        }
    }

    /// Short model name for log output.
    pub fn model(&self) -> &'static str {
        match self {
            Transform::Rigid(_) => "rigid",
            Transform::Affine(_) => "affine",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
