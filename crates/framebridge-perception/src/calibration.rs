//! Calibration Engine – least-squares fit of the detector → reference transform.
//!
//! # Models
//!
//! **Rigid (+ optional uniform scale)**, Kabsch/Umeyama:
//!
//! 1. Centre both point sets on their centroids `c_P`, `c_Q`.
//! 2. Cross-covariance `H = P₀ᵀ · Q₀`, factorised as `H = U · S · Vᵀ`.
//! 3. `R = V · Uᵀ`.  If `det(R) < 0` the column of `V` belonging to the
//!    smallest singular value is negated and `R` recomputed, so `R` is always a
//!    proper rotation.
//! 4. `s = (σ₁ + σ₂ + σ₃) / Σ‖p₀‖²` over the singular values of `S` (step 3
//!    leaves `S` as is), or `s = 1` when scale estimation is off or the points
//!    are coincident.
//! 5. `t = c_Q − s · R · c_P`.
//!
//! **Affine**: the 3×4 matrix minimising `Σ‖qᵢ − T·[pᵢ; 1]‖²`, solved through the
//! SVD pseudo-inverse.  Rank-deficient input (three points, collinear or
//! coincident points) yields the minimum-norm solution instead of an error.
//!
//! Fewer than [`MIN_PAIRS`] correspondences is not an error: the engine
//! reports [`CalibrationOutcome::NotReady`] and the caller tries again later.

use framebridge_types::{
    CorrespondencePair, DetectionSnapshot, DetectorFrame, Point3, ReferenceFrame,
};
use nalgebra::{DMatrix, Matrix3, Matrix3x4, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::pairing::{Correspondence, PairingTable};
use crate::registry::AnchorRegistry;
use crate::transform::{AffineTransform, RigidTransform, Transform, to_vector};

/// Minimum number of matched pairs required before a fit is attempted.
pub const MIN_PAIRS: usize = 3;

/// Below this total squared spread the detector points are treated as
/// coincident and the scale falls back to 1.
const SPREAD_EPSILON: f64 = 1e-12;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Which transform model to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Rotation + translation (+ uniform scale when enabled).
    #[default]
    Rigid,
    /// Unconstrained 3×4 affine matrix.
    Affine,
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("SVD did not produce {0}")]
    Decomposition(&'static str),

    #[error("least-squares solve failed: {0}")]
    LeastSquares(&'static str),

    #[error("correspondence {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// A fitted transform together with its fit quality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    pub transform: Transform,
    /// Root-mean-square residual over the fitting points, in reference units.
    pub rms_error: f64,
    pub pair_count: usize,
}

/// Result of one calibration attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// Not enough matched pairs yet; nothing was fitted.
    NotReady { ready_pairs: usize },
    Calibrated(CalibrationResult),
}

// ────────────────────────────────────────────────────────────────────────────
// CalibrationEngine
// ────────────────────────────────────────────────────────────────────────────

/// Stateless fitter configured with a [`FitMode`].
#[derive(Debug, Clone, Copy)]
pub struct CalibrationEngine {
    mode: FitMode,
    estimate_scale: bool,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(FitMode::Rigid, true)
    }
}

impl CalibrationEngine {
    /// `estimate_scale` only affects [`FitMode::Rigid`].
    pub fn new(mode: FitMode, estimate_scale: bool) -> Self {
        Self {
            mode,
            estimate_scale,
        }
    }

    pub fn mode(&self) -> FitMode {
        self.mode
    }

    /// Fit from whatever pairs are ready right now.
    pub fn calibrate(
        &self,
        registry: &AnchorRegistry,
        pairing: &PairingTable,
        snapshot: &DetectionSnapshot,
    ) -> Result<CalibrationOutcome, CalibrationError> {
        self.fit(&pairing.correspondences(registry, snapshot))
    }

    /// Fit from two index-aligned point sets.
    ///
    /// Sets of different length are reported as [`CalibrationOutcome::NotReady`].
    pub fn fit_point_sets(
        &self,
        detector: &[Point3<DetectorFrame>],
        reference: &[Point3<ReferenceFrame>],
    ) -> Result<CalibrationOutcome, CalibrationError> {
        if detector.len() != reference.len() {
            debug!(
                detector = detector.len(),
                reference = reference.len(),
                "point sets differ in size; calibration not attempted"
            );
            return Ok(CalibrationOutcome::NotReady {
                ready_pairs: detector.len().min(reference.len()),
            });
        }
        let matched: Vec<Correspondence> = detector
            .iter()
            .zip(reference)
            .enumerate()
            .map(|(i, (&d, &r))| Correspondence {
                pair: CorrespondencePair::new(i as u32, i as u32),
                detector: d,
                reference: r,
            })
            .collect();
        self.fit(&matched)
    }

    /// Fit the configured model to `correspondences`.
    pub fn fit(
        &self,
        correspondences: &[Correspondence],
    ) -> Result<CalibrationOutcome, CalibrationError> {
        if correspondences.len() < MIN_PAIRS {
            return Ok(CalibrationOutcome::NotReady {
                ready_pairs: correspondences.len(),
            });
        }
        if let Some(index) = correspondences
            .iter()
            .position(|c| !c.detector.is_finite() || !c.reference.is_finite())
        {
            return Err(CalibrationError::NonFinite { index });
        }

        let transform = match self.mode {
            FitMode::Rigid => Transform::Rigid(fit_rigid(correspondences, self.estimate_scale)?),
            FitMode::Affine => Transform::Affine(fit_affine(correspondences)?),
        };
        let rms_error = rms_error(&transform, correspondences);
        Ok(CalibrationOutcome::Calibrated(CalibrationResult {
            transform,
            rms_error,
            pair_count: correspondences.len(),
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fitting
// ────────────────────────────────────────────────────────────────────────────

/// Kabsch/Umeyama fit.  Callers must pass at least [`MIN_PAIRS`] finite points.
pub fn fit_rigid(
    correspondences: &[Correspondence],
    estimate_scale: bool,
) -> Result<RigidTransform, CalibrationError> {
    let n = correspondences.len() as f64;
    let (sum_p, sum_q) = correspondences.iter().fold(
        (Vector3::zeros(), Vector3::zeros()),
        |(sp, sq): (Vector3<f64>, Vector3<f64>), c| {
            (sp + to_vector(&c.detector), sq + to_vector(&c.reference))
        },
    );
    let centroid_p = sum_p / n;
    let centroid_q = sum_q / n;

    let mut h = Matrix3::<f64>::zeros();
    let mut spread = 0.0;
    for c in correspondences {
        let p0 = to_vector(&c.detector) - centroid_p;
        let q0 = to_vector(&c.reference) - centroid_q;
        h += p0 * q0.transpose();
        spread += p0.norm_squared();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(CalibrationError::Decomposition("U"))?;
    let v_t = svd.v_t.ok_or(CalibrationError::Decomposition("V^T"))?;
    let singular = svd.singular_values;

    let mut v = v_t.transpose();
    let mut rotation = v * u.transpose();
    if rotation.determinant() < 0.0 {
        let weakest = singular.imin();
        v.column_mut(weakest).neg_mut();
        rotation = v * u.transpose();
        debug!(column = weakest, "reflection corrected in rigid fit");
    }

    // The reflection fix only touches V, so S is summed as factorised.
    let scale = if !estimate_scale {
        1.0
    } else if spread > SPREAD_EPSILON {
        singular.sum() / spread
    } else {
        debug!(spread, "detector points coincide; scale falls back to 1");
        1.0
    };
    let translation = centroid_q - rotation * centroid_p * scale;

    Ok(RigidTransform::new(rotation, translation, scale))
}

/// Affine least-squares fit with minimum-norm fallback for rank-deficient
/// input.  Callers must pass at least [`MIN_PAIRS`] finite points.
pub fn fit_affine(correspondences: &[Correspondence]) -> Result<AffineTransform, CalibrationError> {
    let n = correspondences.len();
    // Each output coordinate is an independent 4-unknown problem; solving
    // against the three right-hand-side columns at once is equivalent.
    let design = DMatrix::from_fn(n, 4, |r, c| {
        let p = &correspondences[r].detector;
        match c {
            0 => p.x,
            1 => p.y,
            2 => p.z,
            _ => 1.0,
        }
    });
    let targets = DMatrix::from_fn(n, 3, |r, c| correspondences[r].reference.to_array()[c]);

    let svd = design.svd(true, true);
    let cutoff = svd.singular_values.max() * (n.max(4) as f64) * f64::EPSILON;
    let solution = svd
        .solve(&targets, cutoff)
        .map_err(CalibrationError::LeastSquares)?;

    // `solution` is 4×3 (one column per output coordinate); T is its transpose.
    Ok(AffineTransform::new(Matrix3x4::from_fn(|r, c| {
        solution[(c, r)]
    })))
}

/// `sqrt(mean ‖qᵢ − T(pᵢ)‖²)`; zero for an empty set.
pub fn rms_error(transform: &Transform, correspondences: &[Correspondence]) -> f64 {
    if correspondences.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = correspondences
        .iter()
        .map(|c| {
            let d = transform.apply(&c.detector).distance(&c.reference);
            d * d
        })
        .sum();
    (sum_sq / correspondences.len() as f64).sqrt()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use framebridge_types::{AnchorId, DetectorId};
    use nalgebra::Rotation3;

    const TOL: f64 = 1e-9;

    fn cloud() -> Vec<Point3<DetectorFrame>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.7, -0.4, 1.3),
        ]
    }

    fn matched(
        detector: &[Point3<DetectorFrame>],
        map: impl Fn(&Point3<DetectorFrame>) -> Point3<ReferenceFrame>,
    ) -> Vec<Correspondence> {
        detector
            .iter()
            .enumerate()
            .map(|(i, d)| Correspondence {
                pair: CorrespondencePair::new(i as u32, i as u32),
                detector: *d,
                reference: map(d),
            })
            .collect()
    }

    fn rigid(outcome: CalibrationOutcome) -> (RigidTransform, CalibrationResult) {
        match outcome {
            CalibrationOutcome::Calibrated(result) => match result.transform {
                Transform::Rigid(t) => (t, result),
                other => panic!("expected rigid transform, got {other:?}"),
            },
            other => panic!("expected calibration, got {other:?}"),
        }
    }

    fn same_coords(p: &Point3<DetectorFrame>) -> Point3<ReferenceFrame> {
        Point3::new(p.x, p.y, p.z)
    }

    // ── Rigid ───────────────────────────────────────────────────────────────

    #[test]
    fn identity_case() {
        let engine = CalibrationEngine::default();
        let (t, result) = rigid(engine.fit(&matched(&cloud(), same_coords)).unwrap());
        assert_relative_eq!(t.rotation, Matrix3::identity(), epsilon = TOL);
        assert_relative_eq!(t.scale, 1.0, epsilon = TOL);
        assert_relative_eq!(t.translation, Vector3::zeros(), epsilon = TOL);
        assert!(result.rms_error < TOL);
        assert_eq!(result.pair_count, 5);
    }

    #[test]
    fn pure_translation() {
        let d = Vector3::new(3.0, -1.5, 0.25);
        let engine = CalibrationEngine::default();
        let (t, result) = rigid(
            engine
                .fit(&matched(&cloud(), |p| Point3::new(p.x + d.x, p.y + d.y, p.z + d.z)))
                .unwrap(),
        );
        assert_relative_eq!(t.rotation, Matrix3::identity(), epsilon = TOL);
        assert_relative_eq!(t.scale, 1.0, epsilon = TOL);
        assert_relative_eq!(t.translation, d, epsilon = TOL);
        assert!(result.rms_error < TOL);
    }

    #[test]
    fn known_rotation_and_translation() {
        let r0 = *Rotation3::from_euler_angles(0.3, -0.2, 1.1).matrix();
        let t0 = Vector3::new(0.5, -2.0, 3.0);
        let map = |p: &Point3<DetectorFrame>| {
            let q = r0 * to_vector(p) + t0;
            Point3::new(q.x, q.y, q.z)
        };
        for estimate_scale in [true, false] {
            let engine = CalibrationEngine::new(FitMode::Rigid, estimate_scale);
            let (t, result) = rigid(engine.fit(&matched(&cloud(), map)).unwrap());
            assert_relative_eq!(t.rotation, r0, epsilon = TOL);
            assert_relative_eq!(t.translation, t0, epsilon = TOL);
            assert_relative_eq!(t.scale, 1.0, epsilon = TOL);
            assert!(result.rms_error < TOL);
        }
    }

    #[test]
    fn recovers_uniform_scale() {
        let r0 = *Rotation3::from_euler_angles(-0.8, 0.1, 0.4).matrix();
        let t0 = Vector3::new(-1.0, 0.0, 2.0);
        let map = |p: &Point3<DetectorFrame>| {
            let q = r0 * to_vector(p) * 2.5 + t0;
            Point3::new(q.x, q.y, q.z)
        };
        let engine = CalibrationEngine::new(FitMode::Rigid, true);
        let (t, result) = rigid(engine.fit(&matched(&cloud(), map)).unwrap());
        assert_relative_eq!(t.scale, 2.5, epsilon = TOL);
        assert_relative_eq!(t.rotation, r0, epsilon = TOL);
        assert_relative_eq!(t.translation, t0, epsilon = TOL);
        assert!(result.rms_error < TOL);
    }

    #[test]
    fn scale_disabled_keeps_unit_scale() {
        let engine = CalibrationEngine::new(FitMode::Rigid, false);
        let (t, result) = rigid(
            engine
                .fit(&matched(&cloud(), |p| Point3::new(2.0 * p.x, 2.0 * p.y, 2.0 * p.z)))
                .unwrap(),
        );
        assert_eq!(t.scale, 1.0);
        assert!(result.rms_error > 0.1, "a 2× map cannot be fitted without scale");
    }

    #[test]
    fn mirrored_input_still_yields_proper_rotation() {
        // Reference is the detector cloud mirrored through the YZ plane; the
        // unconstrained orthogonal fit would be a reflection.
        let engine = CalibrationEngine::default();
        let (t, result) = rigid(
            engine
                .fit(&matched(&cloud(), |p| Point3::new(-p.x, p.y, p.z)))
                .unwrap(),
        );
        assert_relative_eq!(t.rotation.determinant(), 1.0, epsilon = TOL);
        assert!(t.is_proper());
        assert!(result.rms_error > 0.0);
    }

    #[test]
    fn mirrored_input_keeps_singular_value_scale() {
        let detector = cloud();
        let pairs = matched(&detector, |p| Point3::new(-p.x, p.y, p.z));

        // Independent sum(S) / Σ‖p₀‖² straight from the centred clouds.
        let n = pairs.len() as f64;
        let cp = pairs.iter().map(|c| to_vector(&c.detector)).sum::<Vector3<f64>>() / n;
        let cq = pairs.iter().map(|c| to_vector(&c.reference)).sum::<Vector3<f64>>() / n;
        let (h, spread) = pairs.iter().fold((Matrix3::<f64>::zeros(), 0.0), |(h, s), c| {
            let p0 = to_vector(&c.detector) - cp;
            let q0 = to_vector(&c.reference) - cq;
            (h + p0 * q0.transpose(), s + p0.norm_squared())
        });
        let expected = h.svd(false, false).singular_values.sum() / spread;

        let (t, _) = rigid(CalibrationEngine::default().fit(&pairs).unwrap());
        assert_relative_eq!(t.scale, expected, epsilon = TOL);
        // A pure mirror preserves lengths, so the singular values add up to the spread.
        assert_relative_eq!(t.scale, 1.0, epsilon = TOL);
        assert_relative_eq!(t.rotation.determinant(), 1.0, epsilon = TOL);
        assert_relative_eq!(t.translation, cq - t.rotation * cp * t.scale, epsilon = TOL);
    }

    #[test]
    fn coplanar_mirror_yields_proper_rotation() {
        let planar = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let engine = CalibrationEngine::default();
        let (t, _) = rigid(
            engine
                .fit(&matched(&planar, |p| Point3::new(p.x, -p.y, 0.0)))
                .unwrap(),
        );
        assert_relative_eq!(t.rotation.determinant(), 1.0, epsilon = TOL);
    }

    #[test]
    fn rotation_is_proper_for_arbitrary_configurations() {
        // Deterministic LCG so the sweep is reproducible.
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        };
        let engine = CalibrationEngine::default();
        for _ in 0..200 {
            let detector: Vec<Point3<DetectorFrame>> =
                (0..4).map(|_| Point3::new(next(), next(), next())).collect();
            let reference: Vec<Point3<ReferenceFrame>> =
                (0..4).map(|_| Point3::new(next(), next(), next())).collect();
            let (t, _) = rigid(engine.fit_point_sets(&detector, &reference).unwrap());
            assert!(
                (t.rotation.determinant() - 1.0).abs() < 1e-9,
                "det = {}",
                t.rotation.determinant()
            );
        }
    }

    #[test]
    fn coincident_points_fall_back_to_unit_scale() {
        let same = vec![Point3::new(1.0, 1.0, 1.0); 3];
        let engine = CalibrationEngine::default();
        let (t, _) = rigid(
            engine
                .fit(&matched(&same, |_| Point3::new(4.0, 4.0, 4.0)))
                .unwrap(),
        );
        assert_eq!(t.scale, 1.0);
        let q = t.apply(&Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(q.x, 4.0, epsilon = TOL);
        assert_relative_eq!(q.y, 4.0, epsilon = TOL);
        assert_relative_eq!(q.z, 4.0, epsilon = TOL);
    }

    #[test]
    fn training_points_round_trip() {
        let r0 = *Rotation3::from_euler_angles(1.2, 0.4, -2.0).matrix();
        let t0 = Vector3::new(7.0, 8.0, -9.0);
        let map = |p: &Point3<DetectorFrame>| {
            let q = r0 * to_vector(p) * 0.5 + t0;
            Point3::new(q.x, q.y, q.z)
        };
        let pairs = matched(&cloud(), map);
        for mode in [FitMode::Rigid, FitMode::Affine] {
            let outcome = CalibrationEngine::new(mode, true).fit(&pairs).unwrap();
            let CalibrationOutcome::Calibrated(result) = outcome else {
                panic!("expected calibration for {mode:?}");
            };
            for c in &pairs {
                let q = result.transform.apply(&c.detector);
                assert!(q.distance(&c.reference) < 1e-8, "{mode:?}: {q} vs {}", c.reference);
            }
        }
    }

    // ── Preconditions ───────────────────────────────────────────────────────

    #[test]
    fn fewer_than_three_pairs_is_not_ready() {
        let engine = CalibrationEngine::default();
        let pairs = matched(&cloud()[..2], same_coords);
        for _ in 0..3 {
            assert_eq!(
                engine.fit(&pairs).unwrap(),
                CalibrationOutcome::NotReady { ready_pairs: 2 }
            );
        }
        assert_eq!(
            engine.fit(&[]).unwrap(),
            CalibrationOutcome::NotReady { ready_pairs: 0 }
        );
    }

    #[test]
    fn mismatched_point_sets_are_not_ready() {
        let engine = CalibrationEngine::default();
        let detector = cloud();
        let reference: Vec<Point3<ReferenceFrame>> =
            detector.iter().take(4).map(same_coords).collect();
        assert_eq!(
            engine.fit_point_sets(&detector, &reference).unwrap(),
            CalibrationOutcome::NotReady { ready_pairs: 4 }
        );
    }

    #[test]
    fn non_finite_input_is_an_error() {
        let mut pairs = matched(&cloud(), same_coords);
        pairs[2].detector = Point3::new(f64::NAN, 0.0, 0.0);
        let err = CalibrationEngine::default().fit(&pairs).unwrap_err();
        assert!(matches!(err, CalibrationError::NonFinite { index: 2 }));
    }

    #[test]
    fn calibrate_uses_ready_pairs_only() {
        let mut registry = AnchorRegistry::new();
        let mut snapshot = DetectionSnapshot::new();
        let pairing = PairingTable::new([
            CorrespondencePair::new(0, 0),
            CorrespondencePair::new(1, 1),
            CorrespondencePair::new(2, 2),
            CorrespondencePair::new(3, 3),
        ])
        .unwrap();
        registry.register_anchor(AnchorId(0), Point3::new(0.0, 0.0, 0.0));
        registry.register_anchor(AnchorId(1), Point3::new(1.0, 0.0, 0.0));
        snapshot.insert(DetectorId(0), Point3::new(10.0, 5.0, 0.0));
        snapshot.insert(DetectorId(1), Point3::new(11.0, 5.0, 0.0));
        snapshot.insert(DetectorId(2), Point3::new(10.0, 6.0, 0.0));

        let engine = CalibrationEngine::default();
        assert_eq!(
            engine.calibrate(&registry, &pairing, &snapshot).unwrap(),
            CalibrationOutcome::NotReady { ready_pairs: 2 }
        );

        registry.register_anchor(AnchorId(2), Point3::new(0.0, 1.0, 0.0));
        let (t, result) = rigid(engine.calibrate(&registry, &pairing, &snapshot).unwrap());
        assert_eq!(result.pair_count, 3);
        assert_relative_eq!(t.translation, Vector3::new(-10.0, -5.0, 0.0), epsilon = 1e-6);
        assert!(result.rms_error < 1e-6);
    }

    // ── Affine ──────────────────────────────────────────────────────────────

    #[test]
    fn affine_recovers_general_linear_map() {
        #[rustfmt::skip]
        let m = Matrix3x4::new(
            1.5, 0.2, -0.3, 4.0,
            0.0, 0.8,  0.6, -1.0,
            0.1, 0.0,  2.0, 0.5,
        );
        let map = |p: &Point3<DetectorFrame>| {
            let q = m * nalgebra::Vector4::new(p.x, p.y, p.z, 1.0);
            Point3::new(q.x, q.y, q.z)
        };
        let t = fit_affine(&matched(&cloud(), map)).unwrap();
        assert_relative_eq!(t.matrix, m, epsilon = 1e-9);
    }

    #[test]
    fn affine_three_points_returns_minimum_norm_solution() {
        let pts = vec![
            Point3::new(10.0, 5.0, 0.0),
            Point3::new(11.0, 5.0, 0.0),
            Point3::new(10.0, 6.0, 0.0),
        ];
        let pairs = matched(&pts, |p| Point3::new(p.x - 10.0, p.y - 5.0, p.z));
        let t = fit_affine(&pairs).unwrap();
        // Underdetermined, but every training point must still be reproduced.
        assert!(rms_error(&Transform::Affine(t), &pairs) < 1e-9);
        // Minimum-norm: nothing is spent on the z column that no data constrains.
        assert_relative_eq!(t.matrix[(0, 2)], 0.0, epsilon = 1e-9);
        assert_relative_eq!(t.matrix[(1, 2)], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn affine_collinear_points_do_not_fail() {
        let line = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
            Point3::new(3.0, 3.0, 3.0),
        ];
        let pairs = matched(&line, |p| Point3::new(p.x + 1.0, p.y, p.z));
        let outcome = CalibrationEngine::new(FitMode::Affine, false).fit(&pairs).unwrap();
        let CalibrationOutcome::Calibrated(result) = outcome else {
            panic!("collinear input must still calibrate");
        };
        assert!(result.rms_error < 1e-9);
    }

    #[test]
    fn rms_error_reports_residual() {
        let pairs = matched(&cloud()[..3], |p| Point3::new(p.x, p.y, p.z + 2.0));
        let rms = rms_error(&Transform::Rigid(RigidTransform::identity()), &pairs);
        assert_relative_eq!(rms, 2.0, epsilon = 1e-12);
        assert_eq!(rms_error(&Transform::Rigid(RigidTransform::identity()), &[]), 0.0);
    }
}
