//! `framebridge-types` – shared vocabulary for the framebridge crates.
//!
//! Points are tagged with the coordinate frame they live in so that a
//! detector-frame point can never be sent to the peer by accident: the only
//! way to turn a [`Point3<DetectorFrame>`] into a [`Point3<ReferenceFrame>`]
//! is to apply a fitted transform from `framebridge-perception`.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Frames
// ────────────────────────────────────────────────────────────────────────────

/// Marker trait for a coordinate frame.
pub trait Frame: fmt::Debug + Clone + Copy + PartialEq + Default {
    /// Human-readable frame name, used in log output.
    const NAME: &'static str;
}

/// Coordinate system of the depth-camera marker detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectorFrame;

/// Coordinate system of the remote peer's anchor space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReferenceFrame;

impl Frame for DetectorFrame {
    const NAME: &'static str = "detector";
}

impl Frame for ReferenceFrame {
    const NAME: &'static str = "reference";
}

// ────────────────────────────────────────────────────────────────────────────
// Point3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D point with double-precision coordinates in frame `F`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3<F: Frame> {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    frame: PhantomData<F>,
}

impl<F: Frame> Point3<F> {
    /// Create a point in frame `F`.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            frame: PhantomData,
        }
    }

    /// The origin of frame `F`.
    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn from_array([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// `true` when no coordinate is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean distance to another point of the same frame.
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl<F: Frame> fmt::Display for Point3<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:.4}, {:.4}, {:.4})", F::NAME, self.x, self.y, self.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────────────────────────────────────

/// Identifier of an anchor announced by the remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(pub u32);

/// Identifier of a marker reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectorId(pub u32);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "detector#{}", self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

/// An anchor position announced by the peer, in the reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorRecord {
    pub anchor_id: AnchorId,
    pub position: Point3<ReferenceFrame>,
}

/// Declared physical identity between one anchor and one detector marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrespondencePair {
    pub anchor: AnchorId,
    pub detector: DetectorId,
}

impl CorrespondencePair {
    pub fn new(anchor: u32, detector: u32) -> Self {
        Self {
            anchor: AnchorId(anchor),
            detector: DetectorId(detector),
        }
    }
}

/// Point-in-time view of every marker the detector currently sees.
///
/// Ordered by detector ID so iteration is deterministic.
pub type DetectionSnapshot = BTreeMap<DetectorId, Point3<DetectorFrame>>;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Umbrella error surfaced to the binary; each layer converts its own error
/// type into one of these variants.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Connection Error: {0}")]
    Connection(String),

    #[error("Runtime Setup Error: {0}")]
    Setup(String),
}
