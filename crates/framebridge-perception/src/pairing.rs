//! [`PairingTable`] – static anchor ↔ detector identity declarations.
//!
//! The table is fixed configuration.  Each cycle it is joined against the
//! current [`AnchorRegistry`] and [`DetectionSnapshot`] to find the pairs for
//! which both sides are present right now.

use std::collections::BTreeSet;

use framebridge_types::{
    AnchorId, CorrespondencePair, DetectionSnapshot, DetectorFrame, DetectorId, Point3,
    ReferenceFrame,
};
use thiserror::Error;

use crate::registry::AnchorRegistry;

/// Rejected pairing configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingError {
    #[error("{0} is paired more than once")]
    DuplicateAnchor(AnchorId),

    #[error("{0} is paired more than once")]
    DuplicateDetector(DetectorId),
}

/// One matched point: where the detector sees it and where the peer put it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub pair: CorrespondencePair,
    pub detector: Point3<DetectorFrame>,
    pub reference: Point3<ReferenceFrame>,
}

/// Declared anchor ↔ detector pairs, kept sorted by anchor ID.
#[derive(Debug, Default, Clone)]
pub struct PairingTable {
    pairs: Vec<CorrespondencePair>,
}

impl PairingTable {
    /// Build a table, rejecting an anchor or detector that appears in more
    /// than one pair.
    pub fn new(pairs: impl IntoIterator<Item = CorrespondencePair>) -> Result<Self, PairingError> {
        let mut anchors = BTreeSet::new();
        let mut detectors = BTreeSet::new();
        let mut table = Vec::new();
        for pair in pairs {
            if !anchors.insert(pair.anchor) {
                return Err(PairingError::DuplicateAnchor(pair.anchor));
            }
            if !detectors.insert(pair.detector) {
                return Err(PairingError::DuplicateDetector(pair.detector));
            }
            table.push(pair);
        }
        table.sort();
        Ok(Self { pairs: table })
    }

    pub fn pairs(&self) -> &[CorrespondencePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs whose anchor is registered and whose detector is in `snapshot`,
    /// in ascending anchor order.
    pub fn ready_pairs(
        &self,
        registry: &AnchorRegistry,
        snapshot: &DetectionSnapshot,
    ) -> Vec<CorrespondencePair> {
        self.correspondences(registry, snapshot)
            .into_iter()
            .map(|c| c.pair)
            .collect()
    }

    /// Ready pairs resolved to their current point positions.
    pub fn correspondences(
        &self,
        registry: &AnchorRegistry,
        snapshot: &DetectionSnapshot,
    ) -> Vec<Correspondence> {
        self.pairs
            .iter()
            .filter_map(|&pair| {
                let reference = registry.lookup(pair.anchor)?;
                let detector = *snapshot.get(&pair.detector)?;
                Some(Correspondence {
                    pair,
                    detector,
                    reference,
                })
            })
            .collect()
    }
}
