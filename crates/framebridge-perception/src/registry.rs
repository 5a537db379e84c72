//! [`AnchorRegistry`] – reference-frame anchor positions announced by the peer.
//!
//! Entries are upserted as anchor-creation messages arrive and live for the
//! rest of the session; there is no removal path.

use std::collections::BTreeMap;

use framebridge_types::{AnchorId, AnchorRecord, Point3, ReferenceFrame};

/// Anchor positions keyed by [`AnchorId`].  Last writer wins.
#[derive(Debug, Default, Clone)]
pub struct AnchorRegistry {
    anchors: BTreeMap<AnchorId, Point3<ReferenceFrame>>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the position of `anchor_id`.
    ///
    /// Returns the previous position when the anchor was already known.
    pub fn register_anchor(
        &mut self,
        anchor_id: AnchorId,
        position: Point3<ReferenceFrame>,
    ) -> Option<Point3<ReferenceFrame>> {
        self.anchors.insert(anchor_id, position)
    }

    pub fn lookup(&self, anchor_id: AnchorId) -> Option<Point3<ReferenceFrame>> {
        self.anchors.get(&anchor_id).copied()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// All anchors in ascending ID order.
    pub fn records(&self) -> impl Iterator<Item = AnchorRecord> + '_ {
        self.anchors.iter().map(|(&anchor_id, &position)| AnchorRecord {
            anchor_id,
            position,
        })
    }
}
