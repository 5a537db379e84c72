//! Wire codec for the peer connection.
//!
//! # Inbound
//!
//! The peer writes JSON objects onto the stream, sometimes newline-delimited
//! and sometimes pretty-printed across several lines.  [`FrameBuffer`]
//! accumulates raw bytes and cuts complete JSON values out of them with a
//! streaming parser, so neither style depends on how the bytes were split
//! into TCP segments.
//!
//! The message kind is named by the `type` field, or by `resp` when `type` is
//! absent:
//!
//! | kind | payload | decoded as |
//! |---|---|---|
//! | `anchor_created` | `id`, `x`, `y`, `z` | [`Inbound::AnchorCreated`] |
//! | `recalibrate` | – | [`Inbound::Recalibrate`] |
//! | anything else | – | [`Inbound::Ignored`] |
//!
//! # Outbound
//!
//! Every message is wrapped as `{"message": <payload>}` and terminated with a
//! single `\n`.

use framebridge_types::{AnchorId, DetectorId, Point3, ReferenceFrame};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default cap on a single inbound frame (and on an unfinished tail).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

pub const KIND_ANCHOR_CREATED: &str = "anchor_created";
pub const KIND_RECALIBRATE: &str = "recalibrate";

// ────────────────────────────────────────────────────────────────────────────
// Inbound
// ────────────────────────────────────────────────────────────────────────────

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The peer placed (or moved) an anchor.
    AnchorCreated {
        anchor_id: AnchorId,
        position: Point3<ReferenceFrame>,
    },
    /// Operator request to discard the frozen transform and fit again.
    Recalibrate,
    /// A well-formed message of a kind this client does not handle.
    Ignored { kind: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no `type` or `resp` field")]
    MissingKind,

    #[error("malformed `{kind}` message: {reason}")]
    Malformed { kind: String, reason: String },

    #[error("frame of {size} bytes exceeds the {limit}-byte limit")]
    Oversized { size: usize, limit: usize },
}

#[derive(Deserialize)]
struct AnchorCreatedPayload {
    id: u32,
    x: f64,
    y: f64,
    z: f64,
}

/// Decode one JSON value into an [`Inbound`] message.
pub fn decode_value(value: Value) -> Result<Inbound, DecodeError> {
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let kind = object
        .get("type")
        .or_else(|| object.get("resp"))
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingKind)?
        .to_string();

    match kind.as_str() {
        KIND_ANCHOR_CREATED => {
            let payload: AnchorCreatedPayload =
                serde_json::from_value(value).map_err(|e| DecodeError::Malformed {
                    kind: kind.clone(),
                    reason: e.to_string(),
                })?;
            let position = Point3::new(payload.x, payload.y, payload.z);
            if !position.is_finite() {
                return Err(DecodeError::Malformed {
                    kind,
                    reason: "non-finite coordinate".to_string(),
                });
            }
            Ok(Inbound::AnchorCreated {
                anchor_id: AnchorId(payload.id),
                position,
            })
        }
        KIND_RECALIBRATE => Ok(Inbound::Recalibrate),
        _ => Ok(Inbound::Ignored { kind }),
    }
}

/// Decode a single complete message from text.
pub fn decode_str(raw: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))?;
    decode_value(value)
}

// ────────────────────────────────────────────────────────────────────────────
// Framing
// ────────────────────────────────────────────────────────────────────────────

/// Reassembles inbound JSON values from arbitrarily split stream reads.
#[derive(Debug)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    max_frame_bytes: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl FrameBuffer {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_frame_bytes,
        }
    }

    /// Append freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes held back waiting for the rest of a value.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Decode every complete value currently buffered.
    ///
    /// An unfinished value stays buffered unless it already exceeds the frame
    /// limit.  After a syntax error the buffer is skipped up to the next line
    /// that opens with `{`, so a pretty-printed message spanning several lines
    /// is reported once.
    pub fn drain(&mut self) -> Vec<Result<Inbound, DecodeError>> {
        let mut out = Vec::new();
        loop {
            let (next, consumed) = {
                let mut values =
                    serde_json::Deserializer::from_slice(&self.pending).into_iter::<Value>();
                let next = values.next();
                (next, values.byte_offset())
            };

            match next {
                None => {
                    // Only whitespace left.
                    self.pending.clear();
                    break;
                }
                Some(Ok(value)) => {
                    self.pending.drain(..consumed);
                    if consumed > self.max_frame_bytes {
                        out.push(Err(DecodeError::Oversized {
                            size: consumed,
                            limit: self.max_frame_bytes,
                        }));
                    } else {
                        out.push(decode_value(value));
                    }
                }
                Some(Err(e)) if e.is_eof() => {
                    if self.pending.len() > self.max_frame_bytes {
                        out.push(Err(DecodeError::Oversized {
                            size: self.pending.len(),
                            limit: self.max_frame_bytes,
                        }));
                        self.pending.clear();
                    }
                    break;
                }
                Some(Err(e)) => {
                    let skip = self
                        .pending
                        .windows(2)
                        .position(|w| w == b"\n{")
                        .map_or(self.pending.len(), |i| i + 1);
                    self.pending.drain(..skip);
                    out.push(Err(DecodeError::Json(e.to_string())));
                }
            }
        }
        out
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outbound
// ────────────────────────────────────────────────────────────────────────────

/// Payloads sent to the peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// A detection re-expressed in the reference frame.
    Pose { id: DetectorId, x: f64, y: f64, z: f64 },
}

impl Outbound {
    pub fn pose(id: DetectorId, position: &Point3<ReferenceFrame>) -> Self {
        Outbound::Pose {
            id,
            x: position.x,
            y: position.y,
            z: position.z,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    message: &'a Outbound,
}

/// Serialise `message` as one newline-terminated line.
pub fn encode(message: &Outbound) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(&Envelope { message })?;
    line.push('\n');
    Ok(line)
}
