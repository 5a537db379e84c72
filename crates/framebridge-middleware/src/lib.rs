//! `framebridge-middleware` – the I/O edges of the bridge.
//!
//! Moves bytes between the bridge and the outside world without knowing
//! anything about calibration.
//!
//! # Modules
//!
//! - [`codec`] – streaming JSON framing for peer messages, the inbound
//!   [`Inbound`][codec::Inbound] decoder and the outbound pose envelope.
//! - [`session`] – [`SocketSession`][session::SocketSession]: the TCP
//!   connection to the peer behind the [`PeerChannel`][session::PeerChannel]
//!   trait.
//! - [`source`] – [`JsonFileSource`][source::JsonFileSource]: the detector's
//!   snapshot file behind the
//!   [`CorrespondenceSource`][source::CorrespondenceSource] trait.

pub mod codec;
pub mod session;
pub mod source;

pub use codec::{DEFAULT_MAX_FRAME_BYTES, DecodeError, FrameBuffer, Inbound, Outbound};
pub use session::{PeerChannel, Received, SessionError, SocketSession};
pub use source::{CorrespondenceSource, JsonFileSource, SourceError, parse_snapshot};
