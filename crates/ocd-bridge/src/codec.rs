//! Frame codec for the `/ws` channel
//!
//! Translates between transport messages and [`Frame`]s. Decoding is
//! two-phase: [`FrameCodec::probe`] reports the declared payload length
//! without allocating, [`FrameCodec::decode`] then copies the payload into a
//! buffer of `length + 1` bytes (terminator slot for text payloads). A
//! zero-length frame decodes to an empty payload without a second transport
//! read.

use axum::extract::ws::{Message, Utf8Bytes};
use bytes::Bytes;
use ocd_core::{BridgeError, BridgeResult, Frame, FrameKind};

pub struct FrameCodec;

impl FrameCodec {
    /// Declared payload length of a raw transport message.
    pub fn probe(raw: &Message) -> usize {
        match raw {
            Message::Text(text) => text.len(),
            Message::Binary(bytes) => bytes.len(),
            Message::Close(_) | Message::Ping(_) | Message::Pong(_) => 0,
        }
    }

    /// Decode a raw transport message into a [`Frame`].
    ///
    /// Ping/pong are transport-level and must be filtered out by the
    /// connection loop before reaching the codec.
    pub fn decode(raw: Message) -> BridgeResult<Frame> {
        match raw {
            Message::Text(text) => Ok(Frame::from_payload(FrameKind::Text, text.as_bytes())),
            Message::Binary(bytes) => Ok(Frame::from_payload(FrameKind::Binary, &bytes)),
            Message::Close(_) => Ok(Frame::empty(FrameKind::Close)),
            Message::Ping(_) | Message::Pong(_) => Err(BridgeError::Transport(
                "control frame reached the codec".to_string(),
            )),
        }
    }

    /// Serialize a [`Frame`] back onto the transport, preserving the type
    /// discriminator and the payload byte-for-byte.
    pub fn encode(frame: &Frame) -> BridgeResult<Message> {
        match frame.kind() {
            FrameKind::Text => {
                let text = frame.payload_str().ok_or_else(|| {
                    BridgeError::Transport("text frame payload is not valid UTF-8".to_string())
                })?;
                Ok(Message::Text(Utf8Bytes::from(text.to_owned())))
            }
            FrameKind::Binary => Ok(Message::Binary(Bytes::copy_from_slice(frame.payload()))),
            FrameKind::Close => Ok(Message::Close(None)),
        }
    }
}
