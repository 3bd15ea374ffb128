//! Frame model for the framed-message channel
//!
//! A frame is one discrete message unit on a persistent connection, typed and
//! length-delimited. Decoding is two-phase: the transport reports the declared
//! payload length first, then the payload is copied into a buffer of exactly
//! `length + 1` bytes. The extra byte keeps a terminator slot free for
//! text-typed payloads so token comparison never reads past the logical
//! length; it is never part of the payload itself.

use bytes::BytesMut;

/// Type discriminator carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// NUL-free string-like payload
    Text,
    /// Opaque bytes
    Binary,
    /// Peer requested the session end
    Close,
}

/// A single decoded message unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    payload: BytesMut,
}

impl Frame {
    /// Build a frame from a payload slice, reserving the terminator slot.
    pub fn from_payload(kind: FrameKind, payload: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(payload.len() + 1);
        buf.extend_from_slice(payload);
        Self { kind, payload: buf }
    }

    /// A zero-length frame. Valid on the wire; decodes without a payload read.
    pub fn empty(kind: FrameKind) -> Self {
        Self::from_payload(kind, &[])
    }

    /// Text frame from a string payload.
    pub fn text(payload: impl AsRef<str>) -> Self {
        Self::from_payload(FrameKind::Text, payload.as_ref().as_bytes())
    }

    /// Binary frame from raw bytes.
    pub fn binary(payload: impl AsRef<[u8]>) -> Self {
        Self::from_payload(FrameKind::Binary, payload.as_ref())
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Logical payload length (excludes the terminator slot).
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload viewed as a string. `None` for non-text frames or payloads
    /// that are not valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        if self.kind != FrameKind::Text {
            return None;
        }
        std::str::from_utf8(&self.payload).ok()
    }

    /// Capacity of the payload buffer as allocated by the decode phase.
    pub fn allocated(&self) -> usize {
        self.payload.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_allocates_length_plus_one() {
        for len in [0usize, 1, 13, 255, 4096] {
            let payload = vec![0xA5u8; len];
            let frame = Frame::from_payload(FrameKind::Binary, &payload);
            assert_eq!(frame.len(), len);
            assert!(frame.allocated() >= len + 1, "terminator slot missing");
            assert_eq!(frame.payload(), &payload[..]);
        }
    }

    #[test]
    fn zero_length_frame_is_valid() {
        let frame = Frame::empty(FrameKind::Text);
        assert!(frame.is_empty());
        assert_eq!(frame.len(), 0);
        assert_eq!(frame.payload_str(), Some(""));
    }

    #[test]
    fn payload_str_only_for_text() {
        let text = Frame::text("Trigger async");
        assert_eq!(text.payload_str(), Some("Trigger async"));

        let binary = Frame::binary(b"Trigger async");
        assert_eq!(binary.payload_str(), None);
    }

    #[test]
    fn payload_is_byte_exact() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        let frame = Frame::binary(&bytes);
        assert_eq!(frame.payload(), &bytes[..]);
        assert_eq!(frame.kind(), FrameKind::Binary);
    }
}
