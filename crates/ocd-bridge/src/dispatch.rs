//! Frame dispatch policy
//!
//! Decides per inbound frame whether to echo synchronously or to schedule an
//! asynchronous push. The reserved trigger token switches dispatch to the
//! deferred path: the reply is produced later by the work-queue consumer via
//! the async send primitive, never from the request-handling context.

use axum::extract::ws::Message;
use ocd_core::{BridgeResult, ConnId, Frame, FrameKind};
use tracing::{debug, info, warn};

use crate::codec::FrameCodec;
use crate::work::{DeferredWorkQueue, WorkItem};

/// Exact-match text payload that requests an asynchronous push.
pub const TRIGGER_TOKEN: &str = "Trigger async";

/// Canned payload delivered by the deferred reply.
pub const ASYNC_REPLY: &str = "Async data";

/// What the dispatcher decided for one frame.
#[derive(Debug)]
pub enum Outcome {
    /// Reply synchronously with this frame, verbatim.
    Echo(Frame),
    /// A deferred reply was enqueued; nothing is sent on this context.
    AsyncScheduled,
    /// Peer ended the session.
    Closed,
}

/// Per-connection frame dispatcher.
pub struct MessageDispatcher {
    queue: DeferredWorkQueue,
}

impl MessageDispatcher {
    pub fn new(queue: DeferredWorkQueue) -> Self {
        Self { queue }
    }

    /// Interpret one raw frame from the transport.
    ///
    /// The payload buffer is owned for the duration of the call and released
    /// on every branch; the async-trigger branch discards it before
    /// enqueueing, since the deferred reply needs no payload.
    pub fn handle(&self, conn: ConnId, raw: Message) -> BridgeResult<Outcome> {
        let declared = FrameCodec::probe(&raw);
        debug!(%conn, len = declared, "frame length probe");

        let frame = FrameCodec::decode(raw)?;
        if frame.kind() == FrameKind::Close {
            return Ok(Outcome::Closed);
        }

        if let Some(text) = frame.payload_str() {
            info!(%conn, "got packet with message: {}", text);
            if text == TRIGGER_TOKEN {
                drop(frame);
                self.schedule_async_reply(conn)?;
                return Ok(Outcome::AsyncScheduled);
            }
        } else {
            debug!(%conn, kind = ?frame.kind(), len = frame.len(), "got packet");
        }

        Ok(Outcome::Echo(frame))
    }

    /// Enqueue the deferred reply for this connection.
    ///
    /// The work item captures only the connection identity; the send happens
    /// on the queue consumer's context and a connection that closed in the
    /// meantime fails the send harmlessly.
    fn schedule_async_reply(&self, conn: ConnId) -> BridgeResult<()> {
        let item = WorkItem::new(conn, move |ctx| async move {
            if let Err(e) = ctx.send_async(conn, Frame::text(ASYNC_REPLY)).await {
                warn!(%conn, error = %e, "deferred reply failed");
            }
        });
        self.queue.enqueue(item)?;
        debug!(%conn, "async reply scheduled");
        Ok(())
    }
}
