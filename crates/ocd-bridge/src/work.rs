//! Deferred work queue
//!
//! A bounded single-consumer queue owned by the connection server. A request
//! handler enqueues a work item here instead of pushing outbound data from
//! its own execution context; the server's consumer task runs items strictly
//! in submission order, one at a time. There is no cancellation: once
//! accepted an item eventually executes, and a queue that cannot accept an
//! item fails the enqueue up front, releasing the item's argument with it.

use std::future::Future;
use std::pin::Pin;

use ocd_core::{BridgeError, BridgeResult, ConnId, Frame};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::codec::FrameCodec;
use crate::conn::ConnectionRegistry;

type WorkFn =
    Box<dyn FnOnce(WorkContext) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + 'static>;

/// A deferred unit of execution: a function and its owned argument record.
///
/// Ownership transfers to the queue on enqueue and is released by the
/// executing function, or dropped with the rejected item if enqueue fails.
pub struct WorkItem {
    pub conn: ConnId,
    job: WorkFn,
}

impl WorkItem {
    pub fn new<F, Fut>(conn: ConnId, job: F) -> Self
    where
        F: FnOnce(WorkContext) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            conn,
            job: Box::new(move |ctx| Box::pin(job(ctx))),
        }
    }
}

/// Execution context handed to each work item.
///
/// Exposes the async send primitive, which is safe to invoke from the
/// consumer's own context (unlike the synchronous reply path of a request
/// handler).
#[derive(Clone)]
pub struct WorkContext {
    registry: ConnectionRegistry,
}

impl WorkContext {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Push a frame to a connection identified at enqueue time.
    ///
    /// Fails with [`BridgeError::ConnectionGone`] if the session closed in
    /// the meantime.
    pub async fn send_async(&self, conn: ConnId, frame: Frame) -> BridgeResult<()> {
        let message = FrameCodec::encode(&frame)?;
        self.registry.send(conn, message).await
    }
}

/// Producer half of the queue, cloned into request handlers.
#[derive(Clone, Debug)]
pub struct DeferredWorkQueue {
    tx: mpsc::Sender<WorkItem>,
}

impl DeferredWorkQueue {
    /// Create a queue of the given depth plus the consumer's receiving half.
    pub fn bounded(depth: usize) -> (Self, mpsc::Receiver<WorkItem>) {
        let (tx, rx) = mpsc::channel(depth);
        (Self { tx }, rx)
    }

    /// Hand a work item to the consumer.
    ///
    /// Returns [`BridgeError::QueueRejected`] when the queue is full or the
    /// server is no longer accepting work; the rejected item (and its
    /// argument record) is dropped before returning.
    pub fn enqueue(&self, item: WorkItem) -> BridgeResult<()> {
        self.tx.try_send(item).map_err(|_| BridgeError::QueueRejected)
    }
}

/// Spawn the single consumer loop on the server's own execution context.
///
/// Items run in FIFO order, one at a time. On shutdown the receiver closes
/// (new enqueues are rejected) and already-accepted items are drained before
/// the task exits.
pub(crate) fn spawn_consumer(
    mut rx: mpsc::Receiver<WorkItem>,
    ctx: WorkContext,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut closing = false;
        loop {
            tokio::select! {
                _ = shutdown.changed(), if !closing => {
                    closing = true;
                    rx.close();
                }
                item = rx.recv() => match item {
                    Some(item) => {
                        debug!(conn = %item.conn, "executing deferred work item");
                        (item.job)(ctx.clone()).await;
                    }
                    None => break,
                },
            }
        }
        debug!("deferred work consumer stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_context() -> WorkContext {
        WorkContext::new(ConnectionRegistry::new())
    }

    #[tokio::test]
    async fn items_execute_in_submission_order() {
        let (queue, rx) = DeferredWorkQueue::bounded(8);
        let (done_tx, mut done_rx) = mpsc::channel::<u32>(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        for i in 0..5u32 {
            let done = done_tx.clone();
            queue
                .enqueue(WorkItem::new(ConnId(u64::from(i)), move |_ctx| async move {
                    done.send(i).await.unwrap();
                }))
                .unwrap();
        }

        let consumer = spawn_consumer(rx, test_context(), shutdown_rx);
        for expected in 0..5u32 {
            assert_eq!(done_rx.recv().await, Some(expected));
        }

        drop(queue);
        consumer.await.unwrap();
    }

    #[tokio::test]
    async fn full_queue_rejects_without_executing() {
        let (queue, _rx) = DeferredWorkQueue::bounded(1);
        let executed = Arc::new(std::sync::atomic::AtomicBool::new(false));

        queue
            .enqueue(WorkItem::new(ConnId(0), |_ctx| async {}))
            .unwrap();

        let flag = executed.clone();
        let err = queue
            .enqueue(WorkItem::new(ConnId(1), move |_ctx| async move {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
            }))
            .unwrap_err();

        assert!(matches!(err, BridgeError::QueueRejected));
        assert!(!executed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn rejected_item_releases_its_argument() {
        struct Tracked(Arc<std::sync::atomic::AtomicBool>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let (queue, rx) = DeferredWorkQueue::bounded(1);
        drop(rx); // queue is stopped

        let released = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let arg = Tracked(released.clone());
        let err = queue
            .enqueue(WorkItem::new(ConnId(0), move |_ctx| async move {
                let _arg = arg;
            }))
            .unwrap_err();

        assert!(matches!(err, BridgeError::QueueRejected));
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_rejects_new_work_but_drains_accepted() {
        let (queue, rx) = DeferredWorkQueue::bounded(8);
        let (done_tx, mut done_rx) = mpsc::channel::<u32>(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let done = done_tx.clone();
        queue
            .enqueue(WorkItem::new(ConnId(0), move |_ctx| async move {
                done.send(1).await.unwrap();
            }))
            .unwrap();

        shutdown_tx.send(true).unwrap();
        let consumer = spawn_consumer(rx, test_context(), shutdown_rx);
        consumer.await.unwrap();

        // the item accepted before shutdown still ran
        assert_eq!(done_rx.recv().await, Some(1));
        // new work is rejected once the consumer is gone
        let err = queue
            .enqueue(WorkItem::new(ConnId(1), |_ctx| async {}))
            .unwrap_err();
        assert!(matches!(err, BridgeError::QueueRejected));
    }

    #[tokio::test]
    async fn send_async_to_closed_connection_is_recoverable() {
        let ctx = test_context();
        let err = ctx
            .send_async(ConnId(9), Frame::text("Async data"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionGone(ConnId(9))));
    }
}
