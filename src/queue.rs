//! Ordered frame queue between pacer and streamer
//!
//! Single producer, single consumer, strict FIFO. The queue is unbounded so
//! a slow encoder can never stall capture; memory is the trade. Completion
//! is signalled by dropping the last [`FrameProducer`], after which the
//! consumer drains whatever is queued and then observes end-of-stream.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::types::Frame;

/// Create a connected producer/consumer pair.
pub fn frame_queue() -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = unbounded();
    (FrameProducer { tx }, FrameConsumer { rx })
}

/// Insertion half. Cloned into the pacer thread; the session keeps one
/// clone alive so the stream only completes once shutdown decides so.
#[derive(Clone)]
pub struct FrameProducer {
    tx: Sender<Frame>,
}

impl FrameProducer {
    /// Enqueue one frame. Never blocks. Pushing after the consumer is gone
    /// is a no-op.
    pub fn push(&self, frame: Frame) {
        let _ = self.tx.send(frame);
    }
}

/// Removal half, owned by the streamer thread.
pub struct FrameConsumer {
    rx: Receiver<Frame>,
}

impl FrameConsumer {
    /// Block until the next frame arrives. Returns `None` once every
    /// producer is dropped and the queue is drained.
    pub fn recv(&self) -> Option<Frame> {
        self.rx.recv().ok()
    }

    /// Frames currently queued. Diagnostic only.
    pub fn backlog(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frame;
    use std::sync::Arc;

    fn frame(tag: u8) -> Frame {
        Frame {
            width: 1,
            height: 1,
            data: Arc::new(vec![tag; 4]),
        }
    }

    #[test]
    fn fifo_order_is_preserved() {
        let (tx, rx) = frame_queue();
        for tag in 0..10u8 {
            tx.push(frame(tag));
        }
        drop(tx);
        for tag in 0..10u8 {
            assert_eq!(rx.recv().expect("frame missing").data[0], tag);
        }
        assert!(rx.recv().is_none());
    }

    #[test]
    fn completion_drains_before_end_of_stream() {
        let (tx, rx) = frame_queue();
        tx.push(frame(1));
        tx.push(frame(2));
        drop(tx);
        assert!(rx.recv().is_some());
        assert!(rx.recv().is_some());
        assert!(rx.recv().is_none());
    }

    #[test]
    fn empty_completed_queue_reports_end_immediately() {
        let (tx, rx) = frame_queue();
        drop(tx);
        assert!(rx.recv().is_none());
    }

    #[test]
    fn push_after_consumer_gone_is_silent() {
        let (tx, rx) = frame_queue();
        drop(rx);
        tx.push(frame(1));
    }
}
