use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError},
    },
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use crate::{error::QueueError, image::Image};

/// How long a blocked `pop` or bounded `push` waits before re-checking cancellation.
const WAIT_SLICE: Duration = Duration::from_millis(5);

/// One source frame on its way to a worker.
#[derive(Debug)]
pub struct FrameItem {
    pub index: u64,
    pub raw: Image,
}

#[derive(Debug)]
pub enum Pop {
    Item(FrameItem),
    /// Producer finished and the queue is drained.
    Done,
    /// The run was cancelled; pending items are abandoned.
    Cancelled,
}

#[derive(Clone)]
enum QueueSender {
    Unbounded(Sender<FrameItem>),
    Bounded(SyncSender<FrameItem>),
}

/// Single-producer, multi-consumer hand-off between the frame reader and the workers.
///
/// Closing is done by dropping the sender: once drained, every blocked and
/// future `pop` observes `Pop::Done`, so no wakeup can be missed.
pub struct WorkQueue {
    sender: Mutex<Option<QueueSender>>,
    receiver: Mutex<Receiver<FrameItem>>,
    cancel: CancellationToken,
    pushed: AtomicU64,
    capacity: Option<usize>,
}

impl WorkQueue {
    /// `capacity` of `None` gives an unbounded queue; bounded queues hold at least one item.
    pub fn new(capacity: Option<usize>, cancel: CancellationToken) -> Self {
        let (sender, receiver, capacity) = match capacity {
            None => {
                let (tx, rx) = mpsc::channel();
                (QueueSender::Unbounded(tx), rx, None)
            }
            Some(capacity) => {
                let capacity = capacity.max(1);
                let (tx, rx) = mpsc::sync_channel(capacity);
                (QueueSender::Bounded(tx), rx, Some(capacity))
            }
        };

        Self {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
            cancel,
            pushed: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn unbounded(cancel: CancellationToken) -> Self {
        Self::new(None, cancel)
    }

    pub fn bounded(capacity: usize, cancel: CancellationToken) -> Self {
        Self::new(Some(capacity), cancel)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Appends an item. Never blocks when unbounded; when bounded, waits for
    /// room until a worker pops or the run is cancelled.
    pub fn push(&self, item: FrameItem) -> Result<(), QueueError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(QueueError::Closed)?;

        match sender {
            QueueSender::Unbounded(tx) => tx.send(item).map_err(|_| QueueError::Closed)?,
            QueueSender::Bounded(tx) => {
                let mut item = item;
                loop {
                    match tx.try_send(item) {
                        Ok(()) => break,
                        Err(TrySendError::Full(back)) => {
                            if self.cancel.is_cancelled() {
                                return Err(QueueError::Cancelled);
                            }
                            item = back;
                            std::thread::sleep(WAIT_SLICE);
                        }
                        Err(TrySendError::Disconnected(_)) => return Err(QueueError::Closed),
                    }
                }
            }
        }

        self.pushed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Blocks until an item is available, the producer is done and the queue
    /// drained, or the run is cancelled.
    pub fn pop(&self) -> Pop {
        // a panicking holder cannot corrupt the receiver, keep serving
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.cancel.is_cancelled() {
                return Pop::Cancelled;
            }
            match receiver.recv_timeout(WAIT_SLICE) {
                Ok(item) => return Pop::Item(item),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Pop::Done,
            }
        }
    }

    /// Closes the producer side. Safe to call any number of times.
    pub fn mark_producer_done(&self) {
        if self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            log::debug!(
                "work queue: producer done after {} items",
                self.pushed.load(Ordering::Relaxed)
            );
        }
    }

    pub fn is_producer_done(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Total items accepted by `push`.
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
