//! Single-worker message loop
//!
//! A looper owns one worker thread and one FIFO message queue. Any number of
//! threads post messages; exactly one worker dequeues them in order and hands
//! each to the pluggable [`Handler`]. Because the worker is the sole call
//! site of `handle`, handler state needs no locking of its own; the queue is
//! what serializes access.
//!
//! The queue is a guarded sequence: one `Mutex<VecDeque>` paired with a
//! `Condvar` for readiness, so exclusion and signaling cannot drift out of
//! sync. Messages move by value from producer to queue to worker; the worker
//! owns each message until it is dropped after handling.
//!
//! Shutdown is cooperative: [`Looper::quit`] enqueues a quit marker behind
//! any pending work (pending messages drain first) and blocks until the
//! worker joins.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};

/// Callback surface invoked once per dequeued message, always on the worker
/// thread. The handle parameter lets a handler post continuation work to its
/// own queue, which is how the decode pump keeps itself alive.
pub trait Handler: Send + 'static {
    type Message: Send + 'static;

    fn handle(&mut self, looper: &LooperHandle<Self::Message>, msg: Self::Message);
}

/// Queue entry: either work for the handler or the shutdown marker
enum Envelope<M> {
    Work(M),
    Quit,
}

/// State shared between producers and the worker
struct SharedQueue<M> {
    queue: Mutex<VecDeque<Envelope<M>>>,
    available: Condvar,
    running: AtomicBool,
}

/// Cloneable posting handle to a looper's queue
///
/// Valid for the lifetime of the looper; posts are rejected once quit has
/// started.
pub struct LooperHandle<M> {
    shared: Arc<SharedQueue<M>>,
}

impl<M> Clone for LooperHandle<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M> LooperHandle<M> {
    /// Append a message at the tail of the queue
    ///
    /// Never blocks on the worker's progress (unbounded queue). Posts from a
    /// single thread are processed in posting order.
    pub fn post(&self, msg: M) -> Result<()> {
        self.add(msg, false)
    }

    /// Discard every pending work message, then enqueue this one as the sole
    /// pending entry
    ///
    /// A quit marker already in the queue survives the flush.
    pub fn post_flush(&self, msg: M) -> Result<()> {
        self.add(msg, true)
    }

    /// Number of messages waiting to be dequeued (for diagnostics)
    pub fn pending_messages(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    fn add(&self, msg: M, flush: bool) -> Result<()> {
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(Error::LooperStopped);
        }

        {
            let mut queue = self.shared.queue.lock().unwrap();
            if flush {
                let before = queue.len();
                queue.retain(|e| matches!(e, Envelope::Quit));
                let discarded = before - queue.len();
                if discarded > 0 {
                    debug!("flush-enqueue discarded {} pending messages", discarded);
                }
            }
            queue.push_back(Envelope::Work(msg));
        }
        self.shared.available.notify_one();

        Ok(())
    }

    /// Handle backed by a queue with no worker; unit tests drive handlers
    /// synchronously and inspect what they posted.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            shared: Arc::new(SharedQueue {
                queue: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
                running: AtomicBool::new(true),
            }),
        }
    }

    /// Pop the next pending work message without a worker thread
    #[cfg(test)]
    pub(crate) fn pop_pending(&self) -> Option<M> {
        match self.shared.queue.lock().unwrap().pop_front() {
            Some(Envelope::Work(msg)) => Some(msg),
            _ => None,
        }
    }
}

/// Owner of the worker thread and its message queue
pub struct Looper<M> {
    handle: LooperHandle<M>,
    worker: Option<JoinHandle<()>>,
    name: String,
}

impl<M: Send + 'static> Looper<M> {
    /// Start a looper: spawns the worker thread, which dispatches every
    /// dequeued message to `handler` until quit
    pub fn spawn<H>(name: &str, handler: H) -> Self
    where
        H: Handler<Message = M>,
    {
        let shared = Arc::new(SharedQueue {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            running: AtomicBool::new(true),
        });
        let handle = LooperHandle {
            shared: Arc::clone(&shared),
        };

        let worker_handle = handle.clone();
        let worker_name = name.to_string();
        let worker = thread::spawn(move || {
            worker_loop(worker_handle, handler, &worker_name);
        });

        info!("looper '{}' started", name);

        Self {
            handle,
            worker: Some(worker),
            name: name.to_string(),
        }
    }
}

impl<M> Looper<M> {
    /// Cloneable posting handle usable from any thread
    pub fn handle(&self) -> LooperHandle<M> {
        self.handle.clone()
    }

    /// See [`LooperHandle::post`]
    pub fn post(&self, msg: M) -> Result<()> {
        self.handle.post(msg)
    }

    /// See [`LooperHandle::post_flush`]
    pub fn post_flush(&self, msg: M) -> Result<()> {
        self.handle.post_flush(msg)
    }

    pub fn is_running(&self) -> bool {
        self.handle.shared.running.load(Ordering::Acquire)
    }

    /// Blocking shutdown
    ///
    /// Enqueues the quit marker behind any pending work (ordinary FIFO, not
    /// a flush) and waits for the worker thread to drain up to it and exit.
    /// Later posts are rejected. Calling quit twice is a logged no-op.
    pub fn quit(&mut self) {
        if self.handle.shared.running.swap(false, Ordering::AcqRel) {
            debug!("looper '{}' quitting", self.name);
            {
                let mut queue = self.handle.shared.queue.lock().unwrap();
                queue.push_back(Envelope::Quit);
            }
            self.handle.shared.available.notify_one();
        } else {
            debug!("looper '{}' quit called again, ignoring", self.name);
        }

        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(()) => debug!("looper '{}' worker joined", self.name),
                Err(e) => error!("looper '{}' worker panicked: {:?}", self.name, e),
            }
        }
    }
}

impl<M> Drop for Looper<M> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            warn!(
                "looper '{}' dropped while still running, quitting implicitly",
                self.name
            );
            self.quit();
        }
    }
}

/// Worker thread body: the sole place handler code runs
fn worker_loop<M, H>(handle: LooperHandle<M>, mut handler: H, name: &str)
where
    M: Send + 'static,
    H: Handler<Message = M>,
{
    loop {
        let envelope = {
            let mut queue = handle.shared.queue.lock().unwrap();
            loop {
                match queue.pop_front() {
                    Some(envelope) => break envelope,
                    None => {
                        // Spurious wake or a drained queue: go back to
                        // waiting rather than treating it as an error.
                        trace!("looper '{}' queue empty, waiting", name);
                        queue = handle.shared.available.wait(queue).unwrap();
                    }
                }
            }
        };

        match envelope {
            Envelope::Quit => {
                debug!("looper '{}' worker received quit", name);
                return;
            }
            Envelope::Work(msg) => handler.handle(&handle, msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_spares_the_quit_marker() {
        let handle: LooperHandle<u32> = LooperHandle::detached();
        handle.post(1).unwrap();
        handle
            .shared
            .queue
            .lock()
            .unwrap()
            .push_back(Envelope::Quit);
        handle.post(2).unwrap();

        handle.post_flush(9).unwrap();

        let mut queue = handle.shared.queue.lock().unwrap();
        assert_eq!(queue.len(), 2);
        assert!(matches!(queue.pop_front(), Some(Envelope::Quit)));
        assert!(matches!(queue.pop_front(), Some(Envelope::Work(9))));
    }

    #[test]
    fn post_rejected_after_running_cleared() {
        let handle: LooperHandle<u32> = LooperHandle::detached();
        handle.shared.running.store(false, Ordering::Release);
        assert!(matches!(handle.post(1), Err(Error::LooperStopped)));
        assert_eq!(handle.pending_messages(), 0);
    }

    #[test]
    fn detached_pop_returns_in_fifo_order() {
        let handle: LooperHandle<u32> = LooperHandle::detached();
        handle.post(1).unwrap();
        handle.post(2).unwrap();
        assert_eq!(handle.pop_pending(), Some(1));
        assert_eq!(handle.pop_pending(), Some(2));
        assert_eq!(handle.pop_pending(), None);
    }
}
