// ABOUTME: Bounded async byte buffer shared between a Session's dispatcher and its readers
// ABOUTME: Async counterpart of the condvar-guarded linked-list buffer in the original link package

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("buffer is full")]
    Full,
    #[error("buffer is closed")]
    Closed,
}

struct Inner {
    chunks: VecDeque<Bytes>,
    len: usize,
    max_len: usize,
    closed: bool,
}

/// A FIFO byte buffer with a byte-count ceiling, shared between a producer
/// (the session dispatcher, on `Data` delivery) and one or more consumers
/// (callers of [`Session::read`](crate::session::Session::read)).
///
/// Mirrors `concurrentBuffer` from the original Go implementation: `write`
/// is non-blocking and fails with [`BufferError::Full`] rather than waiting
/// for room, `read` suspends until bytes are available or the buffer
/// closes, and closing does not discard bytes already queued — draining
/// continues until the queue is empty, only then does `read` start
/// returning [`BufferError::Closed`].
pub struct ByteBuffer {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl ByteBuffer {
    pub fn new(max_len: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                chunks: VecDeque::new(),
                len: 0,
                max_len,
                closed: false,
            }),
            notify: Notify::new(),
        })
    }

    /// Append `data` to the buffer. Non-blocking: fails immediately if the
    /// write would push the buffer past its ceiling, or if the buffer has
    /// already been closed.
    pub async fn write(&self, data: Bytes) -> Result<(), BufferError> {
        if data.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(BufferError::Closed);
        }
        if inner.len + data.len() > inner.max_len {
            return Err(BufferError::Full);
        }
        inner.len += data.len();
        inner.chunks.push_back(data);
        drop(inner);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Read up to `max` bytes, suspending until some data is available.
    /// Returns [`BufferError::Closed`] only once the buffer is both closed
    /// and fully drained.
    pub async fn read(&self, max: usize) -> Result<Bytes, BufferError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().await;
                if inner.len > 0 {
                    return Ok(Self::take(&mut inner, max));
                }
                if inner.closed {
                    return Err(BufferError::Closed);
                }
            }
            notified.await;
        }
    }

    fn take(inner: &mut Inner, max: usize) -> Bytes {
        let front = inner.chunks.front().expect("len > 0 implies a chunk exists");
        if front.len() <= max {
            let chunk = inner.chunks.pop_front().unwrap();
            inner.len -= chunk.len();
            chunk
        } else {
            let chunk = inner.chunks.front_mut().unwrap();
            let taken = chunk.split_to(max);
            inner.len -= taken.len();
            taken
        }
    }

    /// Close the buffer. Idempotent. Wakes all pending readers; readers
    /// that still have queued bytes will drain them before observing
    /// `Closed`.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        inner.closed = true;
        drop(inner);
        self.notify.notify_waiters();
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len
    }
}
