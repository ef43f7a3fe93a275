// ABOUTME: Generic carrier-agnostic message link: spawns reader/writer tasks over any duplex byte stream
// ABOUTME: Async counterpart of CreateLink/readMessages/writeMessages in the original link package

use crate::frame;
use crate::message::Message;
use crate::shutdown::Shutdown;
use bytes::BytesMut;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

const READ_CHUNK: usize = 4 * 1024;

/// Bound on the reader/writer channels. One in flight is all the session
/// layer needs; a small cushion avoids needless backpressure stalls.
const CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("operation timed out")]
    Timeout,
    #[error("operation cancelled")]
    Cancelled,
    #[error("link is down")]
    Down,
}

/// A carrier-agnostic message transport: reads/writes framed [`Message`]s
/// over any `R: AsyncRead` / `W: AsyncWrite` pair.
///
/// On construction, spawns a reader task (pulls bytes, extracts frames,
/// decodes them, and feeds a channel) and a writer task (drains a channel,
/// frames and writes each message). `read`/`write` are async calls that
/// race the relevant channel operation against a caller-supplied
/// cancellation [`Shutdown`] and an optional timeout — the direct
/// translation of the original `readMessages`/`writeMessages` goroutines'
/// `select` over the message channel and the link's own shutdown channel.
// A link's read half is only ever called from one task at a time in normal
// use, but `Link` is handed out behind an `Arc` by the session layer, so the
// receiver needs interior mutability to be reachable through `&self`.
pub struct Link {
    message_in: Mutex<mpsc::Receiver<Message>>,
    message_out: mpsc::Sender<Message>,
    shutdown: Shutdown,
    reader_task: tokio::task::JoinHandle<()>,
    writer_task: tokio::task::JoinHandle<()>,
}

impl Link {
    /// Spawn reader/writer tasks over `reader`/`writer` and return the
    /// resulting `Link`. The link owns both tasks and stops them on
    /// `close()` or `Drop`.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let shutdown = Shutdown::new();
        let (in_tx, in_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let reader_task = tokio::spawn(read_messages(reader, in_tx, shutdown.clone()));
        let writer_task = tokio::spawn(write_messages(writer, out_rx, shutdown.clone()));

        Self {
            message_in: Mutex::new(in_rx),
            message_out: out_tx,
            shutdown,
            reader_task,
            writer_task,
        }
    }

    /// Receive the next message, or fail on timeout / cancellation / link
    /// shutdown — whichever comes first. `biased` ordering favors a message
    /// that is already available over a timeout/cancel that fires in the
    /// same poll, so a message and its cancellation racing at the same
    /// instant still gets delivered.
    pub async fn read(
        &self,
        cancel: &Shutdown,
        timeout: Option<Duration>,
    ) -> Result<Message, LinkError> {
        let mut rx = self.message_in.lock().await;
        tokio::select! {
            biased;
            msg = rx.recv() => msg.ok_or(LinkError::Down),
            _ = sleep_or_pending(timeout) => Err(LinkError::Timeout),
            _ = self.shutdown.notified() => Err(LinkError::Down),
            _ = cancel.notified() => Err(LinkError::Cancelled),
        }
    }

    /// Hand `msg` to the writer task, or fail on timeout / cancellation /
    /// link shutdown.
    pub async fn write(
        &self,
        cancel: &Shutdown,
        timeout: Option<Duration>,
        msg: Message,
    ) -> Result<(), LinkError> {
        tokio::select! {
            biased;
            res = self.message_out.send(msg) => res.map_err(|_| LinkError::Down),
            _ = sleep_or_pending(timeout) => Err(LinkError::Timeout),
            _ = self.shutdown.notified() => Err(LinkError::Down),
            _ = cancel.notified() => Err(LinkError::Cancelled),
        }
    }

    /// Tear the link down: stop the reader/writer tasks and wake any
    /// pending `read`/`write` calls. Idempotent.
    pub fn close(&self) {
        self.shutdown.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.shutdown.close();
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

async fn sleep_or_pending(timeout: Option<Duration>) {
    match timeout {
        Some(d) => sleep(d).await,
        None => std::future::pending().await,
    }
}

async fn read_messages<R>(mut reader: R, tx: mpsc::Sender<Message>, shutdown: Shutdown)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        while let Some(result) = frame::extract(&buf) {
            match result {
                Ok((msg, consumed)) => {
                    let _ = buf.split_to(consumed);
                    if tx.send(msg).await.is_err() {
                        shutdown.close();
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(?err, "dropping unparseable frame");
                    // Resynchronize past the delimiter that bounded the bad frame.
                    if let Some(pos) = buf.iter().position(|&b| b == frame::DELIMITER) {
                        let _ = buf.split_to(pos + 1);
                    }
                }
            }
        }

        let read = tokio::select! {
            biased;
            _ = shutdown.notified() => return,
            result = reader.read_buf(&mut buf) => result,
        };

        match read {
            Ok(0) => {
                shutdown.close();
                return;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(?err, "link read error");
                shutdown.close();
                return;
            }
        }
    }
}

async fn write_messages<W>(mut writer: W, mut rx: mpsc::Receiver<Message>, shutdown: Shutdown)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    loop {
        let msg = tokio::select! {
            biased;
            _ = shutdown.notified() => return,
            msg = rx.recv() => msg,
        };

        let Some(msg) = msg else {
            shutdown.close();
            return;
        };

        let framed = frame::encode(&msg);
        if let Err(err) = writer.write_all(&framed).await {
            tracing::warn!(?err, "link write error");
            shutdown.close();
            return;
        }
        if let Err(err) = writer.flush().await {
            tracing::warn!(?err, "link flush error");
            shutdown.close();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::duplex;

    #[tokio::test]
    async fn write_then_read_round_trips_a_message() {
        let (a, b) = duplex(4096);
        let (a_r, a_w) = tokio::io::split(a);
        let (b_r, b_w) = tokio::io::split(b);

        let link_a = Link::new(a_r, a_w);
        let link_b = Link::new(b_r, b_w);

        let cancel = Shutdown::new();
        let msg = Message::data(1, Bytes::from_static(b"hi"));
        link_a.write(&cancel, None, msg.clone()).await.unwrap();

        let got = link_b.read(&cancel, Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(got, msg);
    }

    #[tokio::test]
    async fn read_times_out_with_no_data() {
        let (a, _b) = duplex(4096);
        let (a_r, a_w) = tokio::io::split(a);
        let link = Link::new(a_r, a_w);
        let cancel = Shutdown::new();

        let err = link
            .read(&cancel, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Timeout));
    }

    #[tokio::test]
    async fn read_is_cancellable() {
        let (a, _b) = duplex(4096);
        let (a_r, a_w) = tokio::io::split(a);
        let link = Link::new(a_r, a_w);
        let cancel = Shutdown::new();
        cancel.close();

        let err = link.read(&cancel, None).await.unwrap_err();
        assert!(matches!(err, LinkError::Cancelled));
    }

    #[tokio::test]
    async fn closing_the_link_fails_pending_reads() {
        let (a, _b) = duplex(4096);
        let (a_r, a_w) = tokio::io::split(a);
        let link = Link::new(a_r, a_w);
        link.close();

        let cancel = Shutdown::new();
        let err = link.read(&cancel, None).await.unwrap_err();
        assert!(matches!(err, LinkError::Down));
    }

    #[tokio::test]
    async fn peer_closing_the_stream_brings_the_link_down() {
        let (a, b) = duplex(4096);
        let (a_r, a_w) = tokio::io::split(a);
        let link = Link::new(a_r, a_w);
        drop(b);

        let cancel = Shutdown::new();
        let result = link.read(&cancel, Some(Duration::from_millis(200))).await;
        assert!(matches!(result, Err(LinkError::Down)));
    }
}
