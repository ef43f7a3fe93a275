// ABOUTME: Listener/dialer handshake and stop-and-wait ARQ session built on top of a Link
// ABOUTME: Async counterpart of the (stubbed) Link/Conn state machine in the original link package

use crate::buffer::{BufferError, ByteBuffer};
use crate::config::SessionConfig;
use crate::link::{Link, LinkError};
use crate::message::{Message, MessageKind};
use crate::shutdown::Shutdown;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("handshake failed")]
    HandshakeFailed,
    #[error("session is closed")]
    Closed,
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),
}

struct WriteState {
    seqnum: u64,
    ack_rx: mpsc::Receiver<u64>,
}

/// A reliable, ordered byte-stream session layered on a [`Link`].
///
/// Built by [`Session::listen`] or [`Session::dial`], which run the
/// CONNECT/ACK/ACKACK handshake; once established, a background dispatcher
/// task drains the link, feeding inbound `Data` to a bounded
/// [`ByteBuffer`] and acking it in order, while a watchdog and pinger keep
/// the session alive and detect a silently-dead peer.
pub struct Session {
    link: Arc<Link>,
    buffer: Arc<ByteBuffer>,
    write_state: Mutex<WriteState>,
    shutdown: Shutdown,
    config: SessionConfig,
    dispatcher_task: JoinHandle<()>,
    watchdog_task: JoinHandle<()>,
    pinger_task: JoinHandle<()>,
}

impl Session {
    /// Act as the listening side of the handshake: wait for `CONNECT`
    /// (discarding anything else, with no timeout — a listener waits
    /// indefinitely for a dialer), send a single `ACK`, then wait for an
    /// `ACKACK`. A timeout waiting for the `ACKACK` restarts from the top
    /// (the dialer's `ACK` may have been lost, or its `CONNECT` retried);
    /// any other link error aborts.
    pub async fn listen<R, W>(reader: R, writer: W, config: SessionConfig) -> Result<Self, SessionError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let link = Link::new(reader, writer);
        let cancel = Shutdown::new();

        loop {
            loop {
                let msg = link
                    .read(&cancel, None)
                    .await
                    .map_err(|_| SessionError::HandshakeFailed)?;
                if msg.kind == MessageKind::Connect {
                    break;
                }
            }

            link.write(&cancel, Some(config.handshake_timeout), Message::ack(0))
                .await
                .map_err(|_| SessionError::HandshakeFailed)?;

            match link.read(&cancel, Some(config.handshake_timeout)).await {
                Ok(msg) if msg.kind == MessageKind::AckAck => return Ok(Self::spawn(link, config)),
                Err(LinkError::Timeout) => {
                    tracing::debug!("listener timed out waiting for ackack, restarting handshake");
                    continue;
                }
                _ => return Err(SessionError::HandshakeFailed),
            }
        }
    }

    /// Act as the dialing side: send `CONNECT` up to `config.dial_attempts`
    /// times, waiting `config.handshake_timeout` for an `ACK` each attempt,
    /// then reply with two `ACKACK`s.
    pub async fn dial<R, W>(reader: R, writer: W, config: SessionConfig) -> Result<Self, SessionError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let link = Link::new(reader, writer);
        let cancel = Shutdown::new();

        for attempt in 0..config.dial_attempts {
            if link
                .write(&cancel, Some(config.handshake_timeout), Message::connect())
                .await
                .is_err()
            {
                continue;
            }

            match link.read(&cancel, Some(config.handshake_timeout)).await {
                Ok(msg) if msg.kind == MessageKind::Ack => {
                    for _ in 0..2 {
                        link.write(&cancel, Some(config.handshake_timeout), Message::ackack())
                            .await
                            .map_err(|_| SessionError::HandshakeFailed)?;
                    }
                    return Ok(Self::spawn(link, config));
                }
                _ => {
                    tracing::debug!(attempt, "dial attempt did not receive an ack in time");
                    continue;
                }
            }
        }

        link.close();
        Err(SessionError::HandshakeFailed)
    }

    fn spawn(link: Link, config: SessionConfig) -> Self {
        let link = Arc::new(link);
        let buffer = ByteBuffer::new(config.max_buffer);
        let shutdown = Shutdown::new();
        let last_seen = Arc::new(Mutex::new(Instant::now()));
        let (ack_tx, ack_rx) = mpsc::channel(1);

        let dispatcher_task = tokio::spawn(dispatch(
            link.clone(),
            buffer.clone(),
            ack_tx,
            last_seen.clone(),
            config.ack_delivery_timeout,
            shutdown.clone(),
        ));
        let watchdog_task = tokio::spawn(watchdog(last_seen, config.idle_timeout, shutdown.clone()));
        let pinger_task = tokio::spawn(pinger(link.clone(), config.ping_interval, shutdown.clone()));

        Self {
            link,
            buffer,
            write_state: Mutex::new(WriteState { seqnum: 0, ack_rx }),
            shutdown,
            config,
            dispatcher_task,
            watchdog_task,
            pinger_task,
        }
    }

    /// Send `data` as a single reliable `Data` message: stop-and-wait, with
    /// retransmission every `retransmit_interval` until the corresponding
    /// `Ack` arrives. Only one `write` can be in flight at a time; a second
    /// caller waits for the first to finish.
    pub async fn write(&self, data: Bytes) -> Result<(), SessionError> {
        if self.shutdown.is_closed() {
            return Err(SessionError::Closed);
        }

        let mut state = self.write_state.lock().await;
        let seqnum = state.seqnum;

        // Drop anything left over from a previous write's stale acks.
        while state.ack_rx.try_recv().is_ok() {}

        let write_cancel = Shutdown::new();
        loop {
            self.link
                .write(&write_cancel, None, Message::data(seqnum, data.clone()))
                .await?;

            tokio::select! {
                biased;
                _ = self.shutdown.notified() => return Err(SessionError::Closed),
                acked = state.ack_rx.recv() => {
                    match acked {
                        Some(s) if s == seqnum => break,
                        Some(_) => continue,
                        None => return Err(SessionError::Closed),
                    }
                }
                _ = sleep(self.config.retransmit_interval) => continue,
            }
        }

        state.seqnum += 1;
        Ok(())
    }

    /// Read up to `max` bytes from the session's inbound buffer, suspending
    /// until data is available.
    pub async fn read(&self, max: usize) -> Result<Bytes, SessionError> {
        Ok(self.buffer.read(max).await?)
    }

    /// Tear the session down: stops the link, the background tasks, and
    /// wakes any pending read/write. Idempotent.
    pub async fn close(&self) {
        self.shutdown.close();
        self.link.close();
        self.buffer.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown.close();
        self.link.close();
        self.dispatcher_task.abort();
        self.watchdog_task.abort();
        self.pinger_task.abort();
    }
}

async fn dispatch(
    link: Arc<Link>,
    buffer: Arc<ByteBuffer>,
    ack_tx: mpsc::Sender<u64>,
    last_seen: Arc<Mutex<Instant>>,
    ack_delivery_timeout: Duration,
    shutdown: Shutdown,
) {
    // The dispatcher never wants its own reads cancelled independently of
    // the session shutting down, so it passes a cancel token that never
    // closes and races the session `shutdown` signal directly.
    let never_cancel = Shutdown::new();
    let mut expected_seqnum: u64 = 0;

    loop {
        let msg = tokio::select! {
            biased;
            _ = shutdown.notified() => return,
            result = link.read(&never_cancel, None) => result,
        };

        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                tracing::debug!(?err, "dispatcher read failed, closing session");
                shutdown.close();
                return;
            }
        };

        *last_seen.lock().await = Instant::now();

        match msg.kind {
            MessageKind::Data => {
                if msg.seqnum == expected_seqnum {
                    match buffer.write(msg.data).await {
                        Ok(()) => {
                            expected_seqnum += 1;
                            let _ = link.write(&never_cancel, None, Message::ack(msg.seqnum)).await;
                        }
                        Err(BufferError::Full) => {
                            // Leave expected_seqnum untouched and send no ack;
                            // the peer's retransmit timer will try again.
                            tracing::debug!(seqnum = msg.seqnum, "inbound buffer full, dropping data");
                        }
                        Err(err) => {
                            tracing::warn!(?err, "inbound buffer error, closing session");
                            shutdown.close();
                            return;
                        }
                    }
                } else if msg.seqnum < expected_seqnum {
                    // Peer hasn't seen our ack yet and retransmitted; ack again.
                    let _ = link.write(&never_cancel, None, Message::ack(msg.seqnum)).await;
                } else {
                    tracing::warn!(
                        got = msg.seqnum,
                        expected = expected_seqnum,
                        "out-of-order data, dropping"
                    );
                }
            }
            MessageKind::Ack => {
                // Best-effort handoff: a writer not currently waiting for
                // this ack (already satisfied, or not yet looking) just
                // lets it lapse rather than queuing it.
                let _ = tokio::time::timeout(ack_delivery_timeout, ack_tx.send(msg.seqnum)).await;
            }
            MessageKind::Ping | MessageKind::Connect | MessageKind::AckAck => {}
        }
    }
}

async fn watchdog(last_seen: Arc<Mutex<Instant>>, idle_timeout: Duration, shutdown: Shutdown) {
    loop {
        let elapsed = last_seen.lock().await.elapsed();
        if elapsed >= idle_timeout {
            tracing::debug!("session idle timeout elapsed, closing");
            shutdown.close();
            return;
        }

        tokio::select! {
            _ = shutdown.notified() => return,
            _ = sleep(idle_timeout - elapsed) => continue,
        }
    }
}

async fn pinger(link: Arc<Link>, ping_interval: Duration, shutdown: Shutdown) {
    let cancel = Shutdown::new();
    loop {
        tokio::select! {
            _ = shutdown.notified() => return,
            _ = sleep(ping_interval) => {
                if link.write(&cancel, None, Message::ping()).await.is_err() {
                    shutdown.close();
                    return;
                }
            }
        }
    }
}
