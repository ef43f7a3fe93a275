//! Two sessions chatting over an in-memory duplex pipe.
//!
//! This is the same carrier the test suite uses, just without mocking out
//! the handshake and retransmit timers: run with `RUST_LOG=debug` to watch
//! the handshake, a few round trips, and a clean shutdown go by.

use bytes::Bytes;
use relaylink::{Session, SessionConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (client_half, server_half) = tokio::io::duplex(64 * 1024);
    let (client_reader, client_writer) = tokio::io::split(client_half);
    let (server_reader, server_writer) = tokio::io::split(server_half);

    let config = SessionConfig::default();

    let (dialer, listener) = tokio::try_join!(
        Session::dial(client_reader, client_writer, config),
        Session::listen(server_reader, server_writer, config),
    )?;

    dialer.write(Bytes::from_static(b"hello from the dialer")).await?;
    let got = listener.read(1024).await?;
    println!("listener received: {}", String::from_utf8_lossy(&got));

    listener.write(Bytes::from_static(b"hello back from the listener")).await?;
    let got = dialer.read(1024).await?;
    println!("dialer received: {}", String::from_utf8_lossy(&got));

    for i in 0..3u8 {
        let payload = Bytes::from(format!("message {i}").into_bytes());
        dialer.write(payload.clone()).await?;
        let echoed = listener.read(1024).await?;
        println!("listener received: {}", String::from_utf8_lossy(&echoed));
        assert_eq!(echoed, payload);
    }

    dialer.close().await;
    listener.close().await;
    Ok(())
}
