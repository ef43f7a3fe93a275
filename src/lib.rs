pub mod buffer;
pub mod codec;
pub mod config;
pub mod frame;
pub mod link;
pub mod message;
pub mod session;
pub mod shutdown;


pub use buffer::{BufferError, ByteBuffer};
pub use codec::CodecError;
pub use config::SessionConfig;
pub use frame::FrameError;
pub use link::{Link, LinkError};
pub use message::{Message, MessageKind};
pub use session::{Session, SessionError};
pub use shutdown::Shutdown;

/// Error returned by most functions.
///
/// When writing a real application, one might want to consider a specialized
/// error handling crate or defining an error type as an `enum` of causes.
/// However, for our example, using a boxed `std::error::Error` is sufficient.
///
/// For performance reasons, boxing is avoided in any hot path. Each layer
/// (`frame`, `codec`, `link`, `buffer`, `session`) defines its own
/// `thiserror` error enum; those are only boxed into this crate-wide type at
/// the boundary where a caller wants one uniform error to propagate with `?`.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for relaylink operations.
///
/// This is defined as a convenience.
///
/// # Examples
///
/// ## Dialing a peer and exchanging bytes
///
/// This example shows the simplest way to establish a session over a
/// duplex byte-stream carrier and exchange some data:
///
/// ```rust,no_run
/// use bytes::Bytes;
/// use relaylink::{Session, SessionConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // In a real program `reader`/`writer` would be the two halves of a
///     // TCP connection, a serial port, or any other AsyncRead + AsyncWrite
///     // carrier; `demos/loopback.rs` wires two sessions over an in-memory
///     // duplex pipe end to end.
///     # let (client_half, _server_half) = tokio::io::duplex(4096);
///     # let (reader, writer) = tokio::io::split(client_half);
///     let session = Session::dial(reader, writer, SessionConfig::default()).await?;
///
///     session.write(Bytes::from_static(b"hello")).await?;
///     let reply = session.read(1024).await?;
///     println!("got {} bytes back", reply.len());
///
///     session.close().await;
///     Ok(())
/// }
/// ```
///
/// ## Listening for a peer
///
/// The other side of the handshake accepts a `CONNECT` instead of sending
/// one:
///
/// ```rust,no_run
/// use relaylink::{Session, SessionConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     # let (server_half, _client_half) = tokio::io::duplex(4096);
///     # let (reader, writer) = tokio::io::split(server_half);
///     let session = Session::listen(reader, writer, SessionConfig::default()).await?;
///     let inbound = session.read(1024).await?;
///     println!("received {} bytes", inbound.len());
///     session.close().await;
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
