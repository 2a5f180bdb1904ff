//! TCP listener and session handling for the echo protocol.
//!
//! Accepts connections one at a time, accumulates received bytes until
//! the message terminator appears, echoes the full payload back, and
//! closes the connection.

use crate::buffer::{MessageTooLarge, ReceiveBuffer};
use crate::config::Config;
use crate::protocol;
use socket2::{Domain, Socket, Type};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

/// OS-level queue depth for connections awaiting acceptance.
const LISTEN_BACKLOG: i32 = 20;

/// Size of each receive chunk.
const RECV_CHUNK_SIZE: usize = 1024;

/// Server instance
pub struct Server {
    config: Config,
    session_limit: Arc<Semaphore>,
}

/// Per-session limits, copied out of the config for the spawned task.
#[derive(Debug, Clone, Copy)]
struct SessionLimits {
    max_message: usize,
    read_timeout: Duration,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        // At least one session slot, or the accept loop would stall forever.
        let session_limit = Arc::new(Semaphore::new(config.max_sessions.max(1)));

        Server {
            config,
            session_limit,
        }
    }

    /// Bind the listening socket.
    ///
    /// The socket family is chosen to match the configured literal; a
    /// hostname is not accepted here (resolution happens upstream, see
    /// `addr`). Fails with `BindError` on a malformed literal or any
    /// OS-level bind/listen failure, including the port being in use.
    pub fn bind(&self) -> Result<TcpListener, BindError> {
        let ip: IpAddr = self
            .config
            .listen
            .parse()
            .map_err(|_| BindError::InvalidAddress(self.config.listen.clone()))?;
        let addr = SocketAddr::new(ip, self.config.port);

        let domain = match ip {
            IpAddr::V4(_) => Domain::IPV4,
            IpAddr::V6(_) => Domain::IPV6,
        };

        let socket = Socket::new(domain, Type::STREAM, Some(socket2::Protocol::TCP))
            .map_err(BindError::Socket)?;
        socket
            .bind(&addr.into())
            .map_err(|e| BindError::Bind(addr, e))?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| BindError::Bind(addr, e))?;
        socket.set_nonblocking(true).map_err(BindError::Socket)?;

        TcpListener::from_std(socket.into()).map_err(BindError::Socket)
    }

    /// Bind and begin accepting connections. Never returns under normal
    /// operation; a bind failure is fatal and is not retried.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = self.bind()?;
        info!(
            address = %self.config.listen,
            port = self.config.port,
            "Listener bound, waiting for connections"
        );
        self.serve(listener).await
    }

    /// Accept connections one at a time and hand each to a session handler.
    ///
    /// Accepts are strictly serialized: the loop admits one connection,
    /// spawns its handler, and only then accepts the next. Session I/O runs
    /// concurrently with further accepts, bounded by the session semaphore.
    pub async fn serve(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let limits = SessionLimits {
            max_message: self.config.max_message_size,
            read_timeout: self.config.read_timeout,
        };

        loop {
            // Wait for a session slot before accepting.
            let permit = self.session_limit.clone().acquire_owned().await?;

            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "Accepted connection");

                    tokio::spawn(async move {
                        if let Err(e) = handle_session(stream, peer, limits).await {
                            warn!(peer = %peer, error = %e, "Session failed");
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Get a reference to the resolved config for testing
    #[cfg(test)]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Drive a single session to completion: receive until the terminator
/// arrives, echo the accumulated payload, shut the connection down.
///
/// All effects are on the socket and the logging surface. Errors are
/// session-local; the caller logs them and the stream is closed on every
/// exit path by dropping it here.
async fn handle_session(
    mut stream: TcpStream,
    peer: SocketAddr,
    limits: SessionLimits,
) -> Result<(), SessionError> {
    let mut buffer = ReceiveBuffer::new(limits.max_message);
    let mut chunk = [0u8; RECV_CHUNK_SIZE];

    loop {
        let read = match timeout(limits.read_timeout, stream.read(&mut chunk)).await {
            Ok(result) => result?,
            Err(_) => return Err(SessionError::TimedOut(limits.read_timeout)),
        };

        if read == 0 {
            // Peer closed its write side before completing a message.
            // End-of-stream ends the session; nothing is echoed back.
            debug!(
                peer = %peer,
                buffered = buffer.len(),
                "Peer closed before terminator"
            );
            return Ok(());
        }

        buffer.extend(&chunk[..read])?;
        trace!(peer = %peer, read, total = buffer.len(), "Received chunk");

        // The terminator can straddle chunk boundaries, so every new chunk
        // triggers a scan of the whole accumulated buffer.
        if protocol::contains_terminator(buffer.as_bytes()) {
            break;
        }
    }

    debug!(
        peer = %peer,
        bytes = buffer.len(),
        data = %buffer.as_text(),
        "Message complete"
    );

    // Echo the full accumulated payload, terminator included, exactly as
    // received.
    stream.write_all(buffer.as_bytes()).await?;
    debug!(peer = %peer, bytes = buffer.len(), "Echoed message");

    stream.shutdown().await?;
    Ok(())
}

/// Bind-time errors. Fatal to the listener; never retried.
#[derive(Debug)]
pub enum BindError {
    /// The configured bind address is not an IPv4 or IPv6 literal.
    InvalidAddress(String),
    /// Socket creation or registration failed.
    Socket(std::io::Error),
    /// Binding or listening on the address failed (e.g. already in use).
    Bind(SocketAddr, std::io::Error),
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindError::InvalidAddress(addr) => {
                write!(f, "'{addr}' is not a valid IPv4 or IPv6 literal")
            }
            BindError::Socket(e) => write!(f, "Failed to create listening socket: {e}"),
            BindError::Bind(addr, e) => write!(f, "Failed to bind to {addr}: {e}"),
        }
    }
}

impl std::error::Error for BindError {}

/// Per-session errors. Logged by the accept loop's spawned task; the
/// listener itself and other sessions are unaffected.
#[derive(Debug)]
pub enum SessionError {
    /// The accumulated message exceeded the configured cap.
    TooLarge(MessageTooLarge),
    /// No data arrived within the per-read deadline.
    TimedOut(Duration),
    /// Transport error while receiving or sending.
    Io(std::io::Error),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::TooLarge(e) => write!(f, "{e}"),
            SessionError::TimedOut(deadline) => {
                write!(f, "No data received within {}s", deadline.as_secs())
            }
            SessionError::Io(e) => write!(f, "Transport error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<MessageTooLarge> for SessionError {
    fn from(e: MessageTooLarge) -> Self {
        SessionError::TooLarge(e)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e)
    }
}
