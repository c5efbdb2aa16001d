//! Core transport traits for sshify
//!
//! The adaptation layer in `sshify-proto` never touches sockets directly.
//! It consumes two capabilities from the I/O runtime, both expressed here
//! as traits so the protocol code stays independent of the concrete
//! transport (and so tests can substitute a scripted one):
//!
//! - [`Transport`] - a connected stream offering a readiness wait keyed by
//!   [`Direction`] and exporting its OS socket descriptor for import into
//!   the native engine.
//! - [`Acceptor`] - a listening endpoint yielding connected transports.
//!
//! Implementations for [`tokio::net::TcpStream`] and
//! [`tokio::net::TcpListener`] are provided.

use std::io;

/// Readiness direction for a transport wait.
///
/// Every adapted native call is statically associated with one direction:
/// it is retried only after the transport can be read from (or written to)
/// without blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Wait until the transport is readable.
    Read,
    /// Wait until the transport is writable.
    Write,
}

/// Operating-system descriptor of a connected socket, in the form the
/// native engine's import call expects.
pub type SocketDescriptor = i64;

/// A connected stream the adaptation layer can suspend against.
///
/// The native engine performs the actual socket I/O; this trait only
/// supplies the readiness signal that drives the retry loop, plus the
/// descriptor the engine imports when a session is created or promoted.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Suspends until the transport is ready in `direction`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails while waiting, including
    /// the case where it is closed by another task. The caller treats
    /// this as the completion of the surrounding operation.
    async fn ready(&self, direction: Direction) -> io::Result<()>;

    /// Returns the OS descriptor of the underlying socket.
    fn descriptor(&self) -> SocketDescriptor;
}

/// A listening endpoint yielding connected transports.
#[async_trait::async_trait]
pub trait Acceptor: Send + Sync {
    /// The connected transport type produced by [`accept`](Self::accept).
    type Conn: Transport;

    /// Suspends until an incoming connection arrives and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept fails at the transport layer.
    async fn accept(&self) -> io::Result<Self::Conn>;
}

#[async_trait::async_trait]
impl Transport for tokio::net::TcpStream {
    async fn ready(&self, direction: Direction) -> io::Result<()> {
        let interest = match direction {
            Direction::Read => tokio::io::Interest::READABLE,
            Direction::Write => tokio::io::Interest::WRITABLE,
        };
        tokio::net::TcpStream::ready(self, interest).await?;
        Ok(())
    }

    fn descriptor(&self) -> SocketDescriptor {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            self.as_raw_fd() as SocketDescriptor
        }
        #[cfg(windows)]
        {
            use std::os::windows::io::AsRawSocket;
            self.as_raw_socket() as SocketDescriptor
        }
    }
}

#[async_trait::async_trait]
impl Acceptor for tokio::net::TcpListener {
    type Conn = tokio::net::TcpStream;

    async fn accept(&self) -> io::Result<Self::Conn> {
        let (stream, _addr) = tokio::net::TcpListener::accept(self).await?;
        Ok(stream)
    }
}
