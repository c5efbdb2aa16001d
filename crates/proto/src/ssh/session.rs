//! SSH session lifecycle and handshake/authentication operations.
//!
//! A [`Session`] owns one native session object and (usually) the
//! transport connection it runs over. Each handshake/authentication step
//! is the generic adapter instantiated with the matching native call and
//! read readiness - these steps always need input from the peer before
//! they can proceed.
//!
//! Every operation is exposed in three call shapes:
//!
//! - `async fn op(...)` - suspends against the readiness scheduler, never
//!   blocks the calling thread;
//! - `fn blocking_op(...)` - forces the engine into blocking mode for the
//!   duration of the call;
//! - `fn blocking_op_ec(...)` - blocking, reporting through
//!   [`ErrorCode`]/[`ErrorInfo`] out-parameters instead of `Err`.
//!
//! Operations take `&mut self`, so one handle cannot run two operations
//! concurrently. Clones share the native session but each carry their own
//! receiver; keeping at most one operation in flight across clones is the
//! caller's responsibility.

use crate::ssh::adapter::{drive_blocking, drive_scheduled};
use crate::ssh::engine::{Outcome, RawSession, SshEngine};
use crate::ssh::error::{capture, ErrorCode, ErrorInfo};
use crate::ssh::handle::NativeHandle;
use sshify_platform::{Direction, SshifyError, SshifyResult, Transport};
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::debug;

/// Error for operations on a session whose native handle is gone.
pub(crate) fn session_released() -> SshifyError {
    SshifyError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "native session handle has been released",
    ))
}

/// Error for async operations on a session without a caller-owned
/// transport (protocol-layer accepted sessions).
pub(crate) fn no_transport() -> SshifyError {
    SshifyError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "session has no caller-owned transport; only blocking operations are available",
    ))
}

/// Shared interior of a [`Session`].
///
/// Channels hold a non-owning reference to this; the native session is
/// freed when the last owner drops.
pub(crate) struct SessionCore<E: SshEngine, S> {
    pub(crate) engine: Arc<E>,
    pub(crate) handle: NativeHandle<E, RawSession>,
    /// `None` for sessions accepted at the protocol layer, where the
    /// engine owns the socket.
    pub(crate) stream: Option<S>,
}

/// An SSH session over a native protocol engine.
///
/// Created via [`connect`](Session::connect) /
/// [`from_stream`](Session::from_stream), or promoted from an accepted
/// connection by [`BindListener::accept`](crate::ssh::bind::BindListener::accept).
/// Cloning shares the same native session; it is destroyed when the last
/// owner drops.
pub struct Session<E: SshEngine, S: Transport> {
    core: Arc<SessionCore<E, S>>,
}

impl<E: SshEngine, S: Transport> Clone for Session<E, S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<E: SshEngine> Session<E, TcpStream> {
    /// Connects to `addr` and wraps the connection in a new native
    /// session.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connect fails or the engine rejects
    /// the descriptor import.
    pub async fn connect(engine: Arc<E>, addr: &str) -> SshifyResult<Self> {
        let stream = TcpStream::connect(addr).await.map_err(SshifyError::Io)?;
        debug!("connected to {}", addr);
        Self::from_stream(engine, stream)
    }
}

impl<E: SshEngine, S: Transport> Session<E, S> {
    /// Wraps an already-connected transport in a new native session,
    /// importing its socket descriptor into the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the descriptor import; the
    /// allocated native session is freed before returning.
    pub fn from_stream(engine: Arc<E>, stream: S) -> SshifyResult<Self> {
        let raw = engine.new_session();
        let handle = NativeHandle::new(Arc::clone(&engine), raw);
        match engine.set_descriptor(raw, stream.descriptor()) {
            Outcome::Done(()) => Ok(Self {
                core: Arc::new(SessionCore {
                    engine,
                    handle,
                    stream: Some(stream),
                }),
            }),
            Outcome::Again | Outcome::Fault => {
                let (code, message) = engine.session_error(raw);
                // A would-block here leaves the error state cleared; don't
                // surface an empty message.
                let message = if message.is_empty() {
                    "engine returned would-block from descriptor import".to_string()
                } else {
                    message
                };
                // `handle` drops here and frees the session.
                Err(SshifyError::Engine { code, message })
            }
        }
    }

    /// Assembles a session from parts produced by the accept/bind flow.
    pub(crate) fn from_parts(
        engine: Arc<E>,
        handle: NativeHandle<E, RawSession>,
        stream: Option<S>,
    ) -> Self {
        Self {
            core: Arc::new(SessionCore {
                engine,
                handle,
                stream,
            }),
        }
    }

    pub(crate) fn core(&self) -> &Arc<SessionCore<E, S>> {
        &self.core
    }

    /// The raw native session token, if the handle still owns one.
    pub fn raw(&self) -> Option<RawSession> {
        self.core.handle.get()
    }

    /// The caller-owned transport this session runs over, if any.
    ///
    /// `None` for sessions accepted at the protocol layer; use this to
    /// reach transport-level details such as the local address.
    pub fn transport(&self) -> Option<&S> {
        self.core.stream.as_ref()
    }

    fn raw_checked(&self) -> SshifyResult<RawSession> {
        self.core.handle.get().ok_or_else(session_released)
    }

    /// Drives one session-level native call under the scheduler.
    async fn op<T>(
        &mut self,
        direction: Direction,
        mut call: impl FnMut(&E, RawSession) -> Outcome<T>,
    ) -> SshifyResult<T> {
        let raw = self.raw_checked()?;
        let core = &*self.core;
        let stream = core.stream.as_ref().ok_or_else(no_transport)?;
        let engine = core.engine.as_ref();
        engine.set_blocking(raw, false);
        drive_scheduled(
            stream,
            direction,
            || call(engine, raw),
            || engine.session_error(raw),
        )
        .await
    }

    /// Drives one session-level native call in blocking mode.
    fn op_blocking<T>(
        &mut self,
        mut call: impl FnMut(&E, RawSession) -> Outcome<T>,
    ) -> SshifyResult<T> {
        let raw = self.raw_checked()?;
        let engine = self.core.engine.as_ref();
        engine.set_blocking(raw, true);
        drive_blocking(|| call(engine, raw), || engine.session_error(raw))
    }

    /// Performs the client-side handshake with the peer.
    pub async fn handshake(&mut self) -> SshifyResult<()> {
        self.op(Direction::Read, |e, s| e.handshake(s)).await
    }

    /// Blocking form of [`handshake`](Self::handshake).
    pub fn blocking_handshake(&mut self) -> SshifyResult<()> {
        self.op_blocking(|e, s| e.handshake(s))
    }

    /// Blocking handshake reporting through out-parameters.
    pub fn blocking_handshake_ec(&mut self, ec: &mut ErrorCode, ei: &mut ErrorInfo) {
        capture(self.blocking_handshake(), ec, ei);
    }

    /// Performs the server-side key exchange with a connected client.
    pub async fn handle_key_exchange(&mut self) -> SshifyResult<()> {
        self.op(Direction::Read, |e, s| e.handle_key_exchange(s)).await
    }

    /// Blocking form of [`handle_key_exchange`](Self::handle_key_exchange).
    pub fn blocking_handle_key_exchange(&mut self) -> SshifyResult<()> {
        self.op_blocking(|e, s| e.handle_key_exchange(s))
    }

    /// Blocking key exchange reporting through out-parameters.
    pub fn blocking_handle_key_exchange_ec(&mut self, ec: &mut ErrorCode, ei: &mut ErrorInfo) {
        capture(self.blocking_handle_key_exchange(), ec, ei);
    }

    /// Authenticates with a username and password.
    pub async fn auth_password(&mut self, username: &str, password: &str) -> SshifyResult<()> {
        self.op(Direction::Read, |e, s| e.auth_password(s, username, password))
            .await
    }

    /// Blocking form of [`auth_password`](Self::auth_password).
    pub fn blocking_auth_password(&mut self, username: &str, password: &str) -> SshifyResult<()> {
        self.op_blocking(|e, s| e.auth_password(s, username, password))
    }

    /// Blocking password authentication reporting through out-parameters.
    pub fn blocking_auth_password_ec(
        &mut self,
        username: &str,
        password: &str,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_auth_password(username, password), ec, ei);
    }

    /// Authenticates with a public key.
    pub async fn auth_public_key(&mut self, username: &str, key: &[u8]) -> SshifyResult<()> {
        self.op(Direction::Read, |e, s| e.auth_public_key(s, username, key))
            .await
    }

    /// Blocking form of [`auth_public_key`](Self::auth_public_key).
    pub fn blocking_auth_public_key(&mut self, username: &str, key: &[u8]) -> SshifyResult<()> {
        self.op_blocking(|e, s| e.auth_public_key(s, username, key))
    }

    /// Blocking public-key authentication reporting through
    /// out-parameters.
    pub fn blocking_auth_public_key_ec(
        &mut self,
        username: &str,
        key: &[u8],
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_auth_public_key(username, key), ec, ei);
    }

    /// Sends a best-effort disconnect to the peer.
    ///
    /// The native session stays allocated until the last owner drops.
    pub fn disconnect(&mut self) {
        if let Some(raw) = self.core.handle.get() {
            self.core.engine.disconnect(raw);
        }
    }
}
