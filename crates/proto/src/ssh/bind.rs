//! Server-side bind/listen/accept flow.
//!
//! A [`BindListener`] owns one native listener object plus the raw
//! connection acceptor it runs over. Configuration is applied through the
//! [`BindOption`] catalog before [`listen`](BindListener::listen); a
//! rejected option or a failed listen leaves the listener unusable.
//!
//! Two accept paths exist:
//!
//! - [`accept`](BindListener::accept) takes the raw connection from the
//!   acceptor first, then *promotes* the accepted descriptor into a fresh
//!   native session. The resulting [`Session`] owns its transport and
//!   supports the full async surface.
//! - [`blocking_accept`](BindListener::blocking_accept) lets the engine
//!   accept at the protocol layer and own the socket. The resulting
//!   session carries no caller-owned transport, so only its blocking call
//!   shapes are usable.

use crate::ssh::adapter::drive_blocking;
use crate::ssh::engine::{Outcome, RawListener, SshEngine};
use crate::ssh::error::{capture, ErrorCode, ErrorInfo};
use crate::ssh::handle::NativeHandle;
use crate::ssh::session::Session;
use sshify_platform::{Acceptor, SshifyError, SshifyResult, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, warn};

/// One listener configuration option.
///
/// Applied with [`BindListener::set_option`]. Options of different kinds
/// commute; applying the same kind twice overwrites the earlier value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOption {
    /// Local address to bind.
    BindAddress(String),
    /// Local port to bind.
    BindPort(u16),
    /// Path to a host key file.
    HostKeyFile(PathBuf),
    /// An in-memory host key.
    ImportKey(Vec<u8>),
    /// Pre-authentication banner text.
    Banner(String),
    /// Key exchange algorithm list.
    KeyExchange(String),
    /// Cipher list, client-to-server direction.
    CiphersClientToServer(String),
    /// Cipher list, server-to-client direction.
    CiphersServerToClient(String),
    /// MAC algorithm list, client-to-server direction.
    HmacClientToServer(String),
    /// MAC algorithm list, server-to-client direction.
    HmacServerToClient(String),
    /// Host key algorithm list.
    HostKeyAlgorithms(String),
    /// Engine log verbosity level.
    LogVerbosity(u32),
    /// Minimum acceptable RSA key size in bits.
    RsaMinSize(u32),
    /// Path to a DH moduli file.
    Moduli(PathBuf),
}

/// Kind tag of a [`BindOption`], used to detect same-kind overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindOptionKind {
    /// See [`BindOption::BindAddress`].
    BindAddress,
    /// See [`BindOption::BindPort`].
    BindPort,
    /// See [`BindOption::HostKeyFile`].
    HostKeyFile,
    /// See [`BindOption::ImportKey`].
    ImportKey,
    /// See [`BindOption::Banner`].
    Banner,
    /// See [`BindOption::KeyExchange`].
    KeyExchange,
    /// See [`BindOption::CiphersClientToServer`].
    CiphersClientToServer,
    /// See [`BindOption::CiphersServerToClient`].
    CiphersServerToClient,
    /// See [`BindOption::HmacClientToServer`].
    HmacClientToServer,
    /// See [`BindOption::HmacServerToClient`].
    HmacServerToClient,
    /// See [`BindOption::HostKeyAlgorithms`].
    HostKeyAlgorithms,
    /// See [`BindOption::LogVerbosity`].
    LogVerbosity,
    /// See [`BindOption::RsaMinSize`].
    RsaMinSize,
    /// See [`BindOption::Moduli`].
    Moduli,
}

impl BindOption {
    /// The kind tag of this option.
    pub fn kind(&self) -> BindOptionKind {
        match self {
            BindOption::BindAddress(_) => BindOptionKind::BindAddress,
            BindOption::BindPort(_) => BindOptionKind::BindPort,
            BindOption::HostKeyFile(_) => BindOptionKind::HostKeyFile,
            BindOption::ImportKey(_) => BindOptionKind::ImportKey,
            BindOption::Banner(_) => BindOptionKind::Banner,
            BindOption::KeyExchange(_) => BindOptionKind::KeyExchange,
            BindOption::CiphersClientToServer(_) => BindOptionKind::CiphersClientToServer,
            BindOption::CiphersServerToClient(_) => BindOptionKind::CiphersServerToClient,
            BindOption::HmacClientToServer(_) => BindOptionKind::HmacClientToServer,
            BindOption::HmacServerToClient(_) => BindOptionKind::HmacServerToClient,
            BindOption::HostKeyAlgorithms(_) => BindOptionKind::HostKeyAlgorithms,
            BindOption::LogVerbosity(_) => BindOptionKind::LogVerbosity,
            BindOption::RsaMinSize(_) => BindOptionKind::RsaMinSize,
            BindOption::Moduli(_) => BindOptionKind::Moduli,
        }
    }
}

/// A server-side SSH listener.
///
/// Owns one native listener object (freed on drop) and the raw acceptor
/// used by the promotion accept path. Operations take `&mut self`; at most
/// one accept is in flight at a time.
pub struct BindListener<E: SshEngine, A: Acceptor> {
    engine: Arc<E>,
    handle: NativeHandle<E, RawListener>,
    acceptor: A,
}

impl<E: SshEngine> BindListener<E, TcpListener> {
    /// Binds a TCP listener on `addr` and wraps it in a new native
    /// listener object.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP bind fails.
    pub async fn bind(engine: Arc<E>, addr: &str) -> SshifyResult<Self> {
        let acceptor = TcpListener::bind(addr).await.map_err(SshifyError::Io)?;
        debug!("listening on {}", addr);
        Ok(Self::new(engine, acceptor))
    }
}

impl<E: SshEngine, A: Acceptor> BindListener<E, A> {
    /// Wraps an already-bound acceptor in a new native listener object.
    pub fn new(engine: Arc<E>, acceptor: A) -> Self {
        let raw = engine.new_listener();
        let handle = NativeHandle::new(Arc::clone(&engine), raw);
        Self {
            engine,
            handle,
            acceptor,
        }
    }

    fn raw_checked(&self) -> SshifyResult<RawListener> {
        self.handle.get().ok_or_else(|| {
            SshifyError::Config("native listener handle has been released".to_string())
        })
    }

    /// The raw acceptor this listener runs over.
    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }

    /// Applies one configuration option.
    ///
    /// # Errors
    ///
    /// Returns a configuration error carrying the engine's rejection
    /// message if the listener refuses the option.
    pub fn set_option(&mut self, option: &BindOption) -> SshifyResult<()> {
        let raw = self.raw_checked()?;
        if self.engine.listener_set_option(raw, option) {
            Ok(())
        } else {
            let (_, message) = self.engine.listener_error(raw);
            Err(SshifyError::Config(message))
        }
    }

    /// Option application reporting through out-parameters.
    pub fn set_option_ec(&mut self, option: &BindOption, ec: &mut ErrorCode, ei: &mut ErrorInfo) {
        capture(self.set_option(option), ec, ei);
    }

    /// Transitions the listener into an accept-ready state.
    ///
    /// A failure here is fatal to the listener; no accept will succeed
    /// afterwards.
    pub fn listen(&mut self) -> SshifyResult<()> {
        let raw = self.raw_checked()?;
        self.engine.set_listener_blocking(raw, true);
        drive_blocking(
            || self.engine.listener_listen(raw),
            || self.engine.listener_error(raw),
        )
    }

    /// Listen transition reporting through out-parameters.
    pub fn listen_ec(&mut self, ec: &mut ErrorCode, ei: &mut ErrorInfo) {
        capture(self.listen(), ec, ei);
    }

    /// Accepts one connection asynchronously.
    ///
    /// Waits on the raw acceptor, then promotes the accepted descriptor
    /// into a fresh native session. Promotion failure is the single
    /// completion of the accept: the allocated session is freed and the
    /// raw connection dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the raw accept fails or the engine rejects the
    /// promotion.
    pub async fn accept(&mut self) -> SshifyResult<Session<E, A::Conn>> {
        let raw_listener = self.raw_checked()?;
        self.engine.set_listener_blocking(raw_listener, false);

        let conn = self.acceptor.accept().await.map_err(SshifyError::Io)?;

        let raw_session = self.engine.new_session();
        let handle = NativeHandle::new(Arc::clone(&self.engine), raw_session);
        self.engine.set_blocking(raw_session, false);
        match self
            .engine
            .listener_accept_descriptor(raw_listener, raw_session, conn.descriptor())
        {
            Outcome::Done(()) => {
                debug!("accepted connection, session promoted");
                Ok(Session::from_parts(
                    Arc::clone(&self.engine),
                    handle,
                    Some(conn),
                ))
            }
            Outcome::Again | Outcome::Fault => {
                let (code, message) = self.engine.session_error(raw_session);
                // A would-block here leaves the error state cleared; don't
                // surface an empty message.
                let message = if message.is_empty() {
                    "engine returned would-block from session promotion".to_string()
                } else {
                    message
                };
                warn!("session promotion failed: {} ({})", message, code);
                // `handle` drops here and frees the session.
                Err(SshifyError::Engine { code, message })
            }
        }
    }

    /// Accepts one connection at the protocol layer, blocking.
    ///
    /// The engine owns the accepted socket; the resulting session carries
    /// no caller-owned transport and supports only its blocking call
    /// shapes.
    pub fn blocking_accept(&mut self) -> SshifyResult<Session<E, A::Conn>> {
        let raw_listener = self.raw_checked()?;
        self.engine.set_listener_blocking(raw_listener, true);

        let raw_session = self.engine.new_session();
        let handle = NativeHandle::new(Arc::clone(&self.engine), raw_session);
        drive_blocking(
            || self.engine.listener_accept(raw_listener, raw_session),
            || self.engine.listener_error(raw_listener),
        )?;
        Ok(Session::from_parts(Arc::clone(&self.engine), handle, None))
    }

    /// Blocking protocol-layer accept reporting through out-parameters.
    pub fn blocking_accept_ec(
        &mut self,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) -> Option<Session<E, A::Conn>> {
        capture(self.blocking_accept(), ec, ei)
    }
}
