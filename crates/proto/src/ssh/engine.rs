//! Native SSH engine interface.
//!
//! The wire protocol itself (packet framing, key exchange math, cipher
//! negotiation, authentication mechanisms) is an external collaborator:
//! this crate adapts it, it does not reimplement it. [`SshEngine`] is the
//! seam through which that engine is consumed - a uniform catalog of calls
//! that each return the tri-state [`Outcome`], per-object most-recent-error
//! queries, and blocking-mode toggles.
//!
//! Native objects are handed out as opaque tokens ([`RawSession`],
//! [`RawChannel`], [`RawListener`]). They carry no behavior of their own;
//! ownership and release are the job of
//! [`NativeHandle`](crate::ssh::handle::NativeHandle).
//!
//! # Error query contract
//!
//! `session_error` / `listener_error` return the numeric code and
//! descriptive message of the *most recent* failure on that object. The
//! engine overwrites this state on every call, so the adaptation layer
//! reads it immediately when a call reports [`Outcome::Fault`], before
//! anything else touches the object.

use crate::ssh::bind::BindOption;
use crate::ssh::handle::NativeRaw;
use sshify_platform::SocketDescriptor;

/// Tri-state outcome of a native engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    /// The call finished; carries its result.
    Done(T),
    /// The call cannot make progress until the transport is ready again.
    Again,
    /// The call failed hard. The descriptive message must be read from the
    /// owning object before any further call on it.
    Fault,
}

/// Opaque token for a native session object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSession(pub u64);

/// Opaque token for a native channel object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawChannel(pub u64);

/// Opaque token for a native listener object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawListener(pub u64);

/// Stream selector for channel reads and writes.
///
/// An SSH channel multiplexes a primary byte stream and an error byte
/// stream; every read/write names which one it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// The primary (stdout) stream.
    Stdout,
    /// The error (stderr) stream.
    Stderr,
}

/// The consumed native-call catalog of the external SSH engine.
///
/// Production implementations bind a concrete engine (e.g. over FFI);
/// tests substitute a scripted one. Calls returning [`Outcome`] follow the
/// engine's non-blocking contract: with blocking mode enabled on the
/// owning object they never return [`Outcome::Again`].
pub trait SshEngine: Send + Sync {
    // --- object lifecycle ---

    /// Allocates a new native session object.
    fn new_session(&self) -> RawSession;

    /// Releases a native session object.
    fn free_session(&self, session: RawSession);

    /// Allocates a new native channel on `session`, or `None` on failure
    /// (query [`session_error`](Self::session_error) for the cause).
    fn channel_new(&self, session: RawSession) -> Option<RawChannel>;

    /// Releases a native channel object.
    fn free_channel(&self, channel: RawChannel);

    /// Allocates a new native listener object.
    fn new_listener(&self) -> RawListener;

    /// Releases a native listener object.
    fn free_listener(&self, listener: RawListener);

    // --- modes and error queries ---

    /// Toggles blocking mode on a session.
    fn set_blocking(&self, session: RawSession, blocking: bool);

    /// Toggles blocking mode on a listener.
    fn set_listener_blocking(&self, listener: RawListener, blocking: bool);

    /// Most recent error on `session`: numeric code and descriptive
    /// message. Valid only until the next call on the session.
    fn session_error(&self, session: RawSession) -> (i32, String);

    /// Most recent error on `listener`. Valid only until the next call on
    /// the listener.
    fn listener_error(&self, listener: RawListener) -> (i32, String);

    // --- session calls ---

    /// Imports a connected socket descriptor into `session`.
    fn set_descriptor(&self, session: RawSession, descriptor: SocketDescriptor) -> Outcome;

    /// Drives the client-side handshake one step.
    fn handshake(&self, session: RawSession) -> Outcome;

    /// Drives the server-side key exchange one step.
    fn handle_key_exchange(&self, session: RawSession) -> Outcome;

    /// Password authentication step.
    fn auth_password(&self, session: RawSession, username: &str, password: &str) -> Outcome;

    /// Public-key authentication step.
    fn auth_public_key(&self, session: RawSession, username: &str, key: &[u8]) -> Outcome;

    /// Sends a disconnect to the peer. Best-effort; never fails.
    fn disconnect(&self, session: RawSession);

    // --- channel calls ---

    /// Drives the session-channel open exchange one step.
    fn channel_open_session(&self, channel: RawChannel) -> Outcome;

    /// Drives an X11 channel open one step.
    fn channel_open_x11(&self, channel: RawChannel, orig_addr: &str, orig_port: u16) -> Outcome;

    /// Reads from the selected stream into `buf`.
    fn channel_read(&self, channel: RawChannel, buf: &mut [u8], stream: Stream) -> Outcome<usize>;

    /// Writes `buf` to the selected stream.
    fn channel_write(&self, channel: RawChannel, buf: &[u8], stream: Stream) -> Outcome<usize>;

    /// Sends EOF on the channel.
    fn channel_send_eof(&self, channel: RawChannel) -> Outcome;

    /// Queries the channel's current window size.
    fn channel_window_size(&self, channel: RawChannel) -> Outcome<u32>;

    /// Sets an environment variable on the remote side.
    fn request_env(&self, channel: RawChannel, name: &str, value: &str) -> Outcome;

    /// Requests execution of a remote command.
    fn request_exec(&self, channel: RawChannel, command: &str) -> Outcome;

    /// Requests a pty with default dimensions.
    fn request_pty(&self, channel: RawChannel) -> Outcome;

    /// Requests a pty with explicit terminal type and dimensions.
    fn request_pty_size(&self, channel: RawChannel, term: &str, columns: u32, rows: u32)
        -> Outcome;

    /// Requests an interactive shell.
    fn request_shell(&self, channel: RawChannel) -> Outcome;

    /// Requests a named subsystem.
    fn request_subsystem(&self, channel: RawChannel, name: &str) -> Outcome;

    /// Requests X11 forwarding.
    fn request_x11(
        &self,
        channel: RawChannel,
        single_connection: bool,
        protocol: &str,
        cookie: &str,
        screen: u32,
    ) -> Outcome;

    /// Requests authentication-agent forwarding.
    fn request_auth_agent(&self, channel: RawChannel) -> Outcome;

    /// Sends a break of the given length in milliseconds.
    fn send_break(&self, channel: RawChannel, length_ms: u32) -> Outcome;

    /// Delivers a signal to the remote process.
    fn send_signal(&self, channel: RawChannel, signal: &str) -> Outcome;

    /// Reports the exit status of the local process to the peer.
    fn send_exit_status(&self, channel: RawChannel, status: i32) -> Outcome;

    /// Reports that the local process terminated on a signal.
    fn send_exit_signal(
        &self,
        channel: RawChannel,
        signal: &str,
        core_dumped: bool,
        error_message: &str,
        lang: &str,
    ) -> Outcome;

    // --- listener calls ---

    /// Applies one configuration option to the listener. Returns `false`
    /// on rejection (query [`listener_error`](Self::listener_error)).
    fn listener_set_option(&self, listener: RawListener, option: &BindOption) -> bool;

    /// Transitions the listener into an accept-ready state.
    fn listener_listen(&self, listener: RawListener) -> Outcome;

    /// Accepts a connection at the protocol layer into `session`.
    fn listener_accept(&self, listener: RawListener, session: RawSession) -> Outcome;

    /// Promotes an already-accepted socket descriptor into `session`.
    fn listener_accept_descriptor(
        &self,
        listener: RawListener,
        session: RawSession,
        descriptor: SocketDescriptor,
    ) -> Outcome;
}

impl<E: SshEngine> NativeRaw<E> for RawSession {
    fn free(self, engine: &E) {
        engine.free_session(self);
    }
}

impl<E: SshEngine> NativeRaw<E> for RawChannel {
    fn free(self, engine: &E) {
        engine.free_channel(self);
    }
}

impl<E: SshEngine> NativeRaw<E> for RawListener {
    fn free(self, engine: &E) {
        engine.free_listener(self);
    }
}
