//! SSH channel operations over an adapted native engine.
//!
//! A [`Channel`] is opened against an already-handshaken
//! [`Session`](crate::ssh::session::Session) and owns one native channel
//! object. It holds a *non-owning* reference to its parent session's
//! interior: the session must outlive every channel opened on it. A
//! dangling use does not go undefined - it fails fast with a
//! `NotConnected` transport error.
//!
//! Read and write are stream-selector qualified ([`Stream`]); the
//! [`StreamHalf`] facade binds a channel reference and a fixed selector so
//! generic stream code can treat the primary and error streams as two
//! independent byte streams.
//!
//! The request catalog (env, exec, pty, subsystem, signals, exit status,
//! X11/agent forwarding) follows one of two adapter shapes - zero extra
//! arguments or a handful - and every member completes with only an error
//! outcome, except [`window_size`](Channel::window_size), which also
//! yields a number. Every operation comes in the same three call shapes as
//! the session operations.

use crate::ssh::adapter::{drive_blocking, drive_scheduled};
use crate::ssh::engine::{Outcome, RawChannel, RawSession, SshEngine, Stream};
use crate::ssh::error::{capture, ErrorCode, ErrorInfo};
use crate::ssh::handle::NativeHandle;
use crate::ssh::session::{no_transport, session_released, Session, SessionCore};
use sshify_platform::{Direction, SshifyError, SshifyResult, Transport};
use std::io;
use std::sync::{Arc, Weak};

fn session_gone() -> SshifyError {
    SshifyError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "parent session has been destroyed",
    ))
}

impl<E: SshEngine, S: Transport> Session<E, S> {
    /// Opens a session channel, driving the open exchange under the
    /// scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if channel allocation or the open exchange fails;
    /// the allocated native channel is freed before returning.
    pub async fn open_channel(&mut self) -> SshifyResult<Channel<E, S>> {
        let (handle, raw_session, raw_channel) = self.new_channel_handle()?;
        let core = self.core();
        let stream = core.stream.as_ref().ok_or_else(no_transport)?;
        let engine = core.engine.as_ref();
        engine.set_blocking(raw_session, false);
        drive_scheduled(
            stream,
            Direction::Read,
            || engine.channel_open_session(raw_channel),
            || engine.session_error(raw_session),
        )
        .await?;
        Ok(Channel {
            session: Arc::downgrade(core),
            handle,
        })
    }

    /// Blocking form of [`open_channel`](Self::open_channel).
    pub fn blocking_open_channel(&mut self) -> SshifyResult<Channel<E, S>> {
        let (handle, raw_session, raw_channel) = self.new_channel_handle()?;
        let core = self.core();
        let engine = core.engine.as_ref();
        engine.set_blocking(raw_session, true);
        drive_blocking(
            || engine.channel_open_session(raw_channel),
            || engine.session_error(raw_session),
        )?;
        Ok(Channel {
            session: Arc::downgrade(core),
            handle,
        })
    }

    /// Blocking channel open reporting through out-parameters.
    pub fn blocking_open_channel_ec(
        &mut self,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) -> Option<Channel<E, S>> {
        capture(self.blocking_open_channel(), ec, ei)
    }

    /// Allocates a native channel wrapped in an owning handle.
    fn new_channel_handle(
        &self,
    ) -> SshifyResult<(NativeHandle<E, RawChannel>, RawSession, RawChannel)> {
        let raw_session = self.raw().ok_or_else(session_released)?;
        let engine = &self.core().engine;
        let raw_channel = engine.channel_new(raw_session).ok_or_else(|| {
            let (code, message) = engine.session_error(raw_session);
            SshifyError::Engine { code, message }
        })?;
        Ok((
            NativeHandle::new(Arc::clone(engine), raw_channel),
            raw_session,
            raw_channel,
        ))
    }
}

/// An SSH channel for data transfer and remote requests.
///
/// Owns its native channel object; freed on drop. Holds a non-owning
/// reference to the parent session, which must outlive the channel.
pub struct Channel<E: SshEngine, S: Transport> {
    session: Weak<SessionCore<E, S>>,
    handle: NativeHandle<E, RawChannel>,
}

impl<E: SshEngine, S: Transport> Channel<E, S> {
    fn core(&self) -> SshifyResult<Arc<SessionCore<E, S>>> {
        self.session.upgrade().ok_or_else(session_gone)
    }

    fn raw_checked(&self) -> SshifyResult<RawChannel> {
        self.handle.get().ok_or_else(session_released)
    }

    /// Drives one channel-level native call under the scheduler.
    ///
    /// The session's transport provides readiness and the session object
    /// carries the most-recent-error state for channel calls.
    async fn op<T>(
        &mut self,
        direction: Direction,
        mut call: impl FnMut(&E, RawChannel) -> Outcome<T>,
    ) -> SshifyResult<T> {
        let channel = self.raw_checked()?;
        let core = self.core()?;
        let raw_session = core.handle.get().ok_or_else(session_released)?;
        let stream = core.stream.as_ref().ok_or_else(no_transport)?;
        let engine = core.engine.as_ref();
        engine.set_blocking(raw_session, false);
        drive_scheduled(
            stream,
            direction,
            || call(engine, channel),
            || engine.session_error(raw_session),
        )
        .await
    }

    /// Drives one channel-level native call in blocking mode.
    fn op_blocking<T>(
        &mut self,
        mut call: impl FnMut(&E, RawChannel) -> Outcome<T>,
    ) -> SshifyResult<T> {
        let channel = self.raw_checked()?;
        let core = self.core()?;
        let raw_session = core.handle.get().ok_or_else(session_released)?;
        let engine = core.engine.as_ref();
        engine.set_blocking(raw_session, true);
        drive_blocking(
            || call(engine, channel),
            || engine.session_error(raw_session),
        )
    }

    // --- std-stream read/write ---

    /// Reads from the selected stream into `buf`, returning the number of
    /// bytes read.
    pub async fn read_some(&mut self, buf: &mut [u8], stream: Stream) -> SshifyResult<usize> {
        self.op(Direction::Read, |e, c| e.channel_read(c, buf, stream))
            .await
    }

    /// Blocking form of [`read_some`](Self::read_some).
    pub fn blocking_read_some(&mut self, buf: &mut [u8], stream: Stream) -> SshifyResult<usize> {
        self.op_blocking(|e, c| e.channel_read(c, buf, stream))
    }

    /// Blocking read reporting through out-parameters. Returns 0 on
    /// failure.
    pub fn blocking_read_some_ec(
        &mut self,
        buf: &mut [u8],
        stream: Stream,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) -> usize {
        capture(self.blocking_read_some(buf, stream), ec, ei).unwrap_or(0)
    }

    /// Writes `buf` to the selected stream, returning the number of bytes
    /// written.
    pub async fn write_some(&mut self, buf: &[u8], stream: Stream) -> SshifyResult<usize> {
        self.op(Direction::Write, |e, c| e.channel_write(c, buf, stream))
            .await
    }

    /// Blocking form of [`write_some`](Self::write_some).
    pub fn blocking_write_some(&mut self, buf: &[u8], stream: Stream) -> SshifyResult<usize> {
        self.op_blocking(|e, c| e.channel_write(c, buf, stream))
    }

    /// Blocking write reporting through out-parameters. Returns 0 on
    /// failure.
    pub fn blocking_write_some_ec(
        &mut self,
        buf: &[u8],
        stream: Stream,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) -> usize {
        capture(self.blocking_write_some(buf, stream), ec, ei).unwrap_or(0)
    }

    // --- stream facade ---

    /// A view of this channel fixed to the primary stream.
    pub fn stdout(&mut self) -> StreamHalf<'_, E, S> {
        StreamHalf {
            channel: self,
            stream: Stream::Stdout,
        }
    }

    /// A view of this channel fixed to the error stream.
    pub fn stderr(&mut self) -> StreamHalf<'_, E, S> {
        StreamHalf {
            channel: self,
            stream: Stream::Stderr,
        }
    }

    // --- request catalog ---

    /// Sets an environment variable on the remote side.
    pub async fn request_env(&mut self, name: &str, value: &str) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.request_env(c, name, value))
            .await
    }

    /// Blocking form of [`request_env`](Self::request_env).
    pub fn blocking_request_env(&mut self, name: &str, value: &str) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.request_env(c, name, value))
    }

    /// Blocking env request reporting through out-parameters.
    pub fn blocking_request_env_ec(
        &mut self,
        name: &str,
        value: &str,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_request_env(name, value), ec, ei);
    }

    /// Requests execution of a remote command.
    pub async fn request_exec(&mut self, command: &str) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.request_exec(c, command))
            .await
    }

    /// Blocking form of [`request_exec`](Self::request_exec).
    pub fn blocking_request_exec(&mut self, command: &str) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.request_exec(c, command))
    }

    /// Blocking exec request reporting through out-parameters.
    pub fn blocking_request_exec_ec(
        &mut self,
        command: &str,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_request_exec(command), ec, ei);
    }

    /// Requests a pty with default dimensions.
    pub async fn request_pty(&mut self) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.request_pty(c)).await
    }

    /// Blocking form of [`request_pty`](Self::request_pty).
    pub fn blocking_request_pty(&mut self) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.request_pty(c))
    }

    /// Blocking pty request reporting through out-parameters.
    pub fn blocking_request_pty_ec(&mut self, ec: &mut ErrorCode, ei: &mut ErrorInfo) {
        capture(self.blocking_request_pty(), ec, ei);
    }

    /// Requests a pty with explicit terminal type and dimensions.
    pub async fn request_pty_size(
        &mut self,
        term: &str,
        columns: u32,
        rows: u32,
    ) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| {
            e.request_pty_size(c, term, columns, rows)
        })
        .await
    }

    /// Blocking form of [`request_pty_size`](Self::request_pty_size).
    pub fn blocking_request_pty_size(
        &mut self,
        term: &str,
        columns: u32,
        rows: u32,
    ) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.request_pty_size(c, term, columns, rows))
    }

    /// Blocking pty-size request reporting through out-parameters.
    pub fn blocking_request_pty_size_ec(
        &mut self,
        term: &str,
        columns: u32,
        rows: u32,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_request_pty_size(term, columns, rows), ec, ei);
    }

    /// Requests an interactive shell.
    pub async fn request_shell(&mut self) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.request_shell(c)).await
    }

    /// Blocking form of [`request_shell`](Self::request_shell).
    pub fn blocking_request_shell(&mut self) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.request_shell(c))
    }

    /// Blocking shell request reporting through out-parameters.
    pub fn blocking_request_shell_ec(&mut self, ec: &mut ErrorCode, ei: &mut ErrorInfo) {
        capture(self.blocking_request_shell(), ec, ei);
    }

    /// Requests a named subsystem.
    pub async fn request_subsystem(&mut self, name: &str) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.request_subsystem(c, name))
            .await
    }

    /// Blocking form of [`request_subsystem`](Self::request_subsystem).
    pub fn blocking_request_subsystem(&mut self, name: &str) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.request_subsystem(c, name))
    }

    /// Blocking subsystem request reporting through out-parameters.
    pub fn blocking_request_subsystem_ec(
        &mut self,
        name: &str,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_request_subsystem(name), ec, ei);
    }

    /// Requests X11 forwarding.
    pub async fn request_x11(
        &mut self,
        single_connection: bool,
        protocol: &str,
        cookie: &str,
        screen: u32,
    ) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| {
            e.request_x11(c, single_connection, protocol, cookie, screen)
        })
        .await
    }

    /// Blocking form of [`request_x11`](Self::request_x11).
    pub fn blocking_request_x11(
        &mut self,
        single_connection: bool,
        protocol: &str,
        cookie: &str,
        screen: u32,
    ) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.request_x11(c, single_connection, protocol, cookie, screen))
    }

    /// Blocking X11 request reporting through out-parameters.
    pub fn blocking_request_x11_ec(
        &mut self,
        single_connection: bool,
        protocol: &str,
        cookie: &str,
        screen: u32,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(
            self.blocking_request_x11(single_connection, protocol, cookie, screen),
            ec,
            ei,
        );
    }

    /// Requests authentication-agent forwarding.
    pub async fn request_auth_agent(&mut self) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.request_auth_agent(c)).await
    }

    /// Blocking form of [`request_auth_agent`](Self::request_auth_agent).
    pub fn blocking_request_auth_agent(&mut self) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.request_auth_agent(c))
    }

    /// Blocking agent request reporting through out-parameters.
    pub fn blocking_request_auth_agent_ec(&mut self, ec: &mut ErrorCode, ei: &mut ErrorInfo) {
        capture(self.blocking_request_auth_agent(), ec, ei);
    }

    /// Sends a break of the given length in milliseconds.
    pub async fn send_break(&mut self, length_ms: u32) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.send_break(c, length_ms))
            .await
    }

    /// Blocking form of [`send_break`](Self::send_break).
    pub fn blocking_send_break(&mut self, length_ms: u32) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.send_break(c, length_ms))
    }

    /// Blocking break reporting through out-parameters.
    pub fn blocking_send_break_ec(
        &mut self,
        length_ms: u32,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_send_break(length_ms), ec, ei);
    }

    /// Delivers a signal to the remote process.
    pub async fn send_signal(&mut self, signal: &str) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.send_signal(c, signal)).await
    }

    /// Blocking form of [`send_signal`](Self::send_signal).
    pub fn blocking_send_signal(&mut self, signal: &str) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.send_signal(c, signal))
    }

    /// Blocking signal delivery reporting through out-parameters.
    pub fn blocking_send_signal_ec(
        &mut self,
        signal: &str,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_send_signal(signal), ec, ei);
    }

    /// Reports the exit status of the local process to the peer.
    pub async fn send_exit_status(&mut self, status: i32) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.send_exit_status(c, status))
            .await
    }

    /// Blocking form of [`send_exit_status`](Self::send_exit_status).
    pub fn blocking_send_exit_status(&mut self, status: i32) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.send_exit_status(c, status))
    }

    /// Blocking exit-status report through out-parameters.
    pub fn blocking_send_exit_status_ec(
        &mut self,
        status: i32,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_send_exit_status(status), ec, ei);
    }

    /// Reports that the local process terminated on a signal.
    pub async fn send_exit_signal(
        &mut self,
        signal: &str,
        core_dumped: bool,
        error_message: &str,
        lang: &str,
    ) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| {
            e.send_exit_signal(c, signal, core_dumped, error_message, lang)
        })
        .await
    }

    /// Blocking form of [`send_exit_signal`](Self::send_exit_signal).
    pub fn blocking_send_exit_signal(
        &mut self,
        signal: &str,
        core_dumped: bool,
        error_message: &str,
        lang: &str,
    ) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.send_exit_signal(c, signal, core_dumped, error_message, lang))
    }

    /// Blocking exit-signal report through out-parameters.
    pub fn blocking_send_exit_signal_ec(
        &mut self,
        signal: &str,
        core_dumped: bool,
        error_message: &str,
        lang: &str,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(
            self.blocking_send_exit_signal(signal, core_dumped, error_message, lang),
            ec,
            ei,
        );
    }

    /// Sends EOF on the channel.
    pub async fn send_eof(&mut self) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| e.channel_send_eof(c)).await
    }

    /// Blocking form of [`send_eof`](Self::send_eof).
    pub fn blocking_send_eof(&mut self) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.channel_send_eof(c))
    }

    /// Blocking EOF send reporting through out-parameters.
    pub fn blocking_send_eof_ec(&mut self, ec: &mut ErrorCode, ei: &mut ErrorInfo) {
        capture(self.blocking_send_eof(), ec, ei);
    }

    /// Opens this channel as an X11 forwarding channel.
    pub async fn open_x11(&mut self, orig_addr: &str, orig_port: u16) -> SshifyResult<()> {
        self.op(Direction::Read, |e, c| {
            e.channel_open_x11(c, orig_addr, orig_port)
        })
        .await
    }

    /// Blocking form of [`open_x11`](Self::open_x11).
    pub fn blocking_open_x11(&mut self, orig_addr: &str, orig_port: u16) -> SshifyResult<()> {
        self.op_blocking(|e, c| e.channel_open_x11(c, orig_addr, orig_port))
    }

    /// Blocking X11 open reporting through out-parameters.
    pub fn blocking_open_x11_ec(
        &mut self,
        orig_addr: &str,
        orig_port: u16,
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) {
        capture(self.blocking_open_x11(orig_addr, orig_port), ec, ei);
    }

    /// Queries the channel's current window size.
    ///
    /// The only catalog member that yields a value on success.
    pub async fn window_size(&mut self) -> SshifyResult<u32> {
        self.op(Direction::Read, |e, c| e.channel_window_size(c)).await
    }

    /// Blocking form of [`window_size`](Self::window_size).
    pub fn blocking_window_size(&mut self) -> SshifyResult<u32> {
        self.op_blocking(|e, c| e.channel_window_size(c))
    }

    /// Blocking window query reporting through out-parameters. Returns 0
    /// on failure.
    pub fn blocking_window_size_ec(&mut self, ec: &mut ErrorCode, ei: &mut ErrorInfo) -> u32 {
        capture(self.blocking_window_size(), ec, ei).unwrap_or(0)
    }
}

/// A channel view fixed to one stream selector.
///
/// Owns nothing; forwards every call to the bound channel with the
/// selector filled in. Obtained from [`Channel::stdout`] /
/// [`Channel::stderr`].
pub struct StreamHalf<'c, E: SshEngine, S: Transport> {
    channel: &'c mut Channel<E, S>,
    stream: Stream,
}

impl<E: SshEngine, S: Transport> StreamHalf<'_, E, S> {
    /// The fixed stream selector of this view.
    pub fn stream(&self) -> Stream {
        self.stream
    }

    /// Reads from the bound stream into `buf`.
    pub async fn read_some(&mut self, buf: &mut [u8]) -> SshifyResult<usize> {
        self.channel.read_some(buf, self.stream).await
    }

    /// Blocking form of [`read_some`](Self::read_some).
    pub fn blocking_read_some(&mut self, buf: &mut [u8]) -> SshifyResult<usize> {
        self.channel.blocking_read_some(buf, self.stream)
    }

    /// Blocking read reporting through out-parameters.
    pub fn blocking_read_some_ec(
        &mut self,
        buf: &mut [u8],
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) -> usize {
        self.channel.blocking_read_some_ec(buf, self.stream, ec, ei)
    }

    /// Writes `buf` to the bound stream.
    pub async fn write_some(&mut self, buf: &[u8]) -> SshifyResult<usize> {
        self.channel.write_some(buf, self.stream).await
    }

    /// Blocking form of [`write_some`](Self::write_some).
    pub fn blocking_write_some(&mut self, buf: &[u8]) -> SshifyResult<usize> {
        self.channel.blocking_write_some(buf, self.stream)
    }

    /// Blocking write reporting through out-parameters.
    pub fn blocking_write_some_ec(
        &mut self,
        buf: &[u8],
        ec: &mut ErrorCode,
        ei: &mut ErrorInfo,
    ) -> usize {
        self.channel.blocking_write_some_ec(buf, self.stream, ec, ei)
    }
}
