//! Scripted engine and transport substitutes shared by the integration
//! tests.
//!
//! The engine follows the native contract the adaptation layer is built
//! against: calls consume per-operation outcome scripts (empty script
//! means immediate success), the most-recent-error state is overwritten on
//! every call, and every allocation/release is recorded so tests can
//! assert exactly-once semantics.

#![allow(dead_code)]

use sshify_platform::{Acceptor, Direction, SocketDescriptor, Transport};
use sshify_proto::ssh::{
    BindOption, BindOptionKind, Outcome, RawChannel, RawListener, RawSession, SshEngine, Stream,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Shared event trace: readiness waits and native-call invocations in
/// program order.
pub type Events = Arc<Mutex<Vec<String>>>;

pub fn new_events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn drain(events: &Events) -> Vec<String> {
    std::mem::take(&mut *events.lock().unwrap())
}

/// A scripted native engine.
///
/// Each `Outcome`-returning call pops its script queue; an exhausted queue
/// yields the operation's natural success value. Popping a `Fault`
/// installs `fault` as the most-recent error; any other pop clears it.
pub struct ScriptedEngine {
    next_token: AtomicU64,
    pub log: Events,
    fault: Mutex<(i32, String)>,
    last_error: Mutex<Option<(i32, String)>>,

    pub handshake_script: Mutex<VecDeque<Outcome>>,
    pub kex_script: Mutex<VecDeque<Outcome>>,
    pub auth_script: Mutex<VecDeque<Outcome>>,
    pub descriptor_script: Mutex<VecDeque<Outcome>>,
    pub open_script: Mutex<VecDeque<Outcome>>,
    pub request_script: Mutex<VecDeque<Outcome>>,
    pub read_script: Mutex<VecDeque<Outcome<Vec<u8>>>>,
    pub write_script: Mutex<VecDeque<Outcome<usize>>>,
    pub window_script: Mutex<VecDeque<Outcome<u32>>>,
    pub listen_script: Mutex<VecDeque<Outcome>>,
    pub accept_script: Mutex<VecDeque<Outcome>>,
    pub promote_script: Mutex<VecDeque<Outcome>>,

    /// Option kinds the listener refuses.
    pub rejected_kinds: Mutex<HashSet<BindOptionKind>>,
    /// Applied options, latest value per kind.
    pub options: Mutex<HashMap<BindOptionKind, String>>,
    /// `true` entries per object token set via the blocking toggles.
    pub blocking: Mutex<HashMap<u64, bool>>,
    /// `(listener, session, descriptor)` promotion records.
    pub promoted: Mutex<Vec<(u64, u64, SocketDescriptor)>>,
    /// Bytes written per stream.
    pub written: Mutex<Vec<(Stream, Vec<u8>)>>,

    pub freed_sessions: Mutex<Vec<u64>>,
    pub freed_channels: Mutex<Vec<u64>>,
    pub freed_listeners: Mutex<Vec<u64>>,
}

impl ScriptedEngine {
    pub fn new(log: Events) -> Arc<Self> {
        Arc::new(Self {
            next_token: AtomicU64::new(1),
            log,
            fault: Mutex::new((-1, "scripted fault".to_string())),
            last_error: Mutex::new(None),
            handshake_script: Mutex::new(VecDeque::new()),
            kex_script: Mutex::new(VecDeque::new()),
            auth_script: Mutex::new(VecDeque::new()),
            descriptor_script: Mutex::new(VecDeque::new()),
            open_script: Mutex::new(VecDeque::new()),
            request_script: Mutex::new(VecDeque::new()),
            read_script: Mutex::new(VecDeque::new()),
            write_script: Mutex::new(VecDeque::new()),
            window_script: Mutex::new(VecDeque::new()),
            listen_script: Mutex::new(VecDeque::new()),
            accept_script: Mutex::new(VecDeque::new()),
            promote_script: Mutex::new(VecDeque::new()),
            rejected_kinds: Mutex::new(HashSet::new()),
            options: Mutex::new(HashMap::new()),
            blocking: Mutex::new(HashMap::new()),
            promoted: Mutex::new(Vec::new()),
            written: Mutex::new(Vec::new()),
            freed_sessions: Mutex::new(Vec::new()),
            freed_channels: Mutex::new(Vec::new()),
            freed_listeners: Mutex::new(Vec::new()),
        })
    }

    /// Sets the error the next `Fault` pop installs.
    pub fn set_fault(&self, code: i32, message: &str) {
        *self.fault.lock().unwrap() = (code, message.to_string());
    }

    pub fn script(&self, queue: &Mutex<VecDeque<Outcome>>, outcomes: &[Outcome]) {
        queue.lock().unwrap().extend(outcomes.iter().copied());
    }

    fn token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::SeqCst)
    }

    fn pop<T>(
        &self,
        queue: &Mutex<VecDeque<Outcome<T>>>,
        name: &str,
        default: impl FnOnce() -> Outcome<T>,
    ) -> Outcome<T> {
        self.log.lock().unwrap().push(name.to_string());
        let outcome = queue.lock().unwrap().pop_front().unwrap_or_else(default);
        // Every call overwrites the most-recent-error state.
        *self.last_error.lock().unwrap() = match outcome {
            Outcome::Fault => Some(self.fault.lock().unwrap().clone()),
            _ => None,
        };
        outcome
    }

    fn current_error(&self) -> (i32, String) {
        self.last_error
            .lock()
            .unwrap()
            .clone()
            .unwrap_or((0, String::new()))
    }
}

impl SshEngine for ScriptedEngine {
    fn new_session(&self) -> RawSession {
        RawSession(self.token())
    }

    fn free_session(&self, session: RawSession) {
        self.freed_sessions.lock().unwrap().push(session.0);
    }

    fn channel_new(&self, _session: RawSession) -> Option<RawChannel> {
        Some(RawChannel(self.token()))
    }

    fn free_channel(&self, channel: RawChannel) {
        self.freed_channels.lock().unwrap().push(channel.0);
    }

    fn new_listener(&self) -> RawListener {
        RawListener(self.token())
    }

    fn free_listener(&self, listener: RawListener) {
        self.freed_listeners.lock().unwrap().push(listener.0);
    }

    fn set_blocking(&self, session: RawSession, blocking: bool) {
        self.blocking.lock().unwrap().insert(session.0, blocking);
    }

    fn set_listener_blocking(&self, listener: RawListener, blocking: bool) {
        self.blocking.lock().unwrap().insert(listener.0, blocking);
    }

    fn session_error(&self, _session: RawSession) -> (i32, String) {
        self.current_error()
    }

    fn listener_error(&self, _listener: RawListener) -> (i32, String) {
        self.current_error()
    }

    fn set_descriptor(&self, _session: RawSession, _descriptor: SocketDescriptor) -> Outcome {
        self.pop(&self.descriptor_script, "set_descriptor", || {
            Outcome::Done(())
        })
    }

    fn handshake(&self, _session: RawSession) -> Outcome {
        self.pop(&self.handshake_script, "handshake", || Outcome::Done(()))
    }

    fn handle_key_exchange(&self, _session: RawSession) -> Outcome {
        self.pop(&self.kex_script, "handle_key_exchange", || Outcome::Done(()))
    }

    fn auth_password(&self, _session: RawSession, _username: &str, _password: &str) -> Outcome {
        self.pop(&self.auth_script, "auth_password", || Outcome::Done(()))
    }

    fn auth_public_key(&self, _session: RawSession, _username: &str, _key: &[u8]) -> Outcome {
        self.pop(&self.auth_script, "auth_public_key", || Outcome::Done(()))
    }

    fn disconnect(&self, _session: RawSession) {
        self.log.lock().unwrap().push("disconnect".to_string());
    }

    fn channel_open_session(&self, _channel: RawChannel) -> Outcome {
        self.pop(&self.open_script, "channel_open_session", || {
            Outcome::Done(())
        })
    }

    fn channel_open_x11(&self, _channel: RawChannel, _orig_addr: &str, _orig_port: u16) -> Outcome {
        self.pop(&self.open_script, "channel_open_x11", || Outcome::Done(()))
    }

    fn channel_read(&self, _channel: RawChannel, buf: &mut [u8], _stream: Stream) -> Outcome<usize> {
        match self.pop(&self.read_script, "channel_read", || {
            Outcome::Done(Vec::new())
        }) {
            Outcome::Done(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Outcome::Done(n)
            }
            Outcome::Again => Outcome::Again,
            Outcome::Fault => Outcome::Fault,
        }
    }

    fn channel_write(&self, _channel: RawChannel, buf: &[u8], stream: Stream) -> Outcome<usize> {
        match self.pop(&self.write_script, "channel_write", || {
            Outcome::Done(buf.len())
        }) {
            Outcome::Done(n) => {
                self.written.lock().unwrap().push((stream, buf[..n].to_vec()));
                Outcome::Done(n)
            }
            other => other,
        }
    }

    fn channel_send_eof(&self, _channel: RawChannel) -> Outcome {
        self.pop(&self.request_script, "channel_send_eof", || Outcome::Done(()))
    }

    fn channel_window_size(&self, _channel: RawChannel) -> Outcome<u32> {
        self.pop(&self.window_script, "channel_window_size", || {
            Outcome::Done(0)
        })
    }

    fn request_env(&self, _channel: RawChannel, name: &str, value: &str) -> Outcome {
        self.pop(&self.request_script, &format!("request_env({}={})", name, value), || {
            Outcome::Done(())
        })
    }

    fn request_exec(&self, _channel: RawChannel, command: &str) -> Outcome {
        self.pop(&self.request_script, &format!("request_exec({})", command), || {
            Outcome::Done(())
        })
    }

    fn request_pty(&self, _channel: RawChannel) -> Outcome {
        self.pop(&self.request_script, "request_pty", || Outcome::Done(()))
    }

    fn request_pty_size(
        &self,
        _channel: RawChannel,
        _term: &str,
        _columns: u32,
        _rows: u32,
    ) -> Outcome {
        self.pop(&self.request_script, "request_pty_size", || Outcome::Done(()))
    }

    fn request_shell(&self, _channel: RawChannel) -> Outcome {
        self.pop(&self.request_script, "request_shell", || Outcome::Done(()))
    }

    fn request_subsystem(&self, _channel: RawChannel, name: &str) -> Outcome {
        self.pop(
            &self.request_script,
            &format!("request_subsystem({})", name),
            || Outcome::Done(()),
        )
    }

    fn request_x11(
        &self,
        _channel: RawChannel,
        _single_connection: bool,
        _protocol: &str,
        _cookie: &str,
        _screen: u32,
    ) -> Outcome {
        self.pop(&self.request_script, "request_x11", || Outcome::Done(()))
    }

    fn request_auth_agent(&self, _channel: RawChannel) -> Outcome {
        self.pop(&self.request_script, "request_auth_agent", || {
            Outcome::Done(())
        })
    }

    fn send_break(&self, _channel: RawChannel, _length_ms: u32) -> Outcome {
        self.pop(&self.request_script, "send_break", || Outcome::Done(()))
    }

    fn send_signal(&self, _channel: RawChannel, signal: &str) -> Outcome {
        self.pop(
            &self.request_script,
            &format!("send_signal({})", signal),
            || Outcome::Done(()),
        )
    }

    fn send_exit_status(&self, _channel: RawChannel, status: i32) -> Outcome {
        self.pop(
            &self.request_script,
            &format!("send_exit_status({})", status),
            || Outcome::Done(()),
        )
    }

    fn send_exit_signal(
        &self,
        _channel: RawChannel,
        _signal: &str,
        _core_dumped: bool,
        _error_message: &str,
        _lang: &str,
    ) -> Outcome {
        self.pop(&self.request_script, "send_exit_signal", || Outcome::Done(()))
    }

    fn listener_set_option(&self, _listener: RawListener, option: &BindOption) -> bool {
        let kind = option.kind();
        if self.rejected_kinds.lock().unwrap().contains(&kind) {
            *self.last_error.lock().unwrap() =
                Some((-4, format!("option {:?} not supported", kind)));
            return false;
        }
        *self.last_error.lock().unwrap() = None;
        self.options.lock().unwrap().insert(kind, format!("{:?}", option));
        true
    }

    fn listener_listen(&self, _listener: RawListener) -> Outcome {
        self.pop(&self.listen_script, "listener_listen", || Outcome::Done(()))
    }

    fn listener_accept(&self, _listener: RawListener, _session: RawSession) -> Outcome {
        self.pop(&self.accept_script, "listener_accept", || Outcome::Done(()))
    }

    fn listener_accept_descriptor(
        &self,
        listener: RawListener,
        session: RawSession,
        descriptor: SocketDescriptor,
    ) -> Outcome {
        let outcome = self.pop(&self.promote_script, "listener_accept_descriptor", || {
            Outcome::Done(())
        });
        if let Outcome::Done(()) = outcome {
            self.promoted
                .lock()
                .unwrap()
                .push((listener.0, session.0, descriptor));
        }
        outcome
    }
}

/// Transport substitute with scripted readiness results.
///
/// An exhausted script reports immediate readiness.
pub struct ScriptedTransport {
    pub readiness: Mutex<VecDeque<io::Result<()>>>,
    pub log: Events,
    pub fd: SocketDescriptor,
}

impl ScriptedTransport {
    pub fn new(log: Events, fd: SocketDescriptor) -> Self {
        Self {
            readiness: Mutex::new(VecDeque::new()),
            log,
            fd,
        }
    }

    pub fn with_readiness(log: Events, fd: SocketDescriptor, results: Vec<io::Result<()>>) -> Self {
        Self {
            readiness: Mutex::new(results.into()),
            log,
            fd,
        }
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn ready(&self, direction: Direction) -> io::Result<()> {
        let tag = match direction {
            Direction::Read => "wait-read",
            Direction::Write => "wait-write",
        };
        self.log.lock().unwrap().push(tag.to_string());
        self.readiness.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    fn descriptor(&self) -> SocketDescriptor {
        self.fd
    }
}

/// Acceptor substitute yielding a scripted sequence of connections.
pub struct ScriptedAcceptor {
    pub conns: Mutex<VecDeque<io::Result<ScriptedTransport>>>,
}

impl ScriptedAcceptor {
    pub fn new(conns: Vec<io::Result<ScriptedTransport>>) -> Self {
        Self {
            conns: Mutex::new(conns.into()),
        }
    }
}

#[async_trait::async_trait]
impl Acceptor for ScriptedAcceptor {
    type Conn = ScriptedTransport;

    async fn accept(&self) -> io::Result<ScriptedTransport> {
        self.conns.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "no scripted connection",
            ))
        })
    }
}
