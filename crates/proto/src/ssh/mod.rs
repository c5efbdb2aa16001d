//! Scheduler-aware adaptation of a native SSH protocol engine.
//!
//! The wire protocol itself lives in an external engine consumed through
//! the [`SshEngine`] trait; this module turns the engine's retry-style
//! native calls (success / hard error / would-block) into single
//! completions against a readiness scheduler.
//!
//! # Architecture
//!
//! 1. **Engine seam** ([`engine`]) - the consumed native-call catalog,
//!    opaque object tokens, the tri-state [`Outcome`]
//! 2. **Ownership** ([`handle`]) - exactly-once release of native objects
//! 3. **Adaptation core** (private) - the generic suspend/retry loop
//!    shared by every operation
//! 4. **Sessions** ([`session`]) - connect, handshake, authentication
//! 5. **Channels** ([`channel`]) - data transfer, the remote-request
//!    catalog, per-stream views
//! 6. **Server side** ([`bind`]) - listener configuration and the two
//!    accept flows
//! 7. **Error surface** ([`error`]) - the out-parameter reporting
//!    convention alongside `Result`
//!
//! # Example
//!
//! ```rust,no_run
//! use sshify_proto::ssh::{Session, SshEngine, Stream};
//! use std::sync::Arc;
//!
//! async fn run<E: SshEngine>(engine: Arc<E>) -> sshify_platform::SshifyResult<()> {
//!     let mut session = Session::connect(engine, "203.0.113.5:22").await?;
//!     session.handshake().await?;
//!     session.auth_password("user", "secret").await?;
//!
//!     let mut channel = session.open_channel().await?;
//!     channel.request_exec("uname -a").await?;
//!     let mut buf = [0u8; 4096];
//!     let n = channel.read_some(&mut buf, Stream::Stdout).await?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!     Ok(())
//! }
//! ```

mod adapter;
pub mod bind;
pub mod channel;
pub mod engine;
pub mod error;
pub mod handle;
pub mod session;

pub use bind::{BindListener, BindOption, BindOptionKind};
pub use channel::{Channel, StreamHalf};
pub use engine::{Outcome, RawChannel, RawListener, RawSession, SshEngine, Stream};
pub use error::{capture, ErrorCategory, ErrorCode, ErrorInfo};
pub use handle::{NativeHandle, NativeRaw};
pub use session::Session;
