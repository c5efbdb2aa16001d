//! Protocol adaptation layer for the sshify ecosystem.
//!
//! This crate adapts native, retry-style protocol engines to the
//! asynchronous readiness scheduler provided by `sshify-platform`:
//!
//! - **SSH** (Secure Shell) - sessions, channels, and server-side
//!   bind/accept over a consumed native engine
//!
//! # Features
//!
//! - `ssh` (default) - SSH adaptation support (client + server side)
//!
//! # Example
//!
//! ```rust,no_run
//! use sshify_proto::ssh::{Session, SshEngine};
//! use std::sync::Arc;
//!
//! async fn connect<E: SshEngine>(engine: Arc<E>) -> sshify_platform::SshifyResult<()> {
//!     let mut session = Session::connect(engine, "203.0.113.5:22").await?;
//!     session.handshake().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(feature = "ssh")]
pub mod ssh;
