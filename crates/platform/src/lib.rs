//! # Sshify Platform
//!
//! Core platform types and traits for the sshify ecosystem.
//!
//! This crate provides:
//! - Unified error types (`SshifyError`, `SshifyResult`)
//! - Transport traits (`Transport`, `Acceptor`, `Direction`) with tokio
//!   implementations
//!
//! # Examples
//!
//! ```
//! use sshify_platform::{SshifyError, SshifyResult};
//!
//! fn example_function() -> SshifyResult<String> {
//!     Ok("Hello, sshify!".to_string())
//! }
//!
//! # fn main() -> SshifyResult<()> {
//! let result = example_function()?;
//! assert_eq!(result, "Hello, sshify!");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;

pub use error::{SshifyError, SshifyResult};
pub use traits::{Acceptor, Direction, SocketDescriptor, Transport};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
