//! The generic suspend/retry state machine.
//!
//! Every protocol action in this crate - handshake, authentication,
//! channel open/read/write/request, listener accept - is one native call
//! with a tri-state outcome, adapted into a single completion. Two drive
//! modes share the classification logic:
//!
//! - [`drive_scheduled`] suspends against the transport between attempts:
//!   `register interest -> suspend -> invoke once -> classify`, looping
//!   back to the suspension on [`Outcome::Again`].
//! - [`drive_blocking`] never suspends; the caller puts the engine object
//!   into blocking mode first, under which `Again` cannot occur by the
//!   native contract (a misbehaving engine merely spins).
//!
//! There is no retry limit: the loop ends only on success, hard error, or
//! a transport failure. Cancellation is not a distinct primitive - closing
//! the transport while suspended makes the next readiness signal carry a
//! transport failure, which becomes the completion. Exactly one completion
//! is produced per started operation, and the native call runs at most
//! once per readiness signal.

use crate::ssh::engine::Outcome;
use sshify_platform::{Direction, SshifyError, SshifyResult, Transport};

/// Drives one native call to completion under the readiness scheduler.
///
/// `call` is the wrapped native call; `fault` queries the owning object's
/// most-recent error and runs immediately when the call reports
/// [`Outcome::Fault`], before anything else can overwrite that state. A
/// failure reported by the readiness wait itself completes the operation
/// without ever invoking `call`.
pub(crate) async fn drive_scheduled<T, S, C, Q>(
    transport: &S,
    direction: Direction,
    mut call: C,
    fault: Q,
) -> SshifyResult<T>
where
    S: Transport + ?Sized,
    C: FnMut() -> Outcome<T>,
    Q: FnOnce() -> (i32, String),
{
    loop {
        transport.ready(direction).await.map_err(SshifyError::Io)?;
        match call() {
            Outcome::Done(value) => return Ok(value),
            Outcome::Again => continue,
            Outcome::Fault => {
                let (code, message) = fault();
                return Err(SshifyError::Engine { code, message });
            }
        }
    }
}

/// Drives one native call to completion without suspending.
///
/// Identical classification to [`drive_scheduled`]; the caller must have
/// put the engine object into blocking mode first.
pub(crate) fn drive_blocking<T, C, Q>(mut call: C, fault: Q) -> SshifyResult<T>
where
    C: FnMut() -> Outcome<T>,
    Q: FnOnce() -> (i32, String),
{
    loop {
        match call() {
            Outcome::Done(value) => return Ok(value),
            Outcome::Again => continue,
            Outcome::Fault => {
                let (code, message) = fault();
                return Err(SshifyError::Engine { code, message });
            }
        }
    }
}
