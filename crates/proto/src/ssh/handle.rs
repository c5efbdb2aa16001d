//! Exclusive ownership of native engine objects.
//!
//! Every native object the engine hands out (session, channel, listener)
//! is owned by exactly one [`NativeHandle`] at any time. The handle frees
//! the object exactly once, on drop, unless ownership was relinquished
//! with [`release`](NativeHandle::release) first. This is a structural
//! primitive, not a fallible operation.

use std::sync::Arc;

/// A raw native object that knows its engine release call.
pub trait NativeRaw<E>: Copy {
    /// Releases this object through `engine`.
    fn free(self, engine: &E);
}

/// Exclusive-ownership wrapper around one native engine object.
///
/// Move-only; a moved-from or released handle is empty and contributes no
/// further release. Dropping an empty handle is a no-op.
pub struct NativeHandle<E, R: NativeRaw<E>> {
    engine: Arc<E>,
    raw: Option<R>,
}

impl<E, R: NativeRaw<E>> NativeHandle<E, R> {
    /// Takes ownership of `raw`.
    pub fn new(engine: Arc<E>, raw: R) -> Self {
        Self {
            engine,
            raw: Some(raw),
        }
    }

    /// Creates an empty handle.
    pub fn empty(engine: Arc<E>) -> Self {
        Self { engine, raw: None }
    }

    /// Returns the owned raw object, if any, without transferring
    /// ownership.
    pub fn get(&self) -> Option<R> {
        self.raw
    }

    /// Returns `true` if no object is owned.
    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    /// Relinquishes ownership and returns the raw object without invoking
    /// the engine's release call. The handle is empty afterwards.
    pub fn release(&mut self) -> Option<R> {
        self.raw.take()
    }

    /// Releases the currently owned object (if any) and takes ownership
    /// of `raw`.
    pub fn reset(&mut self, raw: Option<R>) {
        if let Some(old) = self.raw.take() {
            old.free(&self.engine);
        }
        self.raw = raw;
    }
}

impl<E, R: NativeRaw<E>> Drop for NativeHandle<E, R> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            raw.free(&self.engine);
        }
    }
}

impl<E, R: NativeRaw<E> + std::fmt::Debug> std::fmt::Debug for NativeHandle<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHandle").field("raw", &self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every release so tests can assert exactly-once semantics.
    #[derive(Default)]
    struct Recorder {
        freed: Mutex<Vec<u32>>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Token(u32);

    impl NativeRaw<Recorder> for Token {
        fn free(self, engine: &Recorder) {
            engine.freed.lock().unwrap().push(self.0);
        }
    }

    #[test]
    fn test_drop_frees_exactly_once() {
        let engine = Arc::new(Recorder::default());
        {
            let handle = NativeHandle::new(Arc::clone(&engine), Token(1));
            assert_eq!(handle.get(), Some(Token(1)));
        }
        assert_eq!(*engine.freed.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_release_prevents_free() {
        let engine = Arc::new(Recorder::default());
        let mut handle = NativeHandle::new(Arc::clone(&engine), Token(2));
        assert_eq!(handle.release(), Some(Token(2)));
        assert!(handle.is_empty());
        assert_eq!(handle.release(), None);
        drop(handle);
        assert!(engine.freed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reset_frees_previous_owner() {
        let engine = Arc::new(Recorder::default());
        let mut handle = NativeHandle::new(Arc::clone(&engine), Token(3));
        handle.reset(Some(Token(4)));
        assert_eq!(*engine.freed.lock().unwrap(), vec![3]);
        drop(handle);
        assert_eq!(*engine.freed.lock().unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_empty_handle_is_a_no_op() {
        let engine = Arc::new(Recorder::default());
        let handle: NativeHandle<Recorder, Token> = NativeHandle::empty(Arc::clone(&engine));
        drop(handle);
        assert!(engine.freed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_move_does_not_duplicate_release() {
        let engine = Arc::new(Recorder::default());
        let handle = NativeHandle::new(Arc::clone(&engine), Token(5));

        // Move through a container and back out again.
        let mut holder = Vec::new();
        holder.push(handle);
        let handle = holder.pop().unwrap();
        drop(holder);
        assert!(engine.freed.lock().unwrap().is_empty());

        drop(handle);
        assert_eq!(*engine.freed.lock().unwrap(), vec![5]);
    }
}
