//! Deferred producers
//!
//! A [`Lazy`] wraps a zero-argument producer that the chart invokes while
//! synthesizing, after every builder-time mutation has happened. Nothing is
//! computed at construction.

use std::fmt;

use crate::error::BoxError;

type Producer<T> = Box<dyn Fn() -> Result<T, BoxError>>;

/// A value computed on demand by a producer function.
///
/// The producer is not memoized: each synthesis pass calls [`Lazy::produce`]
/// once, so it must be a pure function of the state it reads.
pub struct Lazy<T> {
    producer: Producer<T>,
}

impl<T> Lazy<T> {
    /// Wrap a producer without invoking it
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + 'static,
    {
        Self {
            producer: Box::new(producer),
        }
    }

    /// Invoke the producer
    pub fn produce(&self) -> Result<T, BoxError> {
        (self.producer)()
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn producer_is_not_invoked_at_construction() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let lazy = Lazy::new(move || {
            counter.set(counter.get() + 1);
            Ok(42)
        });

        assert_eq!(calls.get(), 0);
        assert_eq!(lazy.produce().unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn producer_sees_state_mutated_after_construction() {
        let state = Rc::new(Cell::new(1));
        let reader = state.clone();
        let lazy = Lazy::new(move || Ok(reader.get() * 10));

        state.set(5);
        assert_eq!(lazy.produce().unwrap(), 50);
    }

    #[test]
    fn producer_errors_are_returned() {
        let lazy: Lazy<u32> = Lazy::new(|| Err("boom".into()));
        assert_eq!(lazy.produce().unwrap_err().to_string(), "boom");
    }
}
