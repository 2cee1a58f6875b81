#![forbid(unsafe_code)]

//! Listener handles and the insertion-ordered listener sets properties keep.
//!
//! # Identity
//!
//! Every listener carries a [`ListenerKey`]. Listener sets never hold two
//! entries with the same key, and removal is by key:
//!
//! - closure listeners are keyed by their handle allocation, so clones of one
//!   [`InvalidationListener`] are the same listener;
//! - the mirror listener of a unidirectional binding is keyed by its target;
//! - a bidirectional binding is keyed by the unordered pair it links, which is
//!   what lets `unbind(b, a)` find the listener installed by `bind(a, b)`.
//!
//! # Failure Modes
//!
//! - **Listener error**: callbacks return `Result`. The first error stops the
//!   notification of the property that was changing and propagates to the
//!   caller of `set()`.
//! - **Stale listener**: listeners whose target was dropped report themselves
//!   stale and are pruned lazily the next time the list is snapshotted.

use std::fmt;
use std::rc::Rc;

use crate::error::PropertyError;
use crate::observable::{Observable, ObservableId, ObservableValue};

pub(crate) type ListenerResult = Result<(), PropertyError>;

type ChangeFn<T> = dyn Fn(&dyn ObservableValue<Value = T>, &T, &T) -> ListenerResult;

/// Unordered pair of observables linked by a bidirectional binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PairKey {
    low: ObservableId,
    high: ObservableId,
}

impl PairKey {
    pub(crate) fn new(a: ObservableId, b: ObservableId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ListenerKey {
    Callback(usize),
    Mirror(ObservableId),
    Pair(PairKey),
}

/// Receiver side of an invalidation listener.
pub(crate) trait InvalidationHandler {
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult;

    /// Whether the handler can never do useful work again.
    fn is_stale(&self) -> bool {
        false
    }
}

struct FnInvalidation<F>(F);

impl<F> InvalidationHandler for FnInvalidation<F>
where
    F: Fn(&dyn Observable) -> ListenerResult,
{
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult {
        (self.0)(observable)
    }
}

/// Callback fired once per effective value change, without payload.
///
/// Cloning yields a handle to the same listener; clones are interchangeable
/// for `add_listener` / `remove_listener`.
#[derive(Clone)]
pub struct InvalidationListener {
    handler: Rc<dyn InvalidationHandler>,
    key: ListenerKey,
}

impl InvalidationListener {
    /// Wrap a fallible callback.
    pub fn new(callback: impl Fn(&dyn Observable) -> Result<(), PropertyError> + 'static) -> Self {
        let handler: Rc<dyn InvalidationHandler> = Rc::new(FnInvalidation(callback));
        let key = ListenerKey::Callback(Rc::as_ptr(&handler).cast::<()>() as usize);
        Self { handler, key }
    }

    /// Wrap a callback that cannot fail.
    pub fn infallible(callback: impl Fn(&dyn Observable) + 'static) -> Self {
        Self::new(move |observable| {
            callback(observable);
            Ok(())
        })
    }

    pub(crate) fn from_handler(handler: Rc<dyn InvalidationHandler>, key: ListenerKey) -> Self {
        Self { handler, key }
    }

    pub(crate) fn key(&self) -> ListenerKey {
        self.key
    }

    pub(crate) fn invalidated(&self, observable: &dyn Observable) -> ListenerResult {
        self.handler.invalidated(observable)
    }
}

impl PartialEq for InvalidationListener {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for InvalidationListener {}

impl fmt::Debug for InvalidationListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationListener")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Callback fired once per effective value change with `(observable, old, new)`.
pub struct ChangeListener<T> {
    callback: Rc<ChangeFn<T>>,
    key: ListenerKey,
}

impl<T: 'static> ChangeListener<T> {
    /// Wrap a fallible callback.
    pub fn new(
        callback: impl Fn(&dyn ObservableValue<Value = T>, &T, &T) -> Result<(), PropertyError>
        + 'static,
    ) -> Self {
        let callback: Rc<ChangeFn<T>> = Rc::new(callback);
        let key = ListenerKey::Callback(Rc::as_ptr(&callback).cast::<()>() as usize);
        Self { callback, key }
    }

    /// Wrap a callback that only looks at the old and new values.
    pub fn infallible(callback: impl Fn(&T, &T) + 'static) -> Self {
        Self::new(move |_, old, new| {
            callback(old, new);
            Ok(())
        })
    }

    pub(crate) fn changed(
        &self,
        observable: &dyn ObservableValue<Value = T>,
        old: &T,
        new: &T,
    ) -> ListenerResult {
        (self.callback)(observable, old, new)
    }
}

impl<T> ChangeListener<T> {
    pub(crate) fn key(&self) -> ListenerKey {
        self.key
    }
}

impl<T> Clone for ChangeListener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
            key: self.key,
        }
    }
}

impl<T> PartialEq for ChangeListener<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for ChangeListener<T> {}

impl<T> fmt::Debug for ChangeListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeListener")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Entry type stored in a [`ListenerList`].
pub(crate) trait Keyed: Clone {
    fn listener_key(&self) -> ListenerKey;

    fn is_stale(&self) -> bool {
        false
    }
}

impl Keyed for InvalidationListener {
    fn listener_key(&self) -> ListenerKey {
        self.key
    }

    fn is_stale(&self) -> bool {
        self.handler.is_stale()
    }
}

impl<T> Keyed for ChangeListener<T> {
    fn listener_key(&self) -> ListenerKey {
        self.key
    }
}

/// Insertion-ordered listener set, unique by key.
pub(crate) struct ListenerList<L> {
    entries: Vec<L>,
}

impl<L: Keyed> ListenerList<L> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append `listener` unless one with the same key is present.
    pub(crate) fn add(&mut self, listener: L) -> bool {
        if self.contains(listener.listener_key()) {
            return false;
        }
        self.entries.push(listener);
        true
    }

    /// Remove the listener with `key`. Unknown keys are ignored.
    pub(crate) fn remove(&mut self, key: ListenerKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.listener_key() != key);
        self.entries.len() != before
    }

    pub(crate) fn contains(&self, key: ListenerKey) -> bool {
        self.entries.iter().any(|entry| entry.listener_key() == key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Prune stale entries and clone the rest in registration order, so the
    /// caller can dispatch without holding a borrow on the owner.
    pub(crate) fn snapshot(&mut self) -> Vec<L> {
        self.entries.retain(|entry| !entry.is_stale());
        self.entries.clone()
    }
}
