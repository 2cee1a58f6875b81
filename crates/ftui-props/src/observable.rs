#![forbid(unsafe_code)]

//! The observable capability.
//!
//! [`Observable`] is identity plus invalidation listeners, nothing else.
//! [`ObservableValue`] adds a current value and change listeners. Both traits
//! are object safe: listeners receive `&dyn Observable` /
//! `&dyn ObservableValue<Value = T>` and bound properties hold their source as
//! `Rc<dyn ObservableValue<Value = T>>`.

use std::fmt;

use crate::listener::{ChangeListener, InvalidationListener};

/// Identity of an observable.
///
/// Two handles share an id iff they refer to the same underlying state. Ids are
/// stable for as long as any strong or weak handle to that state exists.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservableId(usize);

impl ObservableId {
    /// Derive an id from the address of shared state.
    pub(crate) fn of<T: ?Sized>(shared: *const T) -> Self {
        Self(shared.cast::<()>() as usize)
    }
}

impl fmt::Debug for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObservableId({:#x})", self.0)
    }
}

/// Something listeners can attach to in order to learn about invalidation.
pub trait Observable {
    /// Identity used for self-binding checks and binding pair keys.
    fn observable_id(&self) -> ObservableId;

    /// Register an invalidation listener. Registering a listener that is
    /// already present is a no-op.
    fn add_listener(&self, listener: &InvalidationListener);

    /// Remove an invalidation listener. Removing an unknown listener is a no-op.
    fn remove_listener(&self, listener: &InvalidationListener);

    /// Whether this observable mirrors `id`, directly or through a chain of
    /// bound sources. Observables that never mirror anything keep the default.
    fn mirrors(&self, _id: ObservableId) -> bool {
        false
    }
}

/// An [`Observable`] that also exposes a current value.
pub trait ObservableValue: Observable {
    /// Payload type.
    type Value;

    /// Current value.
    fn value(&self) -> Self::Value;

    /// Register a change listener. Registering a listener that is already
    /// present is a no-op.
    fn add_change_listener(&self, listener: &ChangeListener<Self::Value>);

    /// Remove a change listener. Removing an unknown listener is a no-op.
    fn remove_change_listener(&self, listener: &ChangeListener<Self::Value>);
}
