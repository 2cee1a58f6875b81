#![forbid(unsafe_code)]

//! Lifecycle helpers: RAII subscriptions and listener scopes.
//!
//! # Usage
//!
//! ```
//! use ftui_props::{IntegerProperty, InvalidationListener, ListenerScope};
//!
//! let model = IntegerProperty::new(0);
//! let view = IntegerProperty::new(0);
//! let mut scope = ListenerScope::new();
//!
//! scope
//!     .subscribe(&model, &InvalidationListener::infallible(|_| {}))
//!     .bind_bidirectional(&view, &model)?;
//! assert_eq!(scope.len(), 2);
//!
//! drop(scope);
//! assert_eq!(model.invalidation_listener_count(), 0);
//! # Ok::<(), ftui_props::PropertyError>(())
//! ```
//!
//! # Invariants
//!
//! 1. Subscriptions are released in reverse registration order on drop.
//! 2. After drop, no listener registered through the scope fires.
//! 3. `clear()` releases everything immediately and leaves the scope reusable.
//! 4. Neither a [`Subscription`] nor a scope keeps a property alive.

use std::fmt;

use crate::bidirectional;
use crate::error::PropertyError;
use crate::listener::{ChangeListener, InvalidationListener};
use crate::observable::ObservableValue;
use crate::property::{Property, PropertyArg};
use crate::value::PropertyValue;

/// RAII guard that undoes a registration when dropped.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Release now. Equivalent to dropping the guard.
    pub fn release(mut self) {
        self.run();
    }

    /// Keep the registration for the rest of the property's life.
    pub fn forget(mut self) {
        self.release = None;
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.release.is_some())
            .finish()
    }
}

/// Collects subscriptions and bindings for a logical scope (e.g., a widget).
///
/// When the scope is dropped, every registration made through it is undone.
#[derive(Default)]
pub struct ListenerScope {
    subscriptions: Vec<Subscription>,
}

impl ListenerScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `subscription` alive until the scope is dropped or cleared.
    pub fn hold(&mut self, subscription: Subscription) -> &mut Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Register an invalidation listener on `property` within this scope.
    pub fn subscribe<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
        listener: &InvalidationListener,
    ) -> &mut Self {
        self.hold(property.subscribe(listener))
    }

    /// Register a change listener on `property` within this scope.
    pub fn subscribe_change<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
        listener: &ChangeListener<T>,
    ) -> &mut Self {
        self.hold(property.subscribe_change(listener))
    }

    /// Bind `target` to `source` for the lifetime of this scope.
    ///
    /// # Errors
    ///
    /// Same as [`Property::bind`]. Nothing is held on `NullArgument` or
    /// `BindingCycle`.
    pub fn bind<T, S>(&mut self, target: &Property<T>, source: S) -> Result<&mut Self, PropertyError>
    where
        T: PropertyValue,
        S: PropertyArg,
        S::Target: ObservableValue<Value = T> + 'static,
    {
        let result = target.bind(source);
        if !matches!(
            result,
            Err(PropertyError::NullArgument { .. } | PropertyError::BindingCycle { .. })
        ) {
            let weak = target.downgrade();
            self.hold(Subscription::new(move || {
                if let Some(target) = weak.upgrade() {
                    target.unbind();
                }
            }));
        }
        result.map(|()| self)
    }

    /// Bidirectionally bind `a` and `b` for the lifetime of this scope.
    ///
    /// # Errors
    ///
    /// Same as [`bidirectional::bind_bidirectional`]; nothing is held then.
    pub fn bind_bidirectional<T, A, B>(&mut self, a: A, b: B) -> Result<&mut Self, PropertyError>
    where
        T: PropertyValue,
        A: PropertyArg<Target = Property<T>>,
        B: PropertyArg<Target = Property<T>>,
    {
        let binding = bidirectional::bind_bidirectional(a, b)?;
        Ok(self.hold(binding.into_subscription()))
    }

    /// Number of registrations held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release everything now, newest first.
    pub fn clear(&mut self) {
        while let Some(subscription) = self.subscriptions.pop() {
            drop(subscription);
        }
    }
}

impl Drop for ListenerScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for ListenerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerScope")
            .field("len", &self.subscriptions.len())
            .finish()
    }
}
