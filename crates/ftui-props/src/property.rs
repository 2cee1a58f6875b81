#![forbid(unsafe_code)]

//! Observable property with direct and bound mutation.
//!
//! # Design
//!
//! [`Property<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). Cloning a property yields another handle to the
//! same state; identity is the shared allocation.
//!
//! A property is either *free* (`set()` stores values) or *bound* to a source
//! [`ObservableValue`] (`set()` fails and the value mirrors the source). The
//! mirror listener installed on the source only holds a weak reference to its
//! target, so a bound property can be dropped without unbinding first.
//!
//! # Invariants
//!
//! 1. `set(v)` where `v` is the same value as the current one fires nothing.
//! 2. Invalidation listeners fire before change listeners, each kind in
//!    registration order.
//! 3. `set()` on a bound property always fails with
//!    [`PropertyError::BoundMutation`] and leaves the value unchanged.
//! 4. After a bound source notifies, the target holds the source value before
//!    the source's `set()` returns.
//!
//! # Failure Modes
//!
//! - **Binding cycle**: a source that already mirrors the target (or the
//!   target itself) is rejected, so bound sources never form a reference
//!   cycle.
//! - **Listener error**: notification of this property stops at the first
//!   failing listener and the error is returned from `set()`. The new value
//!   stays stored.
//! - **Re-entrant writes**: no borrow is held while listeners run, so a
//!   listener may read or write any property, including this one.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::PropertyError;
use crate::listener::{
    ChangeListener, InvalidationHandler, InvalidationListener, ListenerKey, ListenerList,
    ListenerResult,
};
use crate::observable::{Observable, ObservableId, ObservableValue};
use crate::scope::Subscription;
use crate::value::PropertyValue;

/// A source this property mirrors while bound.
struct BoundSource<T> {
    source: Rc<dyn ObservableValue<Value = T>>,
    listener: InvalidationListener,
}

/// Shared interior for [`Property<T>`].
struct PropertyInner<T> {
    value: T,
    invalidation: ListenerList<InvalidationListener>,
    change: ListenerList<ChangeListener<T>>,
    bound: Option<BoundSource<T>>,
    bean: Option<Weak<dyn Any>>,
    name: String,
}

/// A shared, observable value cell.
///
/// # Example
///
/// ```
/// use ftui_props::{IntegerProperty, PropertyError};
///
/// let width = IntegerProperty::new(80).with_name("width");
/// let source = IntegerProperty::new(120);
///
/// width.bind(&source)?;
/// assert_eq!(width.get(), 120);
///
/// source.set(100)?;
/// assert_eq!(width.get(), 100);
/// assert!(matches!(width.set(1), Err(PropertyError::BoundMutation { .. })));
///
/// width.unbind();
/// width.set(1)?;
/// assert_eq!(source.get(), 100);
/// # Ok::<(), PropertyError>(())
/// ```
pub struct Property<T> {
    inner: Rc<RefCell<PropertyInner<T>>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: PropertyValue> Property<T> {
    /// Create a free property holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PropertyInner {
                value,
                invalidation: ListenerList::new(),
                change: ListenerList::new(),
                bound: None,
                bean: None,
                name: String::new(),
            })),
        }
    }

    /// Attach a diagnostic name.
    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.inner.borrow_mut().name = name.into();
        self
    }

    /// Attach an owner. Only a weak reference is kept.
    #[must_use]
    pub fn with_bean<B: Any>(self, bean: &Rc<B>) -> Self {
        let bean: Weak<B> = Rc::downgrade(bean);
        let bean: Weak<dyn Any> = bean;
        self.inner.borrow_mut().bean = Some(bean);
        self
    }

    /// Diagnostic name, empty when unnamed.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Owner of this property, if one was attached and is still alive.
    #[must_use]
    pub fn bean(&self) -> Option<Rc<dyn Any>> {
        self.inner.borrow().bean.as_ref().and_then(Weak::upgrade)
    }

    /// Identity of this property.
    #[must_use]
    pub fn id(&self) -> ObservableId {
        ObservableId::of(Rc::as_ptr(&self.inner))
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Store a new value and notify listeners if it differs from the current
    /// one.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::BoundMutation`] if the property is bound.
    /// - Any error returned by a listener, including binding failures raised
    ///   by bidirectional bindings attached to this property.
    pub fn set(&self, value: T) -> Result<(), PropertyError> {
        if self.is_bound() {
            tracing::trace!(property = %self, "rejected set on bound property");
            return Err(PropertyError::BoundMutation {
                property: self.to_string(),
            });
        }
        self.store(value)
    }

    /// Whether the property currently mirrors a source.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.borrow().bound.is_some()
    }

    /// Mirror `source` until [`unbind`](Self::unbind) is called.
    ///
    /// The current source value is pulled immediately. Binding again to the
    /// same source is a no-op; binding to a different source replaces the
    /// previous binding.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::NullArgument`] if `source` is absent.
    /// - [`PropertyError::BindingCycle`] if `source` is this property or
    ///   already mirrors it. The previous binding, if any, is kept.
    /// - Any listener error raised while pulling the initial value. The
    ///   binding stays installed in that case.
    pub fn bind<S>(&self, source: S) -> Result<(), PropertyError>
    where
        S: PropertyArg,
        S::Target: ObservableValue<Value = T> + 'static,
    {
        let source = source.resolve("source")?;
        let source_id = source.observable_id();
        if self.bound_source_id() == Some(source_id) {
            return Ok(());
        }
        if source_id == self.id() || source.mirrors(self.id()) {
            return Err(PropertyError::BindingCycle {
                property: self.to_string(),
            });
        }
        self.unbind();

        let source: Rc<dyn ObservableValue<Value = T>> = Rc::new(source);
        let mirror: Rc<dyn InvalidationHandler> = Rc::new(Mirror {
            target: Rc::downgrade(&self.inner),
        });
        let listener = InvalidationListener::from_handler(mirror, ListenerKey::Mirror(self.id()));
        source.add_listener(&listener);
        self.inner.borrow_mut().bound = Some(BoundSource { source, listener });
        tracing::trace!(property = %self, source = ?source_id, "bound to source");

        self.pull_from_source()
    }

    /// Stop mirroring the bound source. The last mirrored value is kept.
    /// No-op when not bound.
    pub fn unbind(&self) {
        let bound = self.inner.borrow_mut().bound.take();
        if let Some(bound) = bound {
            bound.source.remove_listener(&bound.listener);
            tracing::trace!(property = %self, "unbound from source");
        }
    }

    /// Register an invalidation listener.
    pub fn add_listener(&self, listener: &InvalidationListener) {
        self.inner.borrow_mut().invalidation.add(listener.clone());
    }

    /// Remove an invalidation listener; unknown listeners are ignored.
    pub fn remove_listener(&self, listener: &InvalidationListener) {
        self.remove_listener_key(listener.key());
    }

    /// Register a change listener.
    pub fn add_change_listener(&self, listener: &ChangeListener<T>) {
        self.inner.borrow_mut().change.add(listener.clone());
    }

    /// Remove a change listener; unknown listeners are ignored.
    pub fn remove_change_listener(&self, listener: &ChangeListener<T>) {
        self.inner.borrow_mut().change.remove(listener.key());
    }

    /// Register `listener` and return a guard that removes it on drop.
    pub fn subscribe(&self, listener: &InvalidationListener) -> Subscription {
        self.add_listener(listener);
        let weak = self.downgrade();
        let listener = listener.clone();
        Subscription::new(move || {
            if let Some(property) = weak.upgrade() {
                property.remove_listener(&listener);
            }
        })
    }

    /// Register a change `listener` and return a guard that removes it on drop.
    pub fn subscribe_change(&self, listener: &ChangeListener<T>) -> Subscription {
        self.add_change_listener(listener);
        let weak = self.downgrade();
        let listener = listener.clone();
        Subscription::new(move || {
            if let Some(property) = weak.upgrade() {
                property.remove_change_listener(&listener);
            }
        })
    }

    /// Number of registered invalidation listeners, including internal ones
    /// installed by bindings.
    #[must_use]
    pub fn invalidation_listener_count(&self) -> usize {
        self.inner.borrow().invalidation.len()
    }

    /// Number of registered change listeners.
    #[must_use]
    pub fn change_listener_count(&self) -> usize {
        self.inner.borrow().change.len()
    }

    /// Create a weak handle that does not keep the property alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakProperty<T> {
        WeakProperty {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn remove_listener_key(&self, key: ListenerKey) {
        self.inner.borrow_mut().invalidation.remove(key);
    }

    pub(crate) fn has_listener(&self, key: ListenerKey) -> bool {
        self.inner.borrow().invalidation.contains(key)
    }

    fn bound_source_id(&self) -> Option<ObservableId> {
        let inner = self.inner.borrow();
        inner
            .bound
            .as_ref()
            .map(|bound| bound.source.observable_id())
    }

    fn pull_from_source(&self) -> Result<(), PropertyError> {
        let source = match &self.inner.borrow().bound {
            Some(bound) => Rc::clone(&bound.source),
            None => return Ok(()),
        };
        self.store(source.value())
    }

    /// Store without the bound check. Used by `set` and by the mirror.
    fn store(&self, value: T) -> Result<(), PropertyError> {
        let old = {
            let mut inner = self.inner.borrow_mut();
            if inner.value.same_value(&value) {
                return Ok(());
            }
            std::mem::replace(&mut inner.value, value)
        };
        self.notify(&old)
    }

    fn notify(&self, old: &T) -> Result<(), PropertyError> {
        let listeners = self.inner.borrow_mut().invalidation.snapshot();
        for listener in &listeners {
            listener.invalidated(self)?;
        }

        let listeners = self.inner.borrow_mut().change.snapshot();
        if listeners.is_empty() {
            return Ok(());
        }
        // An invalidation listener may have written the value back.
        let current = self.get();
        if current.same_value(old) {
            return Ok(());
        }
        for listener in &listeners {
            listener.changed(self, old, &current)?;
        }
        Ok(())
    }
}

impl<T: PropertyValue + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: PropertyValue> Observable for Property<T> {
    fn observable_id(&self) -> ObservableId {
        self.id()
    }

    fn add_listener(&self, listener: &InvalidationListener) {
        Property::add_listener(self, listener);
    }

    fn remove_listener(&self, listener: &InvalidationListener) {
        Property::remove_listener(self, listener);
    }

    fn mirrors(&self, id: ObservableId) -> bool {
        let source = match &self.inner.borrow().bound {
            Some(bound) => Rc::clone(&bound.source),
            None => return false,
        };
        source.observable_id() == id || source.mirrors(id)
    }
}

impl<T: PropertyValue> ObservableValue for Property<T> {
    type Value = T;

    fn value(&self) -> T {
        self.get()
    }

    fn add_change_listener(&self, listener: &ChangeListener<T>) {
        Property::add_change_listener(self, listener);
    }

    fn remove_change_listener(&self, listener: &ChangeListener<T>) {
        Property::remove_change_listener(self, listener);
    }
}

impl<T: PropertyValue> fmt::Display for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        write!(f, "{} [", T::TYPE_NAME)?;
        if inner.bean.as_ref().is_some_and(|bean| bean.strong_count() > 0) {
            f.write_str("bean: present, ")?;
        }
        if !inner.name.is_empty() {
            write!(f, "name: {}, ", inner.name)?;
        }
        if inner.bound.is_some() {
            f.write_str("bound, ")?;
        }
        write!(f, "value: {:?}]", inner.value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Property")
            .field("name", &inner.name)
            .field("value", &inner.value)
            .field("bound", &inner.bound.is_some())
            .field("invalidation_listeners", &inner.invalidation.len())
            .field("change_listeners", &inner.change.len())
            .finish()
    }
}

/// Weak handle to a [`Property`].
pub struct WeakProperty<T> {
    inner: Weak<RefCell<PropertyInner<T>>>,
}

impl<T> Clone for WeakProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakProperty<T> {
    /// Upgrade to a strong handle if the property is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Property<T>> {
        self.inner.upgrade().map(|inner| Property { inner })
    }

    /// Whether the property is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T> fmt::Debug for WeakProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakProperty")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Invalidation handler that re-pulls the source value into a bound target.
struct Mirror<T> {
    target: Weak<RefCell<PropertyInner<T>>>,
}

impl<T: PropertyValue> InvalidationHandler for Mirror<T> {
    fn invalidated(&self, _source: &dyn Observable) -> ListenerResult {
        match self.target.upgrade() {
            Some(inner) => Property { inner }.pull_from_source(),
            None => Ok(()),
        }
    }

    fn is_stale(&self) -> bool {
        self.target.strong_count() == 0
    }
}

/// A property argument that may be absent.
///
/// Rust references are never null, so absence is expressed by `None` or by a
/// weak handle whose property was dropped. Both resolve to
/// [`PropertyError::NullArgument`].
pub trait PropertyArg {
    /// The resolved handle.
    type Target;

    /// Resolve to a live handle, or report `argument` as absent.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NullArgument`] if the argument does not refer to a
    /// live property.
    fn resolve(self, argument: &'static str) -> Result<Self::Target, PropertyError>;
}

impl<T: PropertyValue> PropertyArg for &Property<T> {
    type Target = Property<T>;

    fn resolve(self, _argument: &'static str) -> Result<Property<T>, PropertyError> {
        Ok(self.clone())
    }
}

impl<T: PropertyValue> PropertyArg for Option<&Property<T>> {
    type Target = Property<T>;

    fn resolve(self, argument: &'static str) -> Result<Property<T>, PropertyError> {
        self.cloned()
            .ok_or(PropertyError::NullArgument { argument })
    }
}

impl<T: PropertyValue> PropertyArg for &WeakProperty<T> {
    type Target = Property<T>;

    fn resolve(self, argument: &'static str) -> Result<Property<T>, PropertyError> {
        self.upgrade()
            .ok_or(PropertyError::NullArgument { argument })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, InvalidationListener) {
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let listener = InvalidationListener::infallible(move |_| c.set(c.get() + 1));
        (count, listener)
    }

    #[test]
    fn get_set_basic() {
        let p = Property::new(42);
        assert_eq!(p.get(), 42);
        p.set(99).unwrap();
        assert_eq!(p.get(), 99);
    }

    #[test]
    fn same_value_fires_nothing() {
        let p = Property::new(7);
        let (invalidations, listener) = counter();
        p.add_listener(&listener);
        let changes = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&changes);
        p.add_change_listener(&ChangeListener::infallible(move |_, _| c.set(c.get() + 1)));

        p.set(7).unwrap();
        assert_eq!(invalidations.get(), 0);
        assert_eq!(changes.get(), 0);

        p.set(8).unwrap();
        assert_eq!(invalidations.get(), 1);
        assert_eq!(changes.get(), 1);
    }

    #[test]
    fn invalidation_before_change() {
        let p = Property::new(String::from("a"));
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = Rc::clone(&log);
        p.add_change_listener(&ChangeListener::infallible(move |old: &String, new: &String| {
            l.borrow_mut().push(format!("change {old}->{new}"));
        }));
        let l = Rc::clone(&log);
        p.add_listener(&InvalidationListener::infallible(move |_| {
            l.borrow_mut().push("invalidated".to_string());
        }));

        p.set("b".into()).unwrap();
        assert_eq!(*log.borrow(), vec!["invalidated", "change a->b"]);
    }

    #[test]
    fn notification_order_is_registration_order() {
        let p = Property::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ['A', 'B', 'C'] {
            let l = Rc::clone(&log);
            p.add_listener(&InvalidationListener::infallible(move |_| l.borrow_mut().push(tag)));
        }
        p.set(1).unwrap();
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn duplicate_listener_registers_once() {
        let p = Property::new(0);
        let (count, listener) = counter();
        p.add_listener(&listener);
        p.add_listener(&listener.clone());
        assert_eq!(p.invalidation_listener_count(), 1);
        p.set(1).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn remove_unregistered_listener_is_noop() {
        let p = Property::new(0);
        let (_, listener) = counter();
        p.remove_listener(&listener);
        p.remove_change_listener(&ChangeListener::infallible(|_, _| {}));
        assert_eq!(p.invalidation_listener_count(), 0);
    }

    #[test]
    fn listener_receives_observable_identity() {
        let p = Property::new(0);
        let seen = Rc::new(Cell::new(None));
        let s = Rc::clone(&seen);
        p.add_listener(&InvalidationListener::infallible(move |obs| {
            s.set(Some(obs.observable_id()));
        }));
        p.set(3).unwrap();
        assert_eq!(seen.get(), Some(p.id()));
    }

    #[test]
    fn failing_listener_propagates_and_stops_dispatch() {
        let p = Property::new(0);
        p.add_listener(&InvalidationListener::new(|_| Err(PropertyError::listener("nope"))));
        let (count, listener) = counter();
        p.add_listener(&listener);

        let err = p.set(1).unwrap_err();
        assert_eq!(err, PropertyError::listener("nope"));
        assert_eq!(p.get(), 1, "value is stored before listeners run");
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn change_listener_sees_old_and_new() {
        let p = Property::new(1_i64);
        let seen = Rc::new(Cell::new((0, 0)));
        let s = Rc::clone(&seen);
        p.add_change_listener(&ChangeListener::new(move |obs, old, new| {
            assert_eq!(obs.value(), *new);
            s.set((*old, *new));
            Ok(())
        }));
        p.set(5).unwrap();
        assert_eq!(seen.get(), (1, 5));
    }

    #[test]
    fn change_skipped_when_invalidation_listener_restores_value() {
        let p = Property::new(0);
        let weak = p.downgrade();
        p.add_listener(&InvalidationListener::new(move |_| match weak.upgrade() {
            Some(p) if p.get() == 13 => p.set(0),
            _ => Ok(()),
        }));
        let changes = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&changes);
        p.add_change_listener(&ChangeListener::infallible(move |_, _| c.set(c.get() + 1)));

        p.set(13).unwrap();
        assert_eq!(p.get(), 0);
        // The nested 13 -> 0 change fires; the outer 0 -> 0 does not.
        assert_eq!(changes.get(), 1);
    }

    #[test]
    fn bind_pulls_and_mirrors() {
        let source = Property::new(10);
        let target = Property::new(0);
        target.bind(&source).unwrap();
        assert!(target.is_bound());
        assert_eq!(target.get(), 10);

        source.set(20).unwrap();
        assert_eq!(target.get(), 20);
    }

    #[test]
    fn bind_equal_value_fires_nothing() {
        let source = Property::new(4);
        let target = Property::new(4);
        let (count, listener) = counter();
        target.add_listener(&listener);
        target.bind(&source).unwrap();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn set_on_bound_property_fails() {
        let source = Property::new(String::from("x"));
        let target = Property::new(String::new());
        target.bind(&source).unwrap();

        let err = target.set("y".into()).unwrap_err();
        assert!(matches!(err, PropertyError::BoundMutation { .. }));
        assert_eq!(target.get(), "x");
    }

    #[test]
    fn unbind_keeps_last_value() {
        let source = Property::new(3);
        let target = Property::new(0);
        target.bind(&source).unwrap();
        source.set(9).unwrap();
        target.unbind();
        assert!(!target.is_bound());
        assert_eq!(target.get(), 9);
        assert_eq!(source.invalidation_listener_count(), 0);

        source.set(1).unwrap();
        assert_eq!(target.get(), 9);
        target.set(2).unwrap();
        assert_eq!(target.get(), 2);
    }

    #[test]
    fn unbind_when_free_is_noop() {
        let p = Property::new(1);
        p.unbind();
        assert!(!p.is_bound());
        assert_eq!(p.get(), 1);
    }

    #[test]
    fn rebind_same_source_is_noop() {
        let source = Property::new(1);
        let target = Property::new(0);
        target.bind(&source).unwrap();
        target.bind(&source.clone()).unwrap();
        assert_eq!(source.invalidation_listener_count(), 1);
    }

    #[test]
    fn rebind_switches_source() {
        let first = Property::new(1);
        let second = Property::new(2);
        let target = Property::new(0);
        target.bind(&first).unwrap();
        target.bind(&second).unwrap();
        assert_eq!(target.get(), 2);
        assert_eq!(first.invalidation_listener_count(), 0);

        first.set(5).unwrap();
        assert_eq!(target.get(), 2);
        second.set(6).unwrap();
        assert_eq!(target.get(), 6);
    }

    #[test]
    fn bind_absent_source_fails() {
        let target = Property::new(0);
        let err = target.bind(None::<&Property<i32>>).unwrap_err();
        assert_eq!(err, PropertyError::NullArgument { argument: "source" });
        assert!(!target.is_bound());

        let dropped = Property::new(1).downgrade();
        let err = target.bind(&dropped).unwrap_err();
        assert!(matches!(err, PropertyError::NullArgument { .. }));
    }

    #[test]
    fn chained_binding_propagates() {
        let a = Property::new(1);
        let b = Property::new(0);
        let c = Property::new(0);
        b.bind(&a).unwrap();
        c.bind(&b).unwrap();
        a.set(7).unwrap();
        assert_eq!(c.get(), 7);
    }

    #[test]
    fn dropped_target_mirror_is_pruned() {
        let source = Property::new(1);
        {
            let target = Property::new(0);
            target.bind(&source).unwrap();
            assert_eq!(source.invalidation_listener_count(), 1);
        }
        source.set(2).unwrap();
        assert_eq!(source.invalidation_listener_count(), 0);
    }

    #[test]
    fn source_outlives_handles_while_bound() {
        let target = Property::new(0);
        {
            let source = Property::new(5);
            target.bind(&source).unwrap();
        }
        assert_eq!(target.get(), 5);
        assert!(target.is_bound());
    }

    #[test]
    fn self_bind_is_rejected() {
        let p = Property::new(3).with_name("p");
        let err = p.bind(&p).unwrap_err();
        assert!(matches!(err, PropertyError::BindingCycle { .. }));
        assert!(!p.is_bound());
        p.set(4).unwrap();
        assert_eq!(p.invalidation_listener_count(), 0);
    }

    #[test]
    fn mutual_bind_is_rejected_and_nothing_leaks() {
        let a = Property::new(1);
        let b = Property::new(2);
        a.bind(&b).unwrap();
        let err = b.bind(&a).unwrap_err();
        assert!(matches!(err, PropertyError::BindingCycle { .. }));
        assert!(!b.is_bound());
        b.set(9).unwrap();
        assert_eq!(a.get(), 9);

        let (weak_a, weak_b) = (a.downgrade(), b.downgrade());
        drop(a);
        drop(b);
        assert!(!weak_a.is_alive());
        assert!(!weak_b.is_alive());
    }

    #[test]
    fn indirect_cycle_is_rejected_and_previous_binding_kept() {
        let a = Property::new(0);
        let b = Property::new(0);
        let c = Property::new(0);
        let d = Property::new(5);
        a.bind(&d).unwrap();
        b.bind(&a).unwrap();
        c.bind(&b).unwrap();

        let err = a.bind(&c).unwrap_err();
        assert!(matches!(err, PropertyError::BindingCycle { .. }));
        assert!(a.is_bound());
        d.set(6).unwrap();
        assert_eq!(c.get(), 6);
    }

    #[test]
    fn subscription_removes_listener_on_drop() {
        let p = Property::new(0);
        let (count, listener) = counter();
        let sub = p.subscribe(&listener);
        p.set(1).unwrap();
        drop(sub);
        p.set(2).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(p.invalidation_listener_count(), 0);
    }

    #[test]
    fn subscription_does_not_keep_property_alive() {
        let p = Property::new(0);
        let weak = p.downgrade();
        let sub = p.subscribe_change(&ChangeListener::infallible(|_, _| {}));
        drop(p);
        assert!(!weak.is_alive());
        drop(sub);
    }

    #[test]
    fn display_describes_metadata() {
        let owner = Rc::new("panel");
        let p = Property::new(5).with_name("width").with_bean(&owner);
        assert_eq!(p.to_string(), "IntegerProperty [bean: present, name: width, value: 5]");
        assert_eq!(p.name(), "width");
        assert!(p.bean().is_some());

        drop(owner);
        assert!(p.bean().is_none());
        assert_eq!(p.to_string(), "IntegerProperty [name: width, value: 5]");
    }

    #[test]
    fn display_marks_bound() {
        let source = Property::new(true);
        let p = Property::new(false);
        p.bind(&source).unwrap();
        assert_eq!(p.to_string(), "BooleanProperty [bound, value: true]");
    }

    #[test]
    fn debug_format() {
        let p = Property::new(42);
        let dbg = format!("{p:?}");
        assert!(dbg.contains("Property"));
        assert!(dbg.contains("42"));
    }

    #[test]
    fn with_access() {
        let p = Property::new(Some(vec![1, 2, 3]));
        let sum = p.with(|v| v.as_ref().map_or(0, |v| v.iter().sum::<i32>()));
        assert_eq!(sum, 6);
    }

    #[test]
    fn clone_shares_state() {
        let p1 = Property::new(0);
        let p2 = p1.clone();
        p1.set(42).unwrap();
        assert_eq!(p2.get(), 42);
        assert_eq!(p1.id(), p2.id());
    }

    #[test]
    fn weak_property_upgrade() {
        let p = Property::new(1);
        let weak = p.downgrade();
        assert!(weak.is_alive());
        assert_eq!(weak.upgrade().map(|p| p.get()), Some(1));
        drop(p);
        assert!(weak.upgrade().is_none());
    }
}
