#![forbid(unsafe_code)]

//! Bidirectional bindings between two properties.
//!
//! # Design
//!
//! A binding is one invalidation listener registered on both properties. The
//! listener holds only weak handles, so it never keeps either side alive, and
//! its key is the unordered pair of property ids. `unbind(b, a)` therefore
//! finds the listener installed by `bind(a, b)` without the original handle.
//!
//! When one side changes, the listener writes that value to the other side.
//! A per-binding `synchronizing` flag, held by an RAII guard, makes the echo
//! from the other side a no-op.
//!
//! # Rollback
//!
//! The binding remembers, per side, the value that side held after the last
//! synchronization. The other side's value is re-read after it is written,
//! so a listener on it that adjusts the value is recorded as well. If writing
//! the other side fails, the changed side is restored to its own remembered
//! value and the failure is returned as [`PropertyError::BindingSync`]; the
//! binding stays.
//! If the restore fails too, the binding removes itself from both sides and
//! returns [`PropertyError::BindingTeardown`].
//!
//! # Invariants
//!
//! 1. After `bind_bidirectional(a, b)` returns, `a` holds `b`'s value.
//! 2. After any successful `set()` on either side, both sides hold the same
//!    value.
//! 3. A property pair is linked by at most one binding.
//! 4. Dropping either property detaches the binding from the survivor.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::PropertyError;
use crate::listener::{
    InvalidationHandler, InvalidationListener, ListenerKey, ListenerResult, PairKey,
};
use crate::observable::{Observable, ObservableId};
use crate::property::{Property, PropertyArg, WeakProperty};
use crate::scope::Subscription;
use crate::value::{NumericValue, PropertyValue, ValueKind};

/// Which synchronization path a binding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Both sides share a primitive kind and exchange unboxed values.
    Specialized(ValueKind),
    /// Both sides hold object values.
    Generic,
    /// A nullable object property paired with a primitive numeric property.
    /// An absent object value reads as the numeric default.
    NumericBridge(ValueKind),
}

impl BindingKind {
    fn for_value(kind: ValueKind) -> Self {
        if kind.is_primitive() {
            Self::Specialized(kind)
        } else {
            Self::Generic
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Strong side of a binding endpoint.
trait Live: Sized + 'static {
    type Value: Clone + fmt::Debug;
    /// Raw stored state, used to restore a side exactly.
    type Saved: Clone;
    type Weak: Endpoint<Live = Self>;

    fn id(&self) -> ObservableId;
    fn read(&self) -> Self::Value;
    fn write(&self, value: Self::Value) -> Result<(), PropertyError>;
    fn save(&self) -> Self::Saved;
    fn restore(&self, saved: Self::Saved) -> Result<(), PropertyError>;
    fn attach(&self, listener: &InvalidationListener);
    fn detach(&self, key: ListenerKey);
    fn is_attached(&self, key: ListenerKey) -> bool;
    fn downgrade(&self) -> Self::Weak;
    fn describe(&self) -> String;
}

/// Weak side of a binding endpoint.
trait Endpoint: 'static {
    type Live;

    fn upgrade(&self) -> Option<Self::Live>;
    fn is_alive(&self) -> bool;
}

impl<T: PropertyValue> Live for Property<T> {
    type Value = T;
    type Saved = T;
    type Weak = WeakProperty<T>;

    fn id(&self) -> ObservableId {
        Property::id(self)
    }

    fn read(&self) -> T {
        self.get()
    }

    fn write(&self, value: T) -> Result<(), PropertyError> {
        self.set(value)
    }

    fn save(&self) -> T {
        self.get()
    }

    fn restore(&self, saved: T) -> Result<(), PropertyError> {
        self.set(saved)
    }

    fn attach(&self, listener: &InvalidationListener) {
        self.add_listener(listener);
    }

    fn detach(&self, key: ListenerKey) {
        self.remove_listener_key(key);
    }

    fn is_attached(&self, key: ListenerKey) -> bool {
        self.has_listener(key)
    }

    fn downgrade(&self) -> WeakProperty<T> {
        Property::downgrade(self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl<T: PropertyValue> Endpoint for WeakProperty<T> {
    type Live = Property<T>;

    fn upgrade(&self) -> Option<Property<T>> {
        WeakProperty::upgrade(self)
    }

    fn is_alive(&self) -> bool {
        WeakProperty::is_alive(self)
    }
}

/// A nullable object property seen through its numeric payload.
struct Unboxed<N>(Property<Option<N>>);

struct WeakUnboxed<N>(WeakProperty<Option<N>>);

impl<N: NumericValue> Live for Unboxed<N> {
    type Value = N;
    type Saved = Option<N>;
    type Weak = WeakUnboxed<N>;

    fn id(&self) -> ObservableId {
        self.0.id()
    }

    fn read(&self) -> N {
        match self.0.get() {
            Some(value) => value,
            None => {
                tracing::debug!(
                    property = %self.0,
                    default = ?N::default(),
                    "absent object value read as numeric default"
                );
                N::default()
            }
        }
    }

    fn write(&self, value: N) -> Result<(), PropertyError> {
        self.0.set(Some(value))
    }

    fn save(&self) -> Option<N> {
        self.0.get()
    }

    fn restore(&self, saved: Option<N>) -> Result<(), PropertyError> {
        self.0.set(saved)
    }

    fn attach(&self, listener: &InvalidationListener) {
        self.0.add_listener(listener);
    }

    fn detach(&self, key: ListenerKey) {
        self.0.remove_listener_key(key);
    }

    fn is_attached(&self, key: ListenerKey) -> bool {
        self.0.has_listener(key)
    }

    fn downgrade(&self) -> WeakUnboxed<N> {
        WeakUnboxed(self.0.downgrade())
    }

    fn describe(&self) -> String {
        self.0.to_string()
    }
}

impl<N: NumericValue> Endpoint for WeakUnboxed<N> {
    type Live = Unboxed<N>;

    fn upgrade(&self) -> Option<Unboxed<N>> {
        self.0.upgrade().map(Unboxed)
    }

    fn is_alive(&self) -> bool {
        self.0.is_alive()
    }
}

// ---------------------------------------------------------------------------
// SyncLink: the shared listener
// ---------------------------------------------------------------------------

/// Clears the synchronizing flag when dropped, including on early return.
struct SyncGuard<'a>(&'a Cell<bool>);

impl<'a> SyncGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct SyncLink<A: Live, B: Live> {
    a: A::Weak,
    b: B::Weak,
    pair: PairKey,
    kind: BindingKind,
    synchronizing: Cell<bool>,
    last_a: RefCell<A::Saved>,
    last_b: RefCell<B::Saved>,
}

impl<A, B> SyncLink<A, B>
where
    A: Live,
    B: Live<Value = A::Value>,
{
    fn key(&self) -> ListenerKey {
        ListenerKey::Pair(self.pair)
    }

    /// Push `source`'s value into `target`, rolling `source` back on failure.
    fn settle<S, D>(
        &self,
        source: &S,
        source_good: &RefCell<S::Saved>,
        target: &D,
        target_good: &RefCell<D::Saved>,
    ) -> ListenerResult
    where
        S: Live,
        D: Live<Value = S::Value>,
    {
        let cause = match target.write(source.read()) {
            Ok(()) => {
                *target_good.borrow_mut() = target.save();
                *source_good.borrow_mut() = source.save();
                return Ok(());
            }
            Err(cause) => cause,
        };
        // The write is stored even when a listener on `target` failed.
        *target_good.borrow_mut() = target.save();

        let previous = source_good.borrow().clone();
        match source.restore(previous) {
            Ok(()) => {
                *source_good.borrow_mut() = source.save();
                tracing::debug!(
                    source = %source.describe(),
                    error = %cause,
                    "bidirectional sync failed; source restored"
                );
                Err(PropertyError::BindingSync {
                    cause: Box::new(cause),
                })
            }
            Err(rollback) => {
                source.detach(self.key());
                target.detach(self.key());
                tracing::warn!(
                    source = %source.describe(),
                    target = %target.describe(),
                    error = %rollback,
                    suppressed = %cause,
                    "rollback failed; bidirectional binding removed"
                );
                Err(PropertyError::BindingTeardown {
                    rollback: Box::new(rollback),
                    suppressed: Box::new(cause),
                })
            }
        }
    }
}

impl<A, B> InvalidationHandler for SyncLink<A, B>
where
    A: Live,
    B: Live<Value = A::Value>,
{
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult {
        if self.synchronizing.get() {
            return Ok(());
        }
        let (Some(a), Some(b)) = (self.a.upgrade(), self.b.upgrade()) else {
            self.release();
            return Ok(());
        };

        let _guard = SyncGuard::enter(&self.synchronizing);
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("bidirectional_sync", kind = ?self.kind).entered();

        if observable.observable_id() == a.id() {
            self.settle(&a, &self.last_a, &b, &self.last_b)
        } else {
            self.settle(&b, &self.last_b, &a, &self.last_a)
        }
    }

    fn is_stale(&self) -> bool {
        !self.a.is_alive() || !self.b.is_alive()
    }
}

/// Type-erased view of a [`SyncLink`] held by [`BidirectionalBinding`].
trait BindingLink {
    fn pair(&self) -> PairKey;
    fn kind(&self) -> BindingKind;
    fn release(&self);
    fn is_active(&self) -> bool;
}

impl<A, B> BindingLink for SyncLink<A, B>
where
    A: Live,
    B: Live<Value = A::Value>,
{
    fn pair(&self) -> PairKey {
        self.pair
    }

    fn kind(&self) -> BindingKind {
        self.kind
    }

    fn release(&self) {
        if let Some(a) = self.a.upgrade() {
            a.detach(self.key());
        }
        if let Some(b) = self.b.upgrade() {
            b.detach(self.key());
        }
    }

    fn is_active(&self) -> bool {
        match (self.a.upgrade(), self.b.upgrade()) {
            (Some(a), Some(b)) => a.is_attached(self.key()) && b.is_attached(self.key()),
            _ => false,
        }
    }
}

/// Seed `a` from `b` and register one shared listener on both.
fn link<A, B>(a: &A, b: &B, kind: BindingKind) -> Result<BidirectionalBinding, PropertyError>
where
    A: Live,
    B: Live<Value = A::Value>,
{
    if a.id() == b.id() {
        return Err(PropertyError::SelfBinding {
            property: a.describe(),
        });
    }

    a.write(b.read())?;

    let pair = PairKey::new(a.id(), b.id());
    let link = Rc::new(SyncLink::<A, B> {
        a: a.downgrade(),
        b: b.downgrade(),
        pair,
        kind,
        synchronizing: Cell::new(false),
        last_a: RefCell::new(a.save()),
        last_b: RefCell::new(b.save()),
    });
    let handler: Rc<dyn InvalidationHandler> = link.clone();
    let listener = InvalidationListener::from_handler(handler, ListenerKey::Pair(pair));
    a.attach(&listener);
    b.attach(&listener);

    tracing::trace!(
        a = %a.describe(),
        b = %b.describe(),
        kind = ?kind,
        "bidirectional binding installed"
    );
    Ok(BidirectionalBinding { link })
}

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

/// Handle to an installed bidirectional binding.
///
/// The binding stays installed when the handle is dropped; it lives as long as
/// both properties do. Use [`unbind`](Self::unbind),
/// [`unbind_bidirectional`] or [`into_subscription`](Self::into_subscription)
/// to remove it.
///
/// Handles compare equal when they link the same pair of properties.
#[derive(Clone)]
pub struct BidirectionalBinding {
    link: Rc<dyn BindingLink>,
}

impl BidirectionalBinding {
    /// Synchronization path chosen for this binding.
    #[must_use]
    pub fn kind(&self) -> BindingKind {
        self.link.kind()
    }

    /// Whether both properties are alive and still linked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.link.is_active()
    }

    /// Remove the binding from both properties. Values are left as they are.
    pub fn unbind(&self) {
        self.link.release();
        tracing::trace!(kind = ?self.kind(), "bidirectional binding removed");
    }

    /// Convert into a guard that removes the binding when dropped.
    pub fn into_subscription(self) -> Subscription {
        Subscription::new(move || self.unbind())
    }
}

impl PartialEq for BidirectionalBinding {
    fn eq(&self, other: &Self) -> bool {
        self.link.pair() == other.link.pair()
    }
}

impl Eq for BidirectionalBinding {}

impl Hash for BidirectionalBinding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.link.pair().hash(state);
    }
}

impl fmt::Debug for BidirectionalBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidirectionalBinding")
            .field("kind", &self.kind())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Link two properties of the same type so changes to either reach the other.
///
/// `a` is set to `b`'s current value first. Binding a pair that is already
/// linked re-seeds `a` and leaves a single binding in place.
///
/// # Errors
///
/// - [`PropertyError::NullArgument`] if either argument is absent.
/// - [`PropertyError::SelfBinding`] if both arguments are the same property.
/// - Any error raised while seeding `a`, such as
///   [`PropertyError::BoundMutation`]. Nothing is registered in that case.
///
/// # Example
///
/// ```
/// use ftui_props::{IntegerProperty, PropertyError, bind_bidirectional};
///
/// let model = IntegerProperty::new(3);
/// let view = IntegerProperty::new(0);
/// bind_bidirectional(&view, &model)?;
/// assert_eq!(view.get(), 3);
///
/// view.set(8)?;
/// assert_eq!(model.get(), 8);
/// # Ok::<(), PropertyError>(())
/// ```
pub fn bind_bidirectional<T, A, B>(a: A, b: B) -> Result<BidirectionalBinding, PropertyError>
where
    T: PropertyValue,
    A: PropertyArg<Target = Property<T>>,
    B: PropertyArg<Target = Property<T>>,
{
    let a = a.resolve("property_a")?;
    let b = b.resolve("property_b")?;
    link(&a, &b, BindingKind::for_value(T::KIND))
}

/// Link a nullable object property `a` with a primitive numeric property `b`.
///
/// `a` is set to `Some(b)` first. When `a` becomes `None`, `b` receives the
/// numeric default (`0`, `0.0`).
///
/// # Errors
///
/// Same as [`bind_bidirectional`].
pub fn bind_bidirectional_number<N, A, B>(a: A, b: B) -> Result<BidirectionalBinding, PropertyError>
where
    N: NumericValue,
    A: PropertyArg<Target = Property<Option<N>>>,
    B: PropertyArg<Target = Property<N>>,
{
    let a = a.resolve("property_a")?;
    let b = b.resolve("property_b")?;
    link(&Unboxed(a), &b, BindingKind::NumericBridge(N::KIND))
}

/// Listener keyed by a pair, used only to remove the real binding listener.
struct Detached;

impl InvalidationHandler for Detached {
    fn invalidated(&self, _observable: &dyn Observable) -> ListenerResult {
        Ok(())
    }
}

/// Remove the bidirectional binding between `a` and `b`, in either order.
///
/// Unlinked pairs are ignored. Values are left as they are.
///
/// # Errors
///
/// - [`PropertyError::NullArgument`] if either argument is absent.
/// - [`PropertyError::SelfBinding`] if both arguments are the same property.
pub fn unbind_bidirectional<A, B>(a: A, b: B) -> Result<(), PropertyError>
where
    A: PropertyArg,
    B: PropertyArg,
    A::Target: Observable + fmt::Display,
    B::Target: Observable,
{
    let a = a.resolve("property_a")?;
    let b = b.resolve("property_b")?;
    if a.observable_id() == b.observable_id() {
        return Err(PropertyError::SelfBinding {
            property: a.to_string(),
        });
    }

    let pair = PairKey::new(a.observable_id(), b.observable_id());
    let listener = InvalidationListener::from_handler(Rc::new(Detached), ListenerKey::Pair(pair));
    a.remove_listener(&listener);
    b.remove_listener(&listener);
    tracing::trace!(pair = ?pair, "bidirectional binding removed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
