#![forbid(unsafe_code)]

//! Observable properties and bindings for FrankenTUI.
//!
//! This crate provides:
//!
//! - [`Property`]: a shared, observable value cell with invalidation and
//!   change listeners, plus typed flavors such as [`IntegerProperty`] and
//!   [`StringProperty`].
//! - Unidirectional binding: [`Property::bind`] makes a property mirror any
//!   [`ObservableValue`] until [`Property::unbind`].
//! - Bidirectional binding: [`bind_bidirectional`] keeps two properties
//!   equal, guards against echo loops and rolls back failed propagation.
//! - [`Subscription`] and [`ListenerScope`]: RAII lifecycle helpers.
//!
//! # Architecture
//!
//! Properties use `Rc<RefCell<..>>` for single-threaded shared ownership and
//! are therefore `!Send`. No borrow is held while listeners run; dispatch
//! iterates a snapshot of the listener list, so listeners may add or remove
//! listeners and write any property.
//!
//! Everything the engine registers on a property holds the *other* side
//! weakly: mirror listeners, bidirectional links and subscriptions never keep
//! a property alive. Listeners whose target died are pruned lazily.
//!
//! # Invariants
//!
//! 1. Writing a value equal to the current one fires no listener.
//! 2. Invalidation listeners fire before change listeners, each in
//!    registration order.
//! 3. A bound property rejects `set()` with [`PropertyError::BoundMutation`].
//! 4. A bidirectional link never echoes a value back to the side that
//!    changed.
//! 5. A failed bidirectional propagation restores the changed side, or tears
//!    the link down when the restore fails too.
//!
//! # Feature flags
//!
//! - `tracing`: wrap each bidirectional synchronization in a `trace` span.
//!   Log events are emitted regardless of this flag.

pub mod bidirectional;
pub mod error;
pub mod listener;
pub mod observable;
pub mod property;
pub mod scope;
pub mod typed;
pub mod value;

pub use bidirectional::{
    BidirectionalBinding, BindingKind, bind_bidirectional, bind_bidirectional_number,
    unbind_bidirectional,
};
pub use error::PropertyError;
pub use listener::{ChangeListener, InvalidationListener};
pub use observable::{Observable, ObservableId, ObservableValue};
pub use property::{Property, PropertyArg, WeakProperty};
pub use scope::{ListenerScope, Subscription};
pub use typed::{
    BooleanProperty, DoubleProperty, IntegerProperty, LongProperty, ObjectProperty,
    StringProperty,
};
pub use value::{NumericValue, PropertyValue, ValueKind};
