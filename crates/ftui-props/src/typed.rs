#![forbid(unsafe_code)]

//! Typed property flavors.
//!
//! Every flavor is the same [`Property`] monomorphized for one payload type,
//! so all of them share one mutation, notification and binding path. The
//! aliases exist for readability at use sites and for the type names shown by
//! `Display`.

use crate::property::Property;

/// Property holding a `bool`.
pub type BooleanProperty = Property<bool>;

/// Property holding an `i32`.
pub type IntegerProperty = Property<i32>;

/// Property holding an `i64`.
pub type LongProperty = Property<i64>;

/// Property holding an `f64`.
pub type DoubleProperty = Property<f64>;

/// Property holding a `String`.
pub type StringProperty = Property<String>;

/// Property holding an optional object. `None` is the absent value.
pub type ObjectProperty<U> = Property<Option<U>>;

impl<U> ObjectProperty<U>
where
    U: Clone + PartialEq + std::fmt::Debug + 'static,
{
    /// Create an object property holding no value.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(None)
    }

    /// Whether the property currently holds no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.with(Option::is_none)
    }
}

impl StringProperty {
    /// Create a string property from anything convertible to `String`.
    #[must_use]
    pub fn of(value: impl Into<String>) -> Self {
        Self::new(value.into())
    }
}
