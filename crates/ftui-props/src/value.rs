#![forbid(unsafe_code)]

//! Value kinds a property can hold and the equality rule that decides whether
//! a write is an effective change.
//!
//! Each kind supplies its own [`PropertyValue::same_value`]: an identity fast
//! path followed by structural equality. Primitive kinds are stored unboxed;
//! the generic [`Property`](crate::Property) is monomorphized per kind, so the
//! hot `set` path never allocates.

use std::fmt;

/// Storage specialization of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Integer,
    Long,
    Double,
    /// Strings and arbitrary objects.
    Object,
}

impl ValueKind {
    /// Whether this kind has a dedicated, unboxed specialization.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        !matches!(self, Self::Object)
    }
}

/// A value that can live inside a [`Property`](crate::Property).
pub trait PropertyValue: Clone + fmt::Debug + 'static {
    /// Storage specialization used for binding dispatch.
    const KIND: ValueKind;

    /// Name used when describing a property of this type.
    const TYPE_NAME: &'static str;

    /// Whether `self` and `other` are the same value. Writes of the same value
    /// are not changes and fire no listeners.
    fn same_value(&self, other: &Self) -> bool;
}

impl PropertyValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;
    const TYPE_NAME: &'static str = "BooleanProperty";

    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl PropertyValue for i32 {
    const KIND: ValueKind = ValueKind::Integer;
    const TYPE_NAME: &'static str = "IntegerProperty";

    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl PropertyValue for i64 {
    const KIND: ValueKind = ValueKind::Long;
    const TYPE_NAME: &'static str = "LongProperty";

    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl PropertyValue for f64 {
    const KIND: ValueKind = ValueKind::Double;
    const TYPE_NAME: &'static str = "DoubleProperty";

    /// Bit identity first (`NaN` equals itself), then IEEE equality
    /// (`0.0` equals `-0.0`).
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits() || self == other
    }
}

impl PropertyValue for String {
    const KIND: ValueKind = ValueKind::Object;
    const TYPE_NAME: &'static str = "StringProperty";

    fn same_value(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self == other
    }
}

/// Nullable object payload. Two `None`s are the same; `None` never equals
/// `Some`; two `Some`s compare structurally.
impl<U> PropertyValue for Option<U>
where
    U: Clone + PartialEq + fmt::Debug + 'static,
{
    const KIND: ValueKind = ValueKind::Object;
    const TYPE_NAME: &'static str = "ObjectProperty";

    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Primitive numeric kinds that can be bridged to a nullable object property.
pub trait NumericValue: PropertyValue + Copy + Default + PartialEq {}

impl NumericValue for i32 {}
impl NumericValue for i64 {}
impl NumericValue for f64 {}
