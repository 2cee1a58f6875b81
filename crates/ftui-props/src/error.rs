#![forbid(unsafe_code)]

//! Error taxonomy for property mutation and binding.
//!
//! # Failure Modes
//!
//! | Variant | Cause | Behavior |
//! |---------|-------|----------|
//! | `NullArgument` | `None` or dangling weak handle passed as a property | Surfaced, nothing changed |
//! | `SelfBinding` | Bidirectional bind/unbind of a property with itself | Surfaced, nothing changed |
//! | `BoundMutation` | `set()` on a unidirectionally bound property | Surfaced, value unchanged |
//! | `BindingCycle` | `bind()` whose source already mirrors the target | Surfaced, previous binding kept |
//! | `Listener` | A listener callback failed | Notification stops, error propagates |
//! | `BindingSync` | Propagation through a bidirectional binding failed | Source rolled back, binding kept |
//! | `BindingTeardown` | The rollback itself failed | Binding removed from both properties |

use std::fmt;

/// Errors raised by property mutation, listener dispatch and binding.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// A required property argument was absent.
    NullArgument {
        /// Parameter name of the missing argument.
        argument: &'static str,
    },
    /// Attempted to bidirectionally bind a property to itself.
    SelfBinding {
        /// Description of the offending property.
        property: String,
    },
    /// `set` was called on a property that mirrors a bound source.
    BoundMutation {
        /// Description of the bound property.
        property: String,
    },
    /// `bind` would make a property mirror itself, directly or through a
    /// chain of bound sources.
    BindingCycle {
        /// Description of the property being bound.
        property: String,
    },
    /// A listener callback reported a failure.
    Listener {
        /// Message supplied by the listener.
        message: String,
    },
    /// Bidirectional propagation failed; the source was restored to its
    /// previous value and the binding is still active.
    BindingSync {
        /// The failure raised while writing the other property.
        cause: Box<PropertyError>,
    },
    /// Restoring the source after a failed propagation also failed. The
    /// binding has been removed from both properties.
    BindingTeardown {
        /// The failure raised by the rollback write.
        rollback: Box<PropertyError>,
        /// The original propagation failure.
        suppressed: Box<PropertyError>,
    },
}

impl PropertyError {
    /// Convenience constructor for listener failures.
    #[must_use]
    pub fn listener(message: impl Into<String>) -> Self {
        Self::Listener {
            message: message.into(),
        }
    }

    /// The error suppressed by a teardown, if any.
    #[must_use]
    pub fn suppressed(&self) -> Option<&PropertyError> {
        match self {
            Self::BindingTeardown { suppressed, .. } => Some(suppressed),
            _ => None,
        }
    }

    /// Whether this error left a bidirectional binding detached.
    #[must_use]
    pub fn is_teardown(&self) -> bool {
        matches!(self, Self::BindingTeardown { .. })
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullArgument { argument } => {
                write!(f, "required argument `{argument}` is absent")
            }
            Self::SelfBinding { property } => {
                write!(f, "cannot bind {property} to itself")
            }
            Self::BoundMutation { property } => {
                write!(f, "{property}: a bound value cannot be set")
            }
            Self::BindingCycle { property } => {
                write!(f, "binding {property} would make it depend on itself")
            }
            Self::Listener { message } => write!(f, "listener failed: {message}"),
            Self::BindingSync { .. } => write!(
                f,
                "bidirectional binding failed, setting to the previous value"
            ),
            Self::BindingTeardown { .. } => write!(
                f,
                "bidirectional binding failed together with an attempt to restore \
                 the source property to the previous value; binding removed"
            ),
        }
    }
}

impl std::error::Error for PropertyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BindingSync { cause } => Some(cause.as_ref()),
            Self::BindingTeardown { rollback, .. } => Some(rollback.as_ref()),
            _ => None,
        }
    }
}
