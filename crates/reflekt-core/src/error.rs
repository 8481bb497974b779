//! Error types for registration and invocation.
//!
//! Runtime-queryable failures (name lookups that miss, type mismatches on
//! property access, casts that fail both checks) are *not* errors: they
//! degrade to `None` / `false` / a default value so traversal code can
//! skip gracefully. The types here cover the two places a structured
//! error is worth surfacing:
//!
//! - [`RegistrationError`] — structural contract violations caught while a
//!   type registers itself; fatal under [`DuplicatePolicy::Reject`].
//! - [`InvokeError`] — the opt-in diagnostic channel for
//!   [`MethodDescriptor::try_invoke`]; the plain `invoke` path swallows it
//!   and returns a default value.
//!
//! [`DuplicatePolicy::Reject`]: crate::registry::DuplicatePolicy::Reject
//! [`MethodDescriptor::try_invoke`]: crate::method::MethodDescriptor::try_invoke

use thiserror::Error;

/// Errors raised while a type's registration path runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A property name was registered twice on the same owner while the
    /// registry's duplicate policy is `Reject`.
    #[error("duplicate property `{name}` on type `{owner}`")]
    DuplicateProperty {
        /// Owning type name.
        owner: &'static str,
        /// Property name registered twice.
        name: &'static str,
    },

    /// A method name was registered twice on the same owner while the
    /// registry's duplicate policy is `Reject`.
    #[error("duplicate method `{name}` on type `{owner}`")]
    DuplicateMethod {
        /// Owning type name.
        owner: &'static str,
        /// Method name registered twice.
        name: &'static str,
    },
}

/// Errors surfaced by the diagnostic method-invocation channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The requested `(Return, Args)` shape does not match the method's
    /// registered signature; no call was made.
    #[error("method `{name}` does not match the requested signature")]
    SignatureMismatch {
        /// Method name.
        name: &'static str,
    },

    /// The instance's runtime type is neither the owning type nor a
    /// descendant of it; no call was made.
    #[error("instance is not a `{owner}` (or descendant)")]
    IncompatibleInstance {
        /// Owning type name the method was registered on.
        owner: &'static str,
    },

    /// A non-const member method was invoked through a shared reference.
    #[error("method `{name}` requires a mutable instance")]
    RequiresMut {
        /// Method name.
        name: &'static str,
    },
}
