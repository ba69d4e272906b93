#![forbid(unsafe_code)]

//! Payload classification and the managed-handle lifecycle contract.
//!
//! Values crossing from a source system into a link are classified **once**,
//! at the boundary, into a [`Payload`]: either a plain value with no
//! lifecycle obligations, or a [`ManagedHandle`] whose underlying resource
//! has an externally managed lifetime. Everything downstream dispatches on
//! the variant instead of re-probing the value.

/// A value entering a link from a source system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<V, H> {
    /// A plain value. No lifecycle action is ever taken for it.
    Plain(V),
    /// A handle to an externally managed resource. A link that stores one
    /// must hold an independent reference ([`ManagedHandle::retain`]) and
    /// release it exactly once when superseded or removed.
    Managed(H),
}

impl<V, H> Payload<V, H> {
    /// Whether this payload carries a managed handle.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        matches!(self, Self::Managed(_))
    }

    /// The plain value, if any.
    #[must_use]
    pub fn as_plain(&self) -> Option<&V> {
        match self {
            Self::Plain(value) => Some(value),
            Self::Managed(_) => None,
        }
    }

    /// The managed handle, if any.
    #[must_use]
    pub fn as_managed(&self) -> Option<&H> {
        match self {
            Self::Plain(_) => None,
            Self::Managed(handle) => Some(handle),
        }
    }

    /// Transform the plain value, passing a managed handle through
    /// untouched. The usual shape of a scalar-link decorator.
    #[must_use]
    pub fn map_plain(self, f: impl FnOnce(V) -> V) -> Self {
        match self {
            Self::Plain(value) => Self::Plain(f(value)),
            managed @ Self::Managed(_) => managed,
        }
    }
}

/// A handle to a resource whose lifetime is managed outside the link.
///
/// The contract separates *aliasing* from *ownership of a release
/// obligation*:
///
/// - [`retain`](Self::retain) produces an **independent reference**: a new
///   handle to the same resource carrying its own obligation to be
///   [`release`](Self::release)d exactly once.
/// - `Clone` (the supertrait) merely aliases an existing reference so the
///   same retained handle can sit in tracking state and flow through a
///   decorator or view-model. Cloning creates no new obligation.
///
/// Releasing a reference more than once is a fault on the caller's side;
/// implementations decide whether to panic, log, or record it.
pub trait ManagedHandle: Clone {
    /// Obtain an independent reference to the underlying resource.
    #[must_use]
    fn retain(&self) -> Self;

    /// Consume and release exactly this reference.
    fn release(self);
}

/// Uninhabited handle type for sources whose payloads are always plain.
///
/// `Payload<V, NoHandle>` can never hold a `Managed` variant, so links over
/// such sources perform no lifecycle work at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoHandle {}

impl ManagedHandle for NoHandle {
    fn retain(&self) -> Self {
        match *self {}
    }

    fn release(self) {
        match self {}
    }
}
