#![forbid(unsafe_code)]

//! Contracts a source observable system must satisfy to be linked.
//!
//! A link never constructs or mutates the source; it only reads an initial
//! snapshot and registers a change listener. Listeners are synchronous and
//! return `Result`, so a fault inside replay surfaces through the source's
//! own notification dispatch, which applies whatever delivery-abort policy
//! it has.
//!
//! The associated `Subscription` type is the source's cancellation guard;
//! links hand it back to the caller unchanged. Dropping it stops delivery
//! but does **not** release handles the link already retained.

use crate::error::LinkError;
use crate::payload::{ManagedHandle, Payload};

/// Structural mutation kinds a vector source can report.
///
/// `Other` carries the raw discriminant of any kind this link does not
/// replay (some source systems report bulk operations such as clears).
/// Delivering one to a link is a fatal [`LinkError::UnsupportedMutation`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// An element was inserted, shifting later elements right.
    Insert,
    /// An element was removed, shifting later elements left.
    Erase,
    /// The element at an index was overwritten in place.
    Set,
    /// A kind this link does not replay.
    Other(u32),
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => f.write_str("insert"),
            Self::Erase => f.write_str("erase"),
            Self::Set => f.write_str("set"),
            Self::Other(raw) => write!(f, "other({raw})"),
        }
    }
}

/// One structural mutation reported by a vector source.
#[derive(Debug, Clone)]
pub struct VectorEvent<V, H> {
    /// The element the mutation concerns: the inserted value, the
    /// replacement value, or (for `Erase`) the removed value.
    pub payload: Payload<V, H>,
    /// Position the mutation applies to, valid against the source's state
    /// at the moment the event was generated.
    pub index: usize,
    /// What happened.
    pub kind: MutationKind,
}

/// Listener registered on a scalar source. Receives the new value (`None`
/// when the source transitioned to empty) on every update, in update order.
pub type ScalarListener<V, H> = Box<dyn FnMut(Option<Payload<V, H>>) -> Result<(), LinkError>>;

/// Listener registered on a vector source. Receives one [`VectorEvent`] per
/// structural mutation, in application order.
pub type VectorListener<V, H> = Box<dyn FnMut(VectorEvent<V, H>) -> Result<(), LinkError>>;

/// A single observable value owned by a source system.
pub trait ScalarSource {
    /// Plain payload type.
    type Value: Clone + 'static;
    /// Managed-handle payload type.
    type Handle: ManagedHandle + 'static;
    /// Cancellation guard returned by [`subscribe`](Self::subscribe).
    type Subscription;

    /// Synchronous read of the current value.
    fn get(&self) -> Option<Payload<Self::Value, Self::Handle>>;

    /// Register a change listener invoked synchronously on every update.
    fn subscribe(&self, listener: ScalarListener<Self::Value, Self::Handle>)
    -> Self::Subscription;
}

/// An ordered observable sequence owned by a source system.
pub trait VectorSource {
    /// Plain payload type.
    type Value: Clone + 'static;
    /// Managed-handle payload type.
    type Handle: ManagedHandle + 'static;
    /// Cancellation guard returned by [`subscribe`](Self::subscribe).
    type Subscription;

    /// Synchronous length query.
    fn len(&self) -> usize;

    /// Whether the sequence is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronous indexed read.
    ///
    /// # Panics
    ///
    /// Implementations may panic when `index >= len()`.
    fn at(&self, index: usize) -> Payload<Self::Value, Self::Handle>;

    /// Register a mutation listener invoked synchronously, in application
    /// order, for every structural mutation.
    fn subscribe(&self, listener: VectorListener<Self::Value, Self::Handle>)
    -> Self::Subscription;
}
