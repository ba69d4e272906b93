#![forbid(unsafe_code)]

//! Reactive containers written into by a bridge, observed by everyone else.
//!
//! This crate provides the downstream ("sink") half of an observable link:
//!
//! - [`Observable`]: a shared, version-tracked single value with change
//!   notification via subscriber callbacks.
//! - [`ObservableVec`]: an ordered collection with positional insert, remove,
//!   and replace, emitting a [`VecChange`] per structural mutation.
//! - [`Subscription`]: RAII guard that unsubscribes a callback on drop.
//!
//! # Architecture
//!
//! Both containers use `Rc<RefCell<..>>` for single-threaded shared
//! ownership. Subscribers are stored as `Weak` callbacks and pruned lazily
//! during notification.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation.
//! 2. Subscribers are notified in registration order.
//! 3. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.

pub mod observable;
pub mod subscription;
pub mod vec;

pub use observable::Observable;
pub use subscription::Subscription;
pub use vec::{ObservableVec, VecChange};
