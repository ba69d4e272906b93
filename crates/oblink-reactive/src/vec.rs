#![forbid(unsafe_code)]

//! Observable ordered collection with positional structural mutations.
//!
//! # Design
//!
//! [`ObservableVec<T>`] is the sequence counterpart of
//! [`Observable`](crate::Observable): shared `Rc<RefCell<..>>` storage, weak
//! subscriber callbacks pruned lazily, a version counter bumped once per
//! mutation. Subscribers receive a [`VecChange`] describing exactly one
//! positional mutation, in the order mutations were applied.
//!
//! # Invariants
//!
//! 1. Exactly one [`VecChange`] is emitted per mutating call, after the
//!    items have been updated.
//! 2. Subscribers are notified in registration order.
//! 3. Element order always mirrors the order of applied mutations; there is
//!    no coalescing or reordering.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Out-of-range index | `insert` past `len`, `remove`/`replace` at `>= len` | Panics, same contract as `Vec` |
//! | Re-entrant mutation | Mutating from within a subscriber callback | Panics (RefCell borrow rules) |

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::subscription::Subscription;

/// A single structural mutation, delivered to subscribers by reference.
#[derive(Debug)]
pub enum VecChange<'a, T> {
    /// `value` was inserted at `index`; later elements shifted right.
    Inserted { index: usize, value: &'a T },
    /// The element at `index` was removed; later elements shifted left.
    Removed { index: usize },
    /// The element at `index` was replaced by `value`.
    Replaced { index: usize, value: &'a T },
}

type VecCallbackRc<T> = Rc<dyn for<'a> Fn(VecChange<'a, T>)>;
type VecCallbackWeak<T> = Weak<dyn for<'a> Fn(VecChange<'a, T>)>;

/// Shared interior for [`ObservableVec<T>`].
struct VecInner<T> {
    items: Vec<T>,
    version: u64,
    subscribers: Vec<VecCallbackWeak<T>>,
}

/// A shared, version-tracked ordered collection with per-mutation
/// notification.
///
/// Cloning an `ObservableVec` creates a new handle to the **same** inner
/// state.
pub struct ObservableVec<T> {
    inner: Rc<RefCell<VecInner<T>>>,
}

impl<T> Clone for ObservableVec<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableVec")
            .field("items", &inner.items)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: 'static> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ObservableVec<T> {
    /// Create an empty observable collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecInner {
                items: Vec::new(),
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Access the current items by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.borrow().items)
    }

    /// Insert `value` at `index`, shifting later elements right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, or when called re-entrantly from a
    /// subscriber callback.
    pub fn insert(&self, index: usize, value: T) {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            inner.items.insert(index, value);
            inner.version += 1;
            Self::live_callbacks(&mut inner)
        };
        let inner = self.inner.borrow();
        for cb in &callbacks {
            cb(VecChange::Inserted {
                index,
                value: &inner.items[index],
            });
        }
    }

    /// Append `value` at the end.
    pub fn push(&self, value: T) {
        let index = self.len();
        self.insert(index, value);
    }

    /// Remove and return the element at `index`, shifting later elements
    /// left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`, or when called re-entrantly from a
    /// subscriber callback.
    pub fn remove(&self, index: usize) -> T {
        let (removed, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            let removed = inner.items.remove(index);
            inner.version += 1;
            let callbacks = Self::live_callbacks(&mut inner);
            (removed, callbacks)
        };
        for cb in &callbacks {
            cb(VecChange::Removed { index });
        }
        removed
    }

    /// Replace the element at `index` with `value`, returning the previous
    /// occupant.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`, or when called re-entrantly from a
    /// subscriber callback.
    pub fn replace(&self, index: usize, value: T) -> T {
        let (previous, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            let previous = std::mem::replace(&mut inner.items[index], value);
            inner.version += 1;
            let callbacks = Self::live_callbacks(&mut inner);
            (previous, callbacks)
        };
        let inner = self.inner.borrow();
        for cb in &callbacks {
            cb(VecChange::Replaced {
                index,
                value: &inner.items[index],
            });
        }
        previous
    }

    /// Subscribe to structural mutations. The callback receives one
    /// [`VecChange`] per mutating call, after the items were updated.
    ///
    /// Returns a [`Subscription`] guard; dropping it unsubscribes.
    pub fn subscribe(&self, callback: impl for<'a> Fn(VecChange<'a, T>) + 'static) -> Subscription {
        let strong: VecCallbackRc<T> = Rc::new(callback);
        self.inner.borrow_mut().subscribers.push(Rc::downgrade(&strong));
        Subscription::hold(strong)
    }

    /// Current version number. Increments by 1 per mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of currently registered subscribers (including dead ones not
    /// yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn live_callbacks(inner: &mut VecInner<T>) -> Vec<VecCallbackRc<T>> {
        inner.subscribers.retain(|w| w.strong_count() > 0);
        inner.subscribers.iter().filter_map(Weak::upgrade).collect()
    }
}

impl<T: Clone + 'static> ObservableVec<T> {
    /// Clone of the element at `index`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.borrow().items.get(index).cloned()
    }

    /// Clone of all current items.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.borrow().items.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_push_remove_replace() {
        let vec = ObservableVec::new();
        vec.push("a");
        vec.push("c");
        vec.insert(1, "b");
        assert_eq!(vec.to_vec(), vec!["a", "b", "c"]);

        let removed = vec.remove(0);
        assert_eq!(removed, "a");
        assert_eq!(vec.to_vec(), vec!["b", "c"]);

        let previous = vec.replace(1, "z");
        assert_eq!(previous, "c");
        assert_eq!(vec.to_vec(), vec!["b", "z"]);

        assert_eq!(vec.version(), 5);
    }

    #[test]
    fn empty_and_len() {
        let vec = ObservableVec::<u32>::new();
        assert!(vec.is_empty());
        assert_eq!(vec.len(), 0);

        vec.push(1);
        assert!(!vec.is_empty());
        assert_eq!(vec.len(), 1);
    }

    #[test]
    fn events_describe_each_mutation() {
        let vec = ObservableVec::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_clone = Rc::clone(&log);
        let _sub = vec.subscribe(move |change| {
            let entry = match change {
                VecChange::Inserted { index, value } => format!("ins {index} {value}"),
                VecChange::Removed { index } => format!("rem {index}"),
                VecChange::Replaced { index, value } => format!("rep {index} {value}"),
            };
            log_clone.borrow_mut().push(entry);
        });

        vec.push(10);
        vec.insert(0, 5);
        vec.replace(1, 20);
        vec.remove(0);

        assert_eq!(
            *log.borrow(),
            vec!["ins 0 10", "ins 0 5", "rep 1 20", "rem 0"]
        );
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let vec = ObservableVec::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_clone = Rc::clone(&log);
        let sub = vec.subscribe(move |change| {
            if let VecChange::Inserted { value, .. } = change {
                log_clone.borrow_mut().push(*value);
            }
        });

        vec.push(1);
        drop(sub);
        vec.push(2);

        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn event_fires_after_items_updated() {
        let vec = ObservableVec::new();
        let vec_view = vec.clone();
        let seen_len = Rc::new(RefCell::new(Vec::new()));

        let seen = Rc::clone(&seen_len);
        let _sub = vec.subscribe(move |_| {
            seen.borrow_mut().push(vec_view.len());
        });

        vec.push(1);
        vec.push(2);
        vec.remove(0);

        assert_eq!(*seen_len.borrow(), vec![1, 2, 1]);
    }

    #[test]
    fn get_out_of_range_is_none() {
        let vec = ObservableVec::new();
        vec.push(1);
        assert_eq!(vec.get(0), Some(1));
        assert_eq!(vec.get(1), None);
    }

    #[test]
    #[should_panic(expected = "insertion index")]
    fn insert_past_len_panics() {
        let vec = ObservableVec::new();
        vec.insert(1, 42);
    }

    #[test]
    fn clone_shares_state() {
        let a = ObservableVec::new();
        let b = a.clone();
        a.push(1);
        b.push(2);
        assert_eq!(a.to_vec(), vec![1, 2]);
        assert_eq!(a.version(), 2);
    }
}
