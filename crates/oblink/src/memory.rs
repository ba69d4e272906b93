#![forbid(unsafe_code)]

//! In-memory source implementations and an instrumented handle.
//!
//! [`MemoryScalar`] and [`MemoryVector`] are reference implementations of
//! the source traits: single-threaded, synchronous dispatch in registration
//! order, delivery stopping at the first failing listener (the error
//! surfaces from the mutating call). They stand in for a real host system
//! in tests, examples, and integration smoke checks.
//!
//! [`HandleLedger`] and [`LedgerHandle`] implement [`ManagedHandle`] with
//! full accounting: every retain and release is recorded, double releases
//! are counted instead of ignored, and each reference carries a distinct id
//! so a retained reference can be told apart from the source's copy.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use oblink_reactive::Subscription;

use crate::error::LinkError;
use crate::payload::{ManagedHandle, Payload};
use crate::source::{
    MutationKind, ScalarListener, ScalarSource, VectorEvent, VectorListener, VectorSource,
};

type SharedScalarListener<V, H> = Rc<RefCell<ScalarListener<V, H>>>;
type SharedVectorListener<V, H> = Rc<RefCell<VectorListener<V, H>>>;

// ---------------------------------------------------------------------------
// MemoryScalar
// ---------------------------------------------------------------------------

struct ScalarInner<V, H> {
    value: Option<Payload<V, H>>,
    listeners: Vec<Weak<RefCell<ScalarListener<V, H>>>>,
}

/// An in-memory scalar source.
///
/// Cloning shares the same inner state.
pub struct MemoryScalar<V, H: ManagedHandle> {
    inner: Rc<RefCell<ScalarInner<V, H>>>,
}

impl<V, H: ManagedHandle> Clone for MemoryScalar<V, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + 'static, H: ManagedHandle + 'static> MemoryScalar<V, H> {
    /// Create a scalar holding `initial`.
    #[must_use]
    pub fn new(initial: Option<Payload<V, H>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ScalarInner {
                value: initial,
                listeners: Vec::new(),
            })),
        }
    }

    /// Create an empty scalar.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(None)
    }

    /// Store a new value and notify listeners in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first listener failure; remaining listeners are not
    /// invoked for this update.
    pub fn set(&self, payload: Payload<V, H>) -> Result<(), LinkError> {
        self.inner.borrow_mut().value = Some(payload.clone());
        self.dispatch(Some(payload))
    }

    /// Transition to empty and notify listeners.
    ///
    /// # Errors
    ///
    /// Returns the first listener failure.
    pub fn clear(&self) -> Result<(), LinkError> {
        self.inner.borrow_mut().value = None;
        self.dispatch(None)
    }

    fn dispatch(&self, update: Option<Payload<V, H>>) -> Result<(), LinkError> {
        let listeners: Vec<SharedScalarListener<V, H>> = {
            let mut inner = self.inner.borrow_mut();
            inner.listeners.retain(|w| w.strong_count() > 0);
            inner.listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in &listeners {
            (&mut *listener.borrow_mut())(update.clone())?;
        }
        Ok(())
    }
}

impl<V: Clone + 'static, H: ManagedHandle + 'static> ScalarSource for MemoryScalar<V, H> {
    type Value = V;
    type Handle = H;
    type Subscription = Subscription;

    fn get(&self) -> Option<Payload<V, H>> {
        self.inner.borrow().value.clone()
    }

    fn subscribe(&self, listener: ScalarListener<V, H>) -> Subscription {
        let strong = Rc::new(RefCell::new(listener));
        self.inner.borrow_mut().listeners.push(Rc::downgrade(&strong));
        Subscription::hold(strong)
    }
}

// ---------------------------------------------------------------------------
// MemoryVector
// ---------------------------------------------------------------------------

struct VectorInner<V, H> {
    items: Vec<Payload<V, H>>,
    listeners: Vec<Weak<RefCell<VectorListener<V, H>>>>,
}

/// An in-memory vector source.
///
/// Cloning shares the same inner state.
pub struct MemoryVector<V, H: ManagedHandle> {
    inner: Rc<RefCell<VectorInner<V, H>>>,
}

impl<V, H: ManagedHandle> Clone for MemoryVector<V, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + 'static, H: ManagedHandle + 'static> Default for MemoryVector<V, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + 'static, H: ManagedHandle + 'static> MemoryVector<V, H> {
    /// Create an empty vector source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VectorInner {
                items: Vec::new(),
                listeners: Vec::new(),
            })),
        }
    }

    /// Insert `payload` at `index` and notify listeners.
    ///
    /// # Errors
    ///
    /// Returns the first listener failure. The local mutation is applied
    /// regardless; delivery stops at the failing listener.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&self, index: usize, payload: Payload<V, H>) -> Result<(), LinkError> {
        self.inner.borrow_mut().items.insert(index, payload.clone());
        self.dispatch(VectorEvent {
            payload,
            index,
            kind: MutationKind::Insert,
        })
    }

    /// Append `payload` at the end and notify listeners.
    ///
    /// # Errors
    ///
    /// Returns the first listener failure.
    pub fn push(&self, payload: Payload<V, H>) -> Result<(), LinkError> {
        let index = self.len();
        self.insert(index, payload)
    }

    /// Remove the element at `index` and notify listeners. The event
    /// carries the removed value.
    ///
    /// # Errors
    ///
    /// Returns the first listener failure.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&self, index: usize) -> Result<Payload<V, H>, LinkError> {
        let removed = self.inner.borrow_mut().items.remove(index);
        self.dispatch(VectorEvent {
            payload: removed.clone(),
            index,
            kind: MutationKind::Erase,
        })?;
        Ok(removed)
    }

    /// Overwrite the element at `index` and notify listeners, returning the
    /// previous occupant.
    ///
    /// # Errors
    ///
    /// Returns the first listener failure.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn set(&self, index: usize, payload: Payload<V, H>) -> Result<Payload<V, H>, LinkError> {
        let previous =
            std::mem::replace(&mut self.inner.borrow_mut().items[index], payload.clone());
        self.dispatch(VectorEvent {
            payload,
            index,
            kind: MutationKind::Set,
        })?;
        Ok(previous)
    }

    /// Deliver `event` verbatim without touching local storage. Exists to
    /// exercise listener fault paths (unsupported kinds) that the regular
    /// mutators never generate.
    ///
    /// # Errors
    ///
    /// Returns the first listener failure.
    pub fn emit(&self, event: VectorEvent<V, H>) -> Result<(), LinkError> {
        self.dispatch(event)
    }

    fn dispatch(&self, event: VectorEvent<V, H>) -> Result<(), LinkError> {
        let listeners: Vec<SharedVectorListener<V, H>> = {
            let mut inner = self.inner.borrow_mut();
            inner.listeners.retain(|w| w.strong_count() > 0);
            inner.listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in &listeners {
            (&mut *listener.borrow_mut())(event.clone())?;
        }
        Ok(())
    }
}

impl<V: Clone + 'static, H: ManagedHandle + 'static> VectorSource for MemoryVector<V, H> {
    type Value = V;
    type Handle = H;
    type Subscription = Subscription;

    fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    fn at(&self, index: usize) -> Payload<V, H> {
        self.inner.borrow().items[index].clone()
    }

    fn subscribe(&self, listener: VectorListener<V, H>) -> Subscription {
        let strong = Rc::new(RefCell::new(listener));
        self.inner.borrow_mut().listeners.push(Rc::downgrade(&strong));
        Subscription::hold(strong)
    }
}

// ---------------------------------------------------------------------------
// HandleLedger / LedgerHandle
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LedgerInner {
    next_reference: u64,
    /// Live references by id, mapped to the resource they point at.
    /// Includes both issued (source-owned) and retained references.
    live: BTreeMap<u64, Rc<str>>,
    /// Ids created by `issue` rather than `retain`; they carry no release
    /// obligation toward the link accounting.
    roots: Vec<u64>,
    retained: u64,
    released: u64,
    double_released: u64,
}

/// Accounting for every reference to every resource it has issued.
///
/// Cloning shares the same books.
#[derive(Clone, Default)]
pub struct HandleLedger {
    inner: Rc<RefCell<LedgerInner>>,
}

impl HandleLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a source-owned reference to `resource`. Not counted as
    /// retained; links never release it.
    #[must_use]
    pub fn issue(&self, resource: &str) -> LedgerHandle {
        let resource: Rc<str> = Rc::from(resource);
        let reference = self.allocate(Rc::clone(&resource));
        self.inner.borrow_mut().roots.push(reference);
        LedgerHandle {
            ledger: self.clone(),
            resource,
            reference,
        }
    }

    /// Number of `retain` calls recorded.
    #[must_use]
    pub fn retained_count(&self) -> u64 {
        self.inner.borrow().retained
    }

    /// Number of releases that hit a live reference.
    #[must_use]
    pub fn released_count(&self) -> u64 {
        self.inner.borrow().released
    }

    /// Number of releases that hit an already-released reference. Always
    /// zero for a correct caller.
    #[must_use]
    pub fn double_release_count(&self) -> u64 {
        self.inner.borrow().double_released
    }

    /// Number of live retained references (issued roots excluded).
    #[must_use]
    pub fn live_retained_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner
            .live
            .keys()
            .filter(|id| !inner.roots.contains(*id))
            .count()
    }

    /// Whether the reference with `id` is still live.
    #[must_use]
    pub fn is_live(&self, id: u64) -> bool {
        self.inner.borrow().live.contains_key(&id)
    }

    fn allocate(&self, resource: Rc<str>) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let reference = inner.next_reference;
        inner.next_reference += 1;
        inner.live.insert(reference, resource);
        reference
    }

    fn record_retain(&self, resource: Rc<str>) -> u64 {
        let reference = self.allocate(resource);
        self.inner.borrow_mut().retained += 1;
        reference
    }

    fn record_release(&self, reference: u64) {
        let mut inner = self.inner.borrow_mut();
        if inner.live.remove(&reference).is_some() {
            inner.released += 1;
        } else {
            inner.double_released += 1;
        }
    }
}

impl std::fmt::Debug for HandleLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("HandleLedger")
            .field("live", &inner.live.len())
            .field("retained", &inner.retained)
            .field("released", &inner.released)
            .field("double_released", &inner.double_released)
            .finish()
    }
}

/// A reference to a ledger-tracked resource.
///
/// `Clone` aliases the same reference id (no new obligation); equality
/// compares the underlying resource, not the reference.
#[derive(Clone)]
pub struct LedgerHandle {
    ledger: HandleLedger,
    resource: Rc<str>,
    reference: u64,
}

impl LedgerHandle {
    /// Name of the resource this handle points at.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Id of this particular reference. Distinct per `issue`/`retain`.
    #[must_use]
    pub fn reference_id(&self) -> u64 {
        self.reference
    }
}

impl PartialEq for LedgerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource
    }
}

impl Eq for LedgerHandle {}

impl std::fmt::Debug for LedgerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerHandle")
            .field("resource", &self.resource)
            .field("reference", &self.reference)
            .finish()
    }
}

impl ManagedHandle for LedgerHandle {
    fn retain(&self) -> Self {
        let reference = self.ledger.record_retain(Rc::clone(&self.resource));
        Self {
            ledger: self.ledger.clone(),
            resource: Rc::clone(&self.resource),
            reference,
        }
    }

    fn release(self) {
        self.ledger.record_release(self.reference);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
