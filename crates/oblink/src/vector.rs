#![forbid(unsafe_code)]

//! One-way link from a vector source to an [`ObservableVec`] sink.
//!
//! Setup populates the sink in source order, then registers a mutation
//! listener that replays every structural mutation. Alongside the sink the
//! link keeps a *shadow array* of retained handles, index-aligned 1:1 with
//! the sink: the sink stores projected values, so the release bookkeeping
//! for managed payloads needs its own index space.
//!
//! # Replay
//!
//! Each event adjusts shadow and sink as one logical step before control
//! returns to the source's dispatcher, so the two can never drift apart:
//!
//! | Kind   | Shadow array                          | Sink                    |
//! |--------|---------------------------------------|-------------------------|
//! | Insert | retain if managed, insert at index    | insert projected value  |
//! | Erase  | remove entry, release if occupied     | remove at index         |
//! | Set    | release old occupant, retain new      | replace projected value |
//!
//! For `Set`, the old occupant is released **before** the replacement is
//! retained. The `Erase` payload is never retained. An unrecognized kind
//! fails with [`LinkError::UnsupportedMutation`] before any state change.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unsupported kind | Source reports a kind outside Insert/Erase/Set | Error, event not applied |
//! | Out-of-range index | Source delivered an index invalid for its own stream | Panics, same contract as `Vec` |
//!
//! Teardown mirrors the scalar link: dropping the link cancels delivery
//! without releasing retained handles; [`VectorLink::unlink`] releases
//! every occupied shadow slot.

use std::cell::RefCell;
use std::rc::Rc;

use oblink_reactive::ObservableVec;
use tracing::{debug, trace};

use crate::error::LinkError;
use crate::payload::{ManagedHandle, Payload};
use crate::source::{MutationKind, VectorEvent, VectorSource};

type Projection<V, H, Out> = Rc<dyn Fn(Payload<V, H>) -> Out>;
type Shadow<H> = Rc<RefCell<Vec<Option<H>>>>;

/// Builder for a [`VectorLink`].
///
/// `Out` is the sink element type: `Payload<Value, Handle>` until a
/// [`view_model`](Self::view_model) projection replaces it.
pub struct VectorLinkBuilder<'a, Src: VectorSource, Out> {
    source: Option<&'a Src>,
    project: Projection<Src::Value, Src::Handle, Out>,
}

impl<'a, Src: VectorSource> VectorLinkBuilder<'a, Src, Payload<Src::Value, Src::Handle>> {
    /// Start a builder with no view-model.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            project: Rc::new(|payload| payload),
        }
    }
}

impl<'a, Src: VectorSource> Default for VectorLinkBuilder<'a, Src, Payload<Src::Value, Src::Handle>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, Src: VectorSource, Out: 'static> VectorLinkBuilder<'a, Src, Out> {
    /// The sequence to observe. Required.
    #[must_use]
    pub fn source(mut self, source: &'a Src) -> Self {
        self.source = Some(source);
        self
    }

    /// Construct a richer sink element from every payload. Replaces the
    /// sink element type.
    #[must_use]
    pub fn view_model<T: 'static>(
        self,
        view_model: impl Fn(Payload<Src::Value, Src::Handle>) -> T + 'static,
    ) -> VectorLinkBuilder<'a, Src, T> {
        VectorLinkBuilder {
            source: self.source,
            project: Rc::new(view_model),
        }
    }

    /// Populate a fresh sink from the source, in order, and subscribe for
    /// mutations.
    ///
    /// # Errors
    ///
    /// [`LinkError::MissingArgument`] when no source was provided.
    pub fn link(self) -> Result<VectorLink<Src, Out>, LinkError> {
        let source = self.source.ok_or(LinkError::MissingArgument("source"))?;

        let sink = ObservableVec::new();
        let shadow: Shadow<Src::Handle> = Rc::new(RefCell::new(Vec::with_capacity(source.len())));
        for index in 0..source.len() {
            let (working, held) = adopt(source.at(index));
            shadow.borrow_mut().push(held);
            sink.push((self.project)(working));
        }
        debug!(initial_len = sink.len(), "vector link established");

        let sink_writer = sink.clone();
        let shadow_state = Rc::clone(&shadow);
        let project = Rc::clone(&self.project);
        let subscription = source.subscribe(Box::new(move |event| {
            apply(&shadow_state, &sink_writer, &*project, event)
        }));

        Ok(VectorLink {
            sink,
            shadow,
            subscription,
        })
    }
}

/// Normalize one incoming payload: retain an independent reference when it
/// is managed, so the Insert and Set paths cannot skip that step. Returns
/// the working payload (aliasing the retained reference) and the reference
/// to store in the shadow array.
fn adopt<V, H: ManagedHandle>(payload: Payload<V, H>) -> (Payload<V, H>, Option<H>) {
    match payload {
        Payload::Managed(incoming) => {
            let held = incoming.retain();
            let alias = held.clone();
            (Payload::Managed(alias), Some(held))
        }
        plain @ Payload::Plain(_) => (plain, None),
    }
}

/// Replay one mutation onto the shadow array and the sink.
fn apply<V, H: ManagedHandle, Out: 'static>(
    shadow: &RefCell<Vec<Option<H>>>,
    sink: &ObservableVec<Out>,
    project: &dyn Fn(Payload<V, H>) -> Out,
    event: VectorEvent<V, H>,
) -> Result<(), LinkError> {
    let VectorEvent {
        payload,
        index,
        kind,
    } = event;
    trace!(kind = %kind, index, "replaying mutation");
    match kind {
        MutationKind::Insert => {
            let (working, held) = adopt(payload);
            shadow.borrow_mut().insert(index, held);
            sink.insert(index, project(working));
        }
        MutationKind::Erase => {
            if let Some(held) = shadow.borrow_mut().remove(index) {
                held.release();
            }
            sink.remove(index);
        }
        MutationKind::Set => {
            // Release the old occupant before retaining its replacement.
            if let Some(previous) = shadow.borrow_mut()[index].take() {
                previous.release();
            }
            let (working, held) = adopt(payload);
            shadow.borrow_mut()[index] = held;
            sink.replace(index, project(working));
        }
        unsupported => return Err(LinkError::UnsupportedMutation(unsupported)),
    }
    Ok(())
}

/// A live vector link: the sink, the shadow handle array, and the source's
/// cancellation guard.
pub struct VectorLink<Src: VectorSource, Out: 'static> {
    sink: ObservableVec<Out>,
    shadow: Shadow<Src::Handle>,
    subscription: Src::Subscription,
}

impl<Src: VectorSource, Out: 'static> std::fmt::Debug for VectorLink<Src, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorLink")
            .field("len", &self.sink.len())
            .field("tracked_handles", &self.tracked_handles())
            .finish_non_exhaustive()
    }
}

impl<Src: VectorSource, Out: 'static> VectorLink<Src, Out> {
    /// The sink container this link writes into.
    #[must_use]
    pub fn sink(&self) -> &ObservableVec<Out> {
        &self.sink
    }

    /// Length of the shadow array. Always equals `sink().len()`.
    #[must_use]
    pub fn shadow_len(&self) -> usize {
        self.shadow.borrow().len()
    }

    /// Number of shadow slots currently holding a retained handle.
    #[must_use]
    pub fn tracked_handles(&self) -> usize {
        self.shadow.borrow().iter().filter(|slot| slot.is_some()).count()
    }

    /// Cancel the subscription and release every occupied shadow slot,
    /// returning the sink for continued read-only use.
    pub fn unlink(self) -> ObservableVec<Out> {
        drop(self.subscription);
        for slot in self.shadow.borrow_mut().drain(..) {
            if let Some(held) = slot {
                held.release();
            }
        }
        self.sink
    }

    /// Split into sink and subscription for callers managing lifetimes
    /// themselves. Shadow bookkeeping continues for as long as the
    /// subscription lives; no handle is released by this call.
    pub fn into_parts(self) -> (ObservableVec<Out>, Src::Subscription) {
        (self.sink, self.subscription)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
