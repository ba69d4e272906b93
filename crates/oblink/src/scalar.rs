#![forbid(unsafe_code)]

//! One-way link from a scalar source to an [`Observable`] sink.
//!
//! Setup performs an initial snapshot, then registers a change listener
//! that translates every update for the lifetime of the subscription. Data
//! flows strictly source → sink; the sink never writes back.
//!
//! # Handle tracking
//!
//! When a managed payload enters the link, the link retains an independent
//! reference and keeps it as the *tracked handle*. An incoming managed
//! update releases the previously tracked handle **before** retaining its
//! replacement. A plain or absent update leaves the tracked handle in
//! place; it is released when the next managed value supersedes it or when
//! [`ScalarLink::unlink`] runs.
//!
//! # Teardown
//!
//! Dropping a [`ScalarLink`] (or the subscription inside it) cancels
//! delivery but does **not** release the tracked handle — cancellation is
//! not retroactive. Callers that want release-on-teardown call
//! [`ScalarLink::unlink`].

use std::cell::RefCell;
use std::rc::Rc;

use oblink_reactive::Observable;
use tracing::debug;

use crate::error::LinkError;
use crate::payload::{ManagedHandle, Payload};
use crate::source::ScalarSource;

type Decorator<V, H> = Rc<dyn Fn(Payload<V, H>) -> Payload<V, H>>;
type Projection<V, H, Out> = Rc<dyn Fn(Payload<V, H>) -> Out>;

/// Builder for a [`ScalarLink`].
///
/// `Out` is the sink element type: `Payload<Value, Handle>` until a
/// [`view_model`](Self::view_model) projection replaces it.
pub struct ScalarLinkBuilder<'a, Src: ScalarSource, Out> {
    source: Option<&'a Src>,
    decorator: Decorator<Src::Value, Src::Handle>,
    project: Projection<Src::Value, Src::Handle, Out>,
}

impl<'a, Src: ScalarSource> ScalarLinkBuilder<'a, Src, Payload<Src::Value, Src::Handle>> {
    /// Start a builder with an identity decorator and no view-model.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            decorator: Rc::new(|payload| payload),
            project: Rc::new(|payload| payload),
        }
    }
}

impl<'a, Src: ScalarSource> Default for ScalarLinkBuilder<'a, Src, Payload<Src::Value, Src::Handle>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, Src: ScalarSource, Out: 'static> ScalarLinkBuilder<'a, Src, Out> {
    /// The scalar to observe. Required.
    #[must_use]
    pub fn source(mut self, source: &'a Src) -> Self {
        self.source = Some(source);
        self
    }

    /// Pure transformation applied to every payload after lifecycle
    /// adjustment and before any view-model. Defaults to identity.
    #[must_use]
    pub fn decorator(
        mut self,
        decorator: impl Fn(Payload<Src::Value, Src::Handle>) -> Payload<Src::Value, Src::Handle> + 'static,
    ) -> Self {
        self.decorator = Rc::new(decorator);
        self
    }

    /// Construct a richer sink value from every decorated payload. Replaces
    /// the sink element type.
    #[must_use]
    pub fn view_model<T: 'static>(
        self,
        view_model: impl Fn(Payload<Src::Value, Src::Handle>) -> T + 'static,
    ) -> ScalarLinkBuilder<'a, Src, T> {
        ScalarLinkBuilder {
            source: self.source,
            decorator: self.decorator,
            project: Rc::new(view_model),
        }
    }

    /// Snapshot the source into a fresh sink and subscribe for updates.
    ///
    /// # Errors
    ///
    /// [`LinkError::MissingArgument`] when no source was provided.
    pub fn link(self) -> Result<ScalarLink<Src, Out>, LinkError> {
        let source = self.source.ok_or(LinkError::MissingArgument("source"))?;

        let tracked: Rc<RefCell<Option<Src::Handle>>> = Rc::new(RefCell::new(None));
        let initial = source
            .get()
            .map(|payload| admit(&tracked, &*self.decorator, &*self.project, payload));
        debug!(has_initial = initial.is_some(), "scalar link established");
        let sink = Observable::new(initial);

        let sink_writer = sink.clone();
        let tracked_state = Rc::clone(&tracked);
        let decorator = Rc::clone(&self.decorator);
        let project = Rc::clone(&self.project);
        let subscription = source.subscribe(Box::new(move |incoming| {
            match incoming {
                Some(payload) => {
                    let out = admit(&tracked_state, &*decorator, &*project, payload);
                    sink_writer.set(Some(out));
                }
                None => sink_writer.set(None),
            }
            Ok(())
        }));

        Ok(ScalarLink {
            sink,
            tracked,
            subscription,
        })
    }
}

/// Translate one incoming payload: adjust handle tracking, decorate,
/// project.
///
/// For a managed payload the previously tracked handle is released first,
/// then an independent reference to the incoming handle is retained and
/// stored; an alias of it feeds the decorator/view-model pipeline.
fn admit<V, H: ManagedHandle, Out>(
    tracked: &RefCell<Option<H>>,
    decorator: &dyn Fn(Payload<V, H>) -> Payload<V, H>,
    project: &dyn Fn(Payload<V, H>) -> Out,
    payload: Payload<V, H>,
) -> Out {
    let working = match payload {
        Payload::Managed(incoming) => {
            if let Some(previous) = tracked.borrow_mut().take() {
                previous.release();
            }
            let held = incoming.retain();
            let alias = held.clone();
            *tracked.borrow_mut() = Some(held);
            Payload::Managed(alias)
        }
        plain @ Payload::Plain(_) => plain,
    };
    project(decorator(working))
}

/// A live scalar link: the sink, the tracked-handle state, and the source's
/// cancellation guard.
pub struct ScalarLink<Src: ScalarSource, Out: 'static> {
    sink: Observable<Option<Out>>,
    tracked: Rc<RefCell<Option<Src::Handle>>>,
    subscription: Src::Subscription,
}

impl<Src: ScalarSource, Out: 'static> std::fmt::Debug for ScalarLink<Src, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarLink")
            .field("has_tracked", &self.has_tracked())
            .finish_non_exhaustive()
    }
}

impl<Src: ScalarSource, Out: 'static> ScalarLink<Src, Out> {
    /// The sink container this link writes into. `None` mirrors an empty
    /// source.
    #[must_use]
    pub fn sink(&self) -> &Observable<Option<Out>> {
        &self.sink
    }

    /// Whether the link currently holds a retained handle.
    #[must_use]
    pub fn has_tracked(&self) -> bool {
        self.tracked.borrow().is_some()
    }

    /// Cancel the subscription and release the tracked handle, if any,
    /// returning the sink for continued read-only use.
    pub fn unlink(self) -> Observable<Option<Out>> {
        drop(self.subscription);
        if let Some(held) = self.tracked.borrow_mut().take() {
            held.release();
        }
        self.sink
    }

    /// Split into sink and subscription for callers managing lifetimes
    /// themselves. Handle tracking continues for as long as the
    /// subscription lives; no handle is released by this call.
    pub fn into_parts(self) -> (Observable<Option<Out>>, Src::Subscription) {
        (self.sink, self.subscription)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{HandleLedger, LedgerHandle, MemoryScalar};
    use crate::payload::NoHandle;

    type PlainSource = MemoryScalar<String, NoHandle>;
    type HandleSource = MemoryScalar<String, LedgerHandle>;

    #[test]
    fn missing_source_is_reported_by_name() {
        let err = ScalarLinkBuilder::<PlainSource, _>::new().link().unwrap_err();
        assert_eq!(err, LinkError::MissingArgument("source"));
    }

    #[test]
    fn empty_source_yields_empty_sink_then_mirrors_updates() {
        // Scenario: source starts absent, later holds a plain value.
        let source = PlainSource::empty();
        let link = ScalarLinkBuilder::new().source(&source).link().unwrap();

        assert_eq!(link.sink().get(), None);

        source.set(Payload::Plain("x".to_string())).unwrap();
        assert_eq!(link.sink().get(), Some(Payload::Plain("x".to_string())));

        source.clear().unwrap();
        assert_eq!(link.sink().get(), None);
    }

    #[test]
    fn decorator_applies_to_snapshot_and_updates() {
        let source = PlainSource::new(Some(Payload::Plain("a".to_string())));
        let link = ScalarLinkBuilder::new()
            .source(&source)
            .decorator(|payload| payload.map_plain(|v| v.to_uppercase()))
            .link()
            .unwrap();

        assert_eq!(link.sink().get(), Some(Payload::Plain("A".to_string())));

        source.set(Payload::Plain("b".to_string())).unwrap();
        assert_eq!(link.sink().get(), Some(Payload::Plain("B".to_string())));
    }

    #[test]
    fn view_model_wraps_decorated_value() {
        let source = PlainSource::new(Some(Payload::Plain("a".to_string())));
        let link = ScalarLinkBuilder::new()
            .source(&source)
            .decorator(|payload| payload.map_plain(|v| v.to_uppercase()))
            .view_model(|payload| format!("vm:{}", payload.as_plain().unwrap()))
            .link()
            .unwrap();

        assert_eq!(link.sink().get(), Some("vm:A".to_string()));

        source.set(Payload::Plain("b".to_string())).unwrap();
        assert_eq!(link.sink().get(), Some("vm:B".to_string()));
    }

    #[test]
    fn snapshot_is_idempotent_across_links() {
        let source = PlainSource::new(Some(Payload::Plain("a".to_string())));
        let first = ScalarLinkBuilder::new().source(&source).link().unwrap();
        let second = ScalarLinkBuilder::new().source(&source).link().unwrap();

        assert_eq!(first.sink().get(), second.sink().get());
    }

    #[test]
    fn managed_snapshot_retains_an_independent_reference() {
        // Scenario: the sink must reflect the link's own reference, not the
        // source's copy.
        let ledger = HandleLedger::new();
        let h1 = ledger.issue("h1");
        let source = HandleSource::new(Some(Payload::Managed(h1.clone())));

        let link = ScalarLinkBuilder::new().source(&source).link().unwrap();

        assert!(link.has_tracked());
        assert_eq!(ledger.retained_count(), 1);
        let sink_handle = link
            .sink()
            .with(|v| v.clone().unwrap().as_managed().unwrap().clone());
        assert_eq!(sink_handle.resource(), "h1");
        assert_ne!(sink_handle.reference_id(), h1.reference_id());
    }

    #[test]
    fn managed_update_releases_previous_before_tracking_next() {
        let ledger = HandleLedger::new();
        let source = HandleSource::new(Some(Payload::Managed(ledger.issue("h1"))));
        let link = ScalarLinkBuilder::new().source(&source).link().unwrap();

        source.set(Payload::Managed(ledger.issue("h2"))).unwrap();

        assert_eq!(ledger.retained_count(), 2);
        assert_eq!(ledger.released_count(), 1);
        assert_eq!(ledger.double_release_count(), 0);
        let resource = link
            .sink()
            .with(|v| v.clone().unwrap().as_managed().unwrap().resource().to_string());
        assert_eq!(resource, "h2");
    }

    #[test]
    fn plain_update_leaves_tracked_handle_in_place() {
        let ledger = HandleLedger::new();
        let source = HandleSource::new(Some(Payload::Managed(ledger.issue("h1"))));
        let link = ScalarLinkBuilder::new().source(&source).link().unwrap();

        source.set(Payload::Plain("plain".to_string())).unwrap();

        assert!(link.has_tracked());
        assert_eq!(ledger.released_count(), 0);
    }

    #[test]
    fn unlink_releases_tracked_handle_and_stops_delivery() {
        let ledger = HandleLedger::new();
        let source = HandleSource::new(Some(Payload::Managed(ledger.issue("h1"))));
        let link = ScalarLinkBuilder::new().source(&source).link().unwrap();

        let sink = link.unlink();
        assert_eq!(ledger.retained_count(), ledger.released_count());
        assert_eq!(ledger.double_release_count(), 0);

        let before = sink.version();
        source.set(Payload::Plain("late".to_string())).unwrap();
        assert_eq!(sink.version(), before);
    }

    #[test]
    fn drop_cancels_delivery_but_keeps_tracked_reference() {
        let ledger = HandleLedger::new();
        let source = HandleSource::new(Some(Payload::Managed(ledger.issue("h1"))));
        let link = ScalarLinkBuilder::new().source(&source).link().unwrap();

        drop(link);
        // Cancellation is not retroactive: the retained reference is the
        // caller's to release.
        assert_eq!(ledger.released_count(), 0);
        assert_eq!(ledger.live_retained_count(), 1);
    }
}
