#![forbid(unsafe_code)]

//! One-way bridge between two reactive-value systems.
//!
//! `oblink` mirrors a *source* observable system into
//! [`oblink_reactive`] sink containers: one [`ScalarLink`] per observed
//! value, one [`VectorLink`] per observed sequence. A link performs an
//! initial snapshot, then translates every source notification into the
//! sink, synchronously and in order, for the lifetime of the subscription.
//! The sink never writes back.
//!
//! Payloads are classified once at the boundary into a [`Payload`]: plain
//! values flow through untouched, while [`ManagedHandle`]s — values whose
//! underlying resource has an externally managed lifetime — are retained as
//! independent references and released exactly once when superseded or
//! removed.
//!
//! # Example
//!
//! ```
//! use oblink::memory::{HandleLedger, LedgerHandle, MemoryVector};
//! use oblink::{Payload, VectorLinkBuilder};
//!
//! let ledger = HandleLedger::new();
//! let source: MemoryVector<String, LedgerHandle> = MemoryVector::new();
//! source.push(Payload::Plain("alpha".to_string()))?;
//! source.push(Payload::Managed(ledger.issue("beta")))?;
//!
//! let link = VectorLinkBuilder::new()
//!     .source(&source)
//!     .view_model(|payload: Payload<String, LedgerHandle>| match payload {
//!         Payload::Plain(v) => v,
//!         Payload::Managed(h) => h.resource().to_string(),
//!     })
//!     .link()?;
//!
//! source.insert(1, Payload::Plain("gamma".to_string()))?;
//! assert_eq!(link.sink().to_vec(), vec!["alpha", "gamma", "beta"]);
//!
//! let _sink = link.unlink();
//! assert_eq!(ledger.retained_count(), ledger.released_count());
//! # Ok::<(), oblink::LinkError>(())
//! ```
//!
//! # Concurrency
//!
//! Single-threaded, callback-driven, cooperative: a link performs no work
//! except in direct response to a synchronous source notification, and
//! every notification runs to completion before the next one is processed.
//! No coalescing, no reordering, no background threads.

pub mod error;
pub mod memory;
pub mod payload;
pub mod scalar;
pub mod source;
pub mod vector;

pub use error::LinkError;
pub use payload::{ManagedHandle, NoHandle, Payload};
pub use scalar::{ScalarLink, ScalarLinkBuilder};
pub use source::{
    MutationKind, ScalarListener, ScalarSource, VectorEvent, VectorListener, VectorSource,
};
pub use vector::{VectorLink, VectorLinkBuilder};
