#![forbid(unsafe_code)]

//! Link fault kinds.
//!
//! Both variants are fatal: a link performs no retry and no partial-failure
//! recovery. Anything else (a release failing, a view-model panicking)
//! propagates unimpeded through the source system's notification dispatch.

use crate::source::MutationKind;

/// Errors raised by link setup and mutation replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A required builder argument was never provided. Carries the
    /// parameter name.
    MissingArgument(&'static str),
    /// A vector source reported a mutation kind the link does not replay.
    /// The event was not applied; the sink is untouched.
    UnsupportedMutation(MutationKind),
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingArgument(name) => write!(f, "required argument `{name}` was not provided"),
            Self::UnsupportedMutation(kind) => write!(f, "unsupported mutation kind: {kind}"),
        }
    }
}

impl std::error::Error for LinkError {}
