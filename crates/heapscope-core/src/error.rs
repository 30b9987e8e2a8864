// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Query-level errors and completeness-tagged results.

use serde::Serialize;
use thiserror::Error;

use crate::graph::BuildError;
use crate::hsc::DecodeError;
use crate::ident::{IdParseError, ObjectId};

/// Coarse error classification for callers that map errors to responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown object or class.
    NotFound,
    /// Malformed argument.
    InvalidInput,
    /// Snapshot bytes could not be turned into a graph.
    DecodeFailure,
    /// A deadline expired and the caller asked for a complete result.
    Timeout,
    /// The graph would exceed the configured memory ceiling.
    ResourceExhaustion,
}

/// Errors returned by [`HeapAnalysis`](crate::HeapAnalysis) queries and construction.
#[derive(Debug, Error)]
pub enum HeapError {
    /// No object with this identifier exists in the graph.
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),
    /// No class with this name exists in the graph.
    #[error("class {0:?} not found")]
    ClassNotFound(String),
    /// Identifier text could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdParseError),
    /// Other malformed argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Snapshot decoding failed.
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] DecodeError),
    /// Graph construction failed.
    #[error("graph build failed: {0}")]
    Build(#[from] BuildError),
    /// The operation ran out of time.
    #[error("{operation} did not finish before its deadline")]
    Timeout {
        /// Name of the operation.
        operation: &'static str,
    },
    /// The graph is larger than the configured ceiling.
    #[error("graph needs an estimated {required} bytes, limit is {limit}")]
    ResourceExhausted {
        /// Estimated resident bytes.
        required: u64,
        /// Configured ceiling.
        limit: u64,
    },
}

impl HeapError {
    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ObjectNotFound(_) | Self::ClassNotFound(_) => ErrorKind::NotFound,
            Self::InvalidId(_) | Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Decode(_) | Self::Build(_) => ErrorKind::DecodeFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhaustion,
        }
    }
}

/// A value plus whether the work producing it ran to completion.
///
/// Deadline-bounded operations return whatever they gathered before the
/// deadline with `complete == false` instead of failing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    /// The (possibly partial) result.
    pub value: T,
    /// `false` when the deadline cut the work short.
    pub complete: bool,
}

impl<T> Outcome<T> {
    /// A finished result.
    pub fn complete(value: T) -> Self {
        Self {
            value,
            complete: true,
        }
    }

    /// A partial result.
    pub fn partial(value: T) -> Self {
        Self {
            value,
            complete: false,
        }
    }

    /// Maps the value, keeping the completeness flag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            complete: self.complete,
        }
    }

    /// Converts a partial result into [`HeapError::Timeout`].
    pub fn into_complete(self, operation: &'static str) -> Result<T, HeapError> {
        if self.complete {
            Ok(self.value)
        } else {
            Err(HeapError::Timeout { operation })
        }
    }
}
