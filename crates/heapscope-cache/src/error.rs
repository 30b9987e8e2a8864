// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache and source errors.

use heapscope_core::hsc::DecodeError;
use heapscope_core::{ErrorKind, HeapError};
use thiserror::Error;

/// Error returned when a snapshot cannot be fetched or loaded.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The source has no snapshot under this key.
    #[error("snapshot {0:?} not found")]
    NotFound(String),
    /// Reading the snapshot failed.
    #[error("reading snapshot {key:?}: {source}")]
    Io {
        /// Snapshot key.
        key: String,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// The compressed stream is corrupt.
    #[error("decompressing snapshot: {0}")]
    Decompress(#[source] std::io::Error),
    /// The snapshot bytes are invalid.
    #[error("decoding snapshot {key:?}: {source}")]
    Decode {
        /// Snapshot key.
        key: String,
        /// Decoder failure.
        source: DecodeError,
    },
    /// The graph was rejected before analysis (e.g. over the memory ceiling).
    #[error("analysing snapshot {key:?}: {source}")]
    Analysis {
        /// Snapshot key.
        key: String,
        /// Analysis failure.
        source: HeapError,
    },
}

impl CacheError {
    /// Coarse kind, aligned with query errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Io { .. } | Self::Decompress(_) | Self::Decode { .. } => ErrorKind::DecodeFailure,
            Self::Analysis { source, .. } => source.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_failure() {
        assert_eq!(CacheError::NotFound("a".into()).kind(), ErrorKind::NotFound);
        let exhausted = CacheError::Analysis {
            key: "a".into(),
            source: HeapError::ResourceExhausted {
                required: 10,
                limit: 5,
            },
        };
        assert_eq!(exhausted.kind(), ErrorKind::ResourceExhaustion);
        let io = CacheError::Io {
            key: "a".into(),
            source: std::io::Error::other("disk"),
        };
        assert_eq!(io.kind(), ErrorKind::DecodeFailure);
        assert!(io.to_string().contains("disk"));
    }
}
