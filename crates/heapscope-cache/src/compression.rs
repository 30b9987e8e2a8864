// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compression sniffing for snapshot files.
//!
//! The codec only ever sees plain HSC bytes; a zstd frame around them is
//! recognised by its magic number and removed here.

use std::borrow::Cow;

use crate::error::CacheError;

/// zstd frame magic (`0xFD2FB528` little-endian).
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default zstd level for [`compress`].
pub const DEFAULT_LEVEL: i32 = 3;

/// Compression detected on a byte stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    /// Plain bytes.
    None,
    /// A zstd frame.
    Zstd,
}

/// Detects compression from the first bytes of `bytes`.
pub fn sniff(bytes: &[u8]) -> Compression {
    if bytes.starts_with(&ZSTD_MAGIC) {
        Compression::Zstd
    } else {
        Compression::None
    }
}

/// Returns the plain bytes, decompressing when a zstd frame is detected.
pub fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>, CacheError> {
    match sniff(bytes) {
        Compression::None => Ok(Cow::Borrowed(bytes)),
        Compression::Zstd => zstd::stream::decode_all(bytes)
            .map(Cow::Owned)
            .map_err(CacheError::Decompress),
    }
}

/// Wraps `bytes` in a zstd frame at `level`.
pub fn compress(bytes: &[u8], level: i32) -> std::io::Result<Vec<u8>> {
    zstd::stream::encode_all(bytes, level)
}
