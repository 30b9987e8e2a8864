// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HSC reading primitives and error types.

use bytemuck::Pod;
use thiserror::Error;

use super::types::{HscDirectory, HscHeader};
use crate::graph::BuildError;

/// Errors that can occur when decoding an HSC snapshot.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input is too small to contain a header.
    #[error("input too small: {size} bytes, minimum {minimum}")]
    FileTooSmall {
        /// Actual size.
        size: usize,
        /// Minimum size.
        minimum: usize,
    },

    /// Magic bytes don't match.
    #[error("invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: [u8; 8],
        /// Magic bytes found.
        actual: [u8; 8],
    },

    /// Declared file length differs from the input length (truncation).
    #[error("header declares {declared} bytes, input has {actual}")]
    LengthMismatch {
        /// Length recorded in the header.
        declared: u64,
        /// Length of the input.
        actual: usize,
    },

    /// Body digest does not match the header.
    #[error("body digest mismatch")]
    DigestMismatch,

    /// Section extends past the end of the input.
    #[error("section {name} out of bounds: offset {offset}, length {length}, file size {file_size}")]
    SectionOutOfBounds {
        /// Section name.
        name: &'static str,
        /// Section offset.
        offset: u64,
        /// Section length in bytes.
        length: u64,
        /// Input size.
        file_size: usize,
    },

    /// Section offset is not aligned.
    #[error("section {name} at offset {offset} is not {alignment}-byte aligned")]
    AlignmentViolation {
        /// Section name.
        name: &'static str,
        /// Section offset.
        offset: u64,
        /// Required alignment.
        alignment: usize,
    },

    /// Data not properly aligned for the target type.
    #[error("alignment error: {0}")]
    Alignment(#[from] bytemuck::PodCastError),

    /// A sublist range leaves its data table or is not contiguous with its predecessor.
    #[error("{index_name}[{entry_index}] range ({start}..{end}) is invalid for {data_name} of length {data_len}")]
    IndexRangeOutOfBounds {
        /// Table holding the range.
        index_name: &'static str,
        /// Row holding the range.
        entry_index: usize,
        /// Range start.
        start: u64,
        /// Range end.
        end: u64,
        /// Table the range points into.
        data_name: &'static str,
        /// Length of that table.
        data_len: usize,
    },

    /// Reserved bytes must be zero.
    #[error("non-zero reserved bytes in {field} at index {index}")]
    NonZeroReservedBytes {
        /// Row type.
        field: &'static str,
        /// Row index.
        index: usize,
    },

    /// Unknown tag value.
    #[error("invalid {column} tag {tag} at index {index}")]
    InvalidTag {
        /// Column name.
        column: &'static str,
        /// Tag value.
        tag: u8,
        /// Row index.
        index: usize,
    },

    /// String bytes are not valid UTF-8.
    #[error("string {index} is not valid UTF-8")]
    InvalidUtf8 {
        /// String index.
        index: usize,
    },

    /// The decoded columns do not form a valid graph.
    #[error("graph: {0}")]
    Graph(#[from] BuildError),
}

/// Reads and checks the header. Works on unaligned input.
pub fn read_header(data: &[u8]) -> Result<HscHeader, DecodeError> {
    let header_size = std::mem::size_of::<HscHeader>();
    if data.len() < header_size {
        return Err(DecodeError::FileTooSmall {
            size: data.len(),
            minimum: header_size,
        });
    }
    let header: HscHeader = bytemuck::pod_read_unaligned(&data[..header_size]);
    if header.magic != HscHeader::MAGIC_V1 {
        return Err(DecodeError::InvalidMagic {
            expected: HscHeader::MAGIC_V1,
            actual: header.magic,
        });
    }
    if header.file_len() != data.len() as u64 {
        return Err(DecodeError::LengthMismatch {
            declared: header.file_len(),
            actual: data.len(),
        });
    }
    if header.reserved0_le != 0 || header.reserved.iter().any(|b| *b != 0) {
        return Err(DecodeError::NonZeroReservedBytes {
            field: "header",
            index: 0,
        });
    }
    Ok(header)
}

/// Reads the section directory. Works on unaligned input.
#[allow(clippy::cast_possible_truncation)]
pub fn read_directory(data: &[u8], header: &HscHeader) -> Result<HscDirectory, DecodeError> {
    let bytes = read_bytes(
        data,
        header.dir_off(),
        std::mem::size_of::<HscDirectory>() as u64,
        "directory",
    )?;
    Ok(bytemuck::pod_read_unaligned(bytes))
}

/// Reads `count` rows of `T` at `offset`.
///
/// The offset must be 8-byte aligned; the slice cast also requires `data`
/// itself to be suitably aligned.
#[allow(clippy::cast_possible_truncation)]
pub fn read_slice<'a, T: Pod>(
    data: &'a [u8],
    offset: u64,
    count: u64,
    name: &'static str,
) -> Result<&'a [T], DecodeError> {
    if offset % 8 != 0 {
        return Err(DecodeError::AlignmentViolation {
            name,
            offset,
            alignment: 8,
        });
    }
    let byte_len = count.saturating_mul(std::mem::size_of::<T>() as u64);
    let slice = read_bytes(data, offset, byte_len, name)?;
    Ok(bytemuck::try_cast_slice(slice)?)
}

/// Reads `length` bytes at `offset`.
#[allow(clippy::cast_possible_truncation)]
pub fn read_bytes<'a>(
    data: &'a [u8],
    offset: u64,
    length: u64,
    name: &'static str,
) -> Result<&'a [u8], DecodeError> {
    let end = offset.saturating_add(length);
    if end > data.len() as u64 {
        return Err(DecodeError::SectionOutOfBounds {
            name,
            offset,
            length,
            file_size: data.len(),
        });
    }
    Ok(&data[offset as usize..end as usize])
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    fn header_bytes(len: u64) -> Vec<u8> {
        let mut header = HscHeader::zeroed();
        header.magic = HscHeader::MAGIC_V1;
        header.file_len_le = len.to_le();
        let mut data = bytemuck::bytes_of(&header).to_vec();
        data.resize(len as usize, 0);
        data
    }

    #[test]
    fn rejects_too_small() {
        assert!(matches!(
            read_header(&[0u8; 10]),
            Err(DecodeError::FileTooSmall { .. })
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = header_bytes(128);
        data[0..8].copy_from_slice(b"NOTAHSC!");
        assert!(matches!(read_header(&data), Err(DecodeError::InvalidMagic { .. })));
    }

    #[test]
    fn rejects_truncation() {
        let data = header_bytes(256);
        assert!(matches!(
            read_header(&data[..200]),
            Err(DecodeError::LengthMismatch { declared: 256, actual: 200 })
        ));
    }

    #[test]
    fn accepts_unaligned_header() {
        let data = header_bytes(128);
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&data);
        assert!(read_header(&shifted[1..]).is_ok());
    }

    #[test]
    fn slices_check_bounds_and_alignment() {
        let data = vec![0u8; 64];
        assert!(matches!(
            read_slice::<u64>(&data, 4, 1, "x"),
            Err(DecodeError::AlignmentViolation { .. })
        ));
        assert!(matches!(
            read_slice::<u64>(&data, 56, 2, "x"),
            Err(DecodeError::SectionOutOfBounds { .. })
        ));
        assert!(matches!(read_bytes(&data, 60, 4, "x"), Ok(b) if b.len() == 4));
    }
}
