//! # Key Codec
//!
//! Binary layouts of the three index families stored in the `indexes`
//! column family.
//!
//! ```text
//! BlockHash     key: 0x01 | hash bytes                         value: varint(block_number)
//! TxGuid        key: 0x02 | guid bytes                         value: varint(block_number) | varint(tx_index)
//! AddressBlock  key: 0x03 | varint(len) | address | varint(n)  value: varint(tx_index)*
//! ```
//!
//! The leading prefix byte keeps the families in disjoint key spaces. The
//! address is length-prefixed because a varint follows it in the same key.
//! All integers are unsigned LEB128: seven data bits per byte, high bit set
//! on every byte except the last.

use crate::domain::errors::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest LEB128 encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Key prefix of the block-hash → block-number family.
pub const PREFIX_BLOCK_HASH: u8 = 0x01;
/// Key prefix of the tx-guid → location family.
pub const PREFIX_TX_GUID: u8 = 0x02;
/// Key prefix of the (address, block-number) → tx-index-list family.
pub const PREFIX_ADDRESS_BLOCK: u8 = 0x03;

/// The index families persisted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexFamily {
    BlockHash,
    TxGuid,
    AddressBlock,
}

impl IndexFamily {
    /// One-byte key prefix of this family.
    pub const fn prefix(self) -> u8 {
        match self {
            Self::BlockHash => PREFIX_BLOCK_HASH,
            Self::TxGuid => PREFIX_TX_GUID,
            Self::AddressBlock => PREFIX_ADDRESS_BLOCK,
        }
    }

    /// Classify a raw index key by its prefix byte.
    pub fn of_key(key: &[u8]) -> Option<Self> {
        match key.first()? {
            &PREFIX_BLOCK_HASH => Some(Self::BlockHash),
            &PREFIX_TX_GUID => Some(Self::TxGuid),
            &PREFIX_ADDRESS_BLOCK => Some(Self::AddressBlock),
            _ => None,
        }
    }
}

impl fmt::Display for IndexFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockHash => write!(f, "block-hash"),
            Self::TxGuid => write!(f, "tx-guid"),
            Self::AddressBlock => write!(f, "address-block"),
        }
    }
}

// =============================================================================
// VARINT PRIMITIVES
// =============================================================================

/// Append `value` as an unsigned LEB128 varint.
pub fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Decode one varint from the front of `buf`. Returns (value, bytes_consumed).
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value = 0u64;
    let mut shift = 0u32;

    for (i, &byte) in buf.iter().enumerate() {
        // The tenth byte may only carry the top bit of a u64.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(DecodeError::Overflow);
        }
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }

    Err(DecodeError::Truncated)
}

/// Sequential varint reader over a borrowed buffer.
struct VarintReader<'a> {
    buf: &'a [u8],
}

impl<'a> VarintReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn next_u64(&mut self) -> Result<u64, DecodeError> {
        let (value, used) = read_varint(self.buf)?;
        self.buf = &self.buf[used..];
        Ok(value)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() < len {
            return Err(DecodeError::Truncated);
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn finish(self) -> Result<(), DecodeError> {
        match self.buf.len() {
            0 => Ok(()),
            remaining => Err(DecodeError::TrailingBytes { remaining }),
        }
    }
}

// =============================================================================
// KEYS
// =============================================================================

fn prefixed(prefix: u8, body: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + body.len());
    key.push(prefix);
    key.extend_from_slice(body);
    key
}

/// `0x01 | hash`
pub fn encode_hash_key(hash: &[u8]) -> Vec<u8> {
    prefixed(PREFIX_BLOCK_HASH, hash)
}

/// `0x02 | guid`
pub fn encode_guid_key(guid: &[u8]) -> Vec<u8> {
    prefixed(PREFIX_TX_GUID, guid)
}

/// `0x03 | varint(len(address)) | address | varint(block_number)`
pub fn encode_address_block_key(address: &str, block_number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 2 * MAX_VARINT_LEN + address.len());
    key.push(PREFIX_ADDRESS_BLOCK);
    put_varint(&mut key, address.len() as u64);
    key.extend_from_slice(address.as_bytes());
    put_varint(&mut key, block_number);
    key
}

/// Split an address-block key back into its address and block number.
pub fn decode_address_block_key(key: &[u8]) -> Result<(String, u64), DecodeError> {
    let (&prefix, body) = key.split_first().ok_or(DecodeError::Truncated)?;
    if prefix != PREFIX_ADDRESS_BLOCK {
        return Err(DecodeError::WrongPrefix { found: prefix });
    }

    let mut reader = VarintReader::new(body);
    let len = usize::try_from(reader.next_u64()?).map_err(|_| DecodeError::Overflow)?;
    let address = std::str::from_utf8(reader.take(len)?)
        .map_err(|_| DecodeError::InvalidUtf8)?
        .to_owned();
    let block_number = reader.next_u64()?;
    reader.finish()?;

    Ok((address, block_number))
}

// =============================================================================
// VALUES
// =============================================================================

pub fn encode_block_number(block_number: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    put_varint(&mut buf, block_number);
    buf
}

pub fn decode_block_number(bytes: &[u8]) -> Result<u64, DecodeError> {
    let mut reader = VarintReader::new(bytes);
    let block_number = reader.next_u64()?;
    reader.finish()?;
    Ok(block_number)
}

pub fn encode_location(block_number: u64, tx_index: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 * MAX_VARINT_LEN);
    put_varint(&mut buf, block_number);
    put_varint(&mut buf, tx_index);
    buf
}

/// Decode `(block_number, tx_index)`. A buffer holding only the block number
/// is `Truncated`; the missing index is never defaulted.
pub fn decode_location(bytes: &[u8]) -> Result<(u64, u64), DecodeError> {
    let mut reader = VarintReader::new(bytes);
    let block_number = reader.next_u64()?;
    let tx_index = reader.next_u64()?;
    reader.finish()?;
    Ok((block_number, tx_index))
}

pub fn encode_tx_index_list(indexes: &[u64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(indexes.len() * 2);
    for &index in indexes {
        put_varint(&mut buf, index);
    }
    buf
}

/// Decode a list of tx indexes. The count is implied by the buffer length.
pub fn decode_tx_index_list(bytes: &[u8]) -> Result<Vec<u64>, DecodeError> {
    let mut reader = VarintReader::new(bytes);
    let mut indexes = Vec::new();
    while !reader.is_empty() {
        indexes.push(reader.next_u64()?);
    }
    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_varint_layout() {
        assert_eq!(encode_block_number(0), vec![0x00]);
        assert_eq!(encode_block_number(127), vec![0x7F]);
        assert_eq!(encode_block_number(128), vec![0x80, 0x01]);
        assert_eq!(encode_block_number(300), vec![0xAC, 0x02]);
        assert_eq!(encode_block_number(u64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_key_layouts() {
        assert_eq!(encode_hash_key(&[0xAA; 4]), vec![0x01, 0xAA, 0xAA, 0xAA, 0xAA]);
        assert_eq!(encode_guid_key(b"g1"), vec![0x02, b'g', b'1']);
        assert_eq!(encode_address_block_key("A", 7), vec![0x03, 0x01, b'A', 0x07]);
    }

    #[test]
    fn test_family_of_key() {
        assert_eq!(IndexFamily::of_key(&encode_hash_key(&[1; 32])), Some(IndexFamily::BlockHash));
        assert_eq!(IndexFamily::of_key(&encode_guid_key(b"x")), Some(IndexFamily::TxGuid));
        assert_eq!(
            IndexFamily::of_key(&encode_address_block_key("x", 1)),
            Some(IndexFamily::AddressBlock)
        );
        assert_eq!(IndexFamily::of_key(&[0x09]), None);
        assert_eq!(IndexFamily::of_key(&[]), None);
    }

    #[test]
    fn test_truncated_location_is_malformed() {
        let only_block_number = encode_block_number(7);
        assert_eq!(decode_location(&only_block_number), Err(DecodeError::Truncated));
        assert_eq!(decode_location(&[]), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_truncated_varint() {
        assert_eq!(decode_block_number(&[0x80]), Err(DecodeError::Truncated));
        assert_eq!(decode_block_number(&[]), Err(DecodeError::Truncated));
        assert_eq!(decode_tx_index_list(&[0x01, 0x02, 0x80]), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        assert_eq!(
            decode_block_number(&[0x07, 0x01]),
            Err(DecodeError::TrailingBytes { remaining: 1 })
        );
        assert_eq!(
            decode_location(&[0x07, 0x00, 0x05, 0x06]),
            Err(DecodeError::TrailingBytes { remaining: 2 })
        );
    }

    #[test]
    fn test_varint_overflow() {
        let mut too_long = vec![0xFF; MAX_VARINT_LEN - 1];
        too_long.push(0x02);
        assert_eq!(decode_block_number(&too_long), Err(DecodeError::Overflow));

        let eleven_bytes = vec![0x80; MAX_VARINT_LEN + 1];
        assert_eq!(decode_block_number(&eleven_bytes), Err(DecodeError::Overflow));
    }

    #[test]
    fn test_empty_index_list() {
        assert!(encode_tx_index_list(&[]).is_empty());
        assert_eq!(decode_tx_index_list(&[]), Ok(vec![]));
    }

    #[test]
    fn test_address_block_key_rejects_bad_input() {
        assert_eq!(
            decode_address_block_key(&encode_guid_key(b"g")),
            Err(DecodeError::WrongPrefix { found: PREFIX_TX_GUID })
        );
        // Length claims 5 bytes, only 1 present.
        assert_eq!(
            decode_address_block_key(&[PREFIX_ADDRESS_BLOCK, 0x05, b'A']),
            Err(DecodeError::Truncated)
        );
        assert_eq!(
            decode_address_block_key(&[PREFIX_ADDRESS_BLOCK, 0x01, 0xFF, 0x01]),
            Err(DecodeError::InvalidUtf8)
        );
    }

    proptest! {
        #[test]
        fn prop_block_number_roundtrip(n in any::<u64>()) {
            prop_assert_eq!(decode_block_number(&encode_block_number(n)), Ok(n));
        }

        #[test]
        fn prop_location_roundtrip(block in any::<u64>(), index in any::<u64>()) {
            prop_assert_eq!(decode_location(&encode_location(block, index)), Ok((block, index)));
        }

        #[test]
        fn prop_index_list_roundtrip(list in proptest::collection::vec(any::<u64>(), 0..64)) {
            prop_assert_eq!(decode_tx_index_list(&encode_tx_index_list(&list)), Ok(list));
        }

        #[test]
        fn prop_address_block_key_roundtrip(address in ".{0,40}", n in any::<u64>()) {
            let key = encode_address_block_key(&address, n);
            prop_assert_eq!(decode_address_block_key(&key), Ok((address, n)));
        }

        #[test]
        fn prop_families_never_collide(
            payload in proptest::collection::vec(any::<u8>(), 0..48),
            address in ".{0,24}",
            n in any::<u64>(),
        ) {
            let hash_key = encode_hash_key(&payload);
            let guid_key = encode_guid_key(&payload);
            let address_key = encode_address_block_key(&address, n);

            prop_assert_ne!(&hash_key, &guid_key);
            prop_assert_ne!(&hash_key, &address_key);
            prop_assert_ne!(&guid_key, &address_key);
        }

        #[test]
        fn prop_distinct_address_keys(
            a in "[a-z]{0,8}", b in "[a-z]{0,8}", n in any::<u64>(), m in any::<u64>()
        ) {
            prop_assume!(a != b || n != m);
            prop_assert_ne!(encode_address_block_key(&a, n), encode_address_block_key(&b, m));
        }
    }
}
