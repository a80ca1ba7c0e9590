//! Minimal Solidity ABI codec
//!
//! Covers what the access and catalog contracts use: `string`, `address`
//! and `uint256` arguments, and return tuples made of `uint256`,
//! `address[]`, `uint256[]` and `string[]`. Integers are limited to 64 bits;
//! anything wider is rejected rather than truncated.

use crate::error::RpcError;
use medshare_core::Address;
use tiny_keccak::{Hasher, Keccak};

const WORD: usize = 32;

/// Keccak-256 digest
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// 4-byte function selector for a canonical signature, e.g. `revokeAccess(string,address)`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// A call argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u64),
    String(String),
}

/// Selector followed by the encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(args));
    out
}

/// Head/tail encoding of an argument tuple
pub fn encode(args: &[Token]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Token::Address(addr) => {
                head.extend_from_slice(&[0u8; 12]);
                head.extend_from_slice(addr.as_bytes());
            }
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::String(value) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(value.len() as u64));
                tail.extend_from_slice(value.as_bytes());
                let padding = (WORD - value.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        }
    }

    head.extend(tail);
    head
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Reader over ABI-encoded return data
///
/// Head slots are addressed by index; dynamic values follow the offset
/// stored in their head slot.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Decoder { data }
    }

    /// `uint256` in head slot `index`
    pub fn uint(&self, index: usize) -> Result<u64, RpcError> {
        self.uint_at(slot(index)?)
    }

    /// `address[]` whose offset sits in head slot `index`
    pub fn address_array(&self, index: usize) -> Result<Vec<Address>, RpcError> {
        let (start, len) = self.array_bounds(index)?;
        (0..len).map(|i| self.address_at(start + i * WORD)).collect()
    }

    /// `uint256[]` whose offset sits in head slot `index`
    pub fn uint_array(&self, index: usize) -> Result<Vec<u64>, RpcError> {
        let (start, len) = self.array_bounds(index)?;
        (0..len).map(|i| self.uint_at(start + i * WORD)).collect()
    }

    /// `string[]` whose offset sits in head slot `index`
    pub fn string_array(&self, index: usize) -> Result<Vec<String>, RpcError> {
        let (start, len) = self.array_bounds(index)?;
        (0..len)
            .map(|i| {
                let relative = self.usize_at(start + i * WORD)?;
                let at = start
                    .checked_add(relative)
                    .ok_or_else(|| abi_error("string offset overflows"))?;
                self.string_at(at)
            })
            .collect()
    }

    fn word(&self, offset: usize) -> Result<&'a [u8], RpcError> {
        let end = offset
            .checked_add(WORD)
            .ok_or_else(|| abi_error("offset overflows"))?;
        self.data
            .get(offset..end)
            .ok_or_else(|| abi_error(format!("word at {} past end of {} bytes", offset, self.data.len())))
    }

    fn uint_at(&self, offset: usize) -> Result<u64, RpcError> {
        let word = self.word(offset)?;
        if word[..24].iter().any(|&b| b != 0) {
            return Err(abi_error(format!("uint at {} exceeds 64 bits", offset)));
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&word[24..]);
        Ok(u64::from_be_bytes(raw))
    }

    fn usize_at(&self, offset: usize) -> Result<usize, RpcError> {
        let value = self.uint_at(offset)?;
        usize::try_from(value).map_err(|_| abi_error(format!("length {} too large", value)))
    }

    fn address_at(&self, offset: usize) -> Result<Address, RpcError> {
        let word = self.word(offset)?;
        if word[..12].iter().any(|&b| b != 0) {
            return Err(abi_error(format!("dirty address padding at {}", offset)));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&word[12..]);
        Ok(Address(raw))
    }

    fn string_at(&self, offset: usize) -> Result<String, RpcError> {
        let len = self.usize_at(offset)?;
        let start = offset + WORD;
        let bytes = start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| abi_error(format!("string at {} runs past end", offset)))?;
        String::from_utf8(bytes.to_vec()).map_err(|e| abi_error(format!("string at {}: {}", offset, e)))
    }

    /// Start of the element area and element count of a dynamic array
    fn array_bounds(&self, index: usize) -> Result<(usize, usize), RpcError> {
        let offset = self.usize_at(slot(index)?)?;
        let len = self.usize_at(offset)?;
        let start = offset + WORD;
        // Every element needs at least one word; reject lengths the data cannot hold
        let needed = len
            .checked_mul(WORD)
            .and_then(|n| n.checked_add(start))
            .ok_or_else(|| abi_error("array length overflows"))?;
        if needed > self.data.len() {
            return Err(abi_error(format!(
                "array of {} elements at {} runs past end",
                len, offset
            )));
        }
        Ok((start, len))
    }
}

fn slot(index: usize) -> Result<usize, RpcError> {
    index
        .checked_mul(WORD)
        .ok_or_else(|| abi_error("head index overflows"))
}

fn abi_error(msg: impl Into<String>) -> RpcError {
    RpcError::Abi(msg.into())
}
