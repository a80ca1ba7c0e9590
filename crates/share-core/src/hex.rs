//! Hex helpers for `0x`-prefixed ledger values

/// Encode bytes as lowercase hex with a `0x` prefix
pub fn encode_prefixed(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        out.push(char::from(HEX_DIGITS[(byte >> 4) as usize]));
        out.push(char::from(HEX_DIGITS[(byte & 0x0f) as usize]));
    }
    out
}

/// Decode a hex string, with or without a `0x` prefix
///
/// Returns `None` on odd length or any non-hex character.
pub fn decode(input: &str) -> Option<Vec<u8>> {
    let digits = strip_prefix(input);
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| Some((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

/// Parse a `0x`-prefixed hex quantity (as used for block numbers and status)
pub fn parse_quantity(input: &str) -> Option<u64> {
    let digits = strip_prefix(input);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn strip_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
