//! Canonical form of torrent info hashes.
//!
//! Detail pages show the 20-byte info hash either as 40 hex characters or as
//! 32 base-32 characters (RFC 4648 alphabet, no padding). Both are turned into
//! 40 lowercase hex characters.

const HEX_LEN: usize = 40;
const BASE32_LEN: usize = 32;
const HASH_BYTES: usize = 20;

/// Canonicalizes a raw info hash, or returns `None` if it is not recognized.
pub fn canonicalize(raw: &str) -> Option<String> {
    let clean = raw.trim();

    match clean.len() {
        HEX_LEN if clean.bytes().all(|b| b.is_ascii_hexdigit()) => Some(clean.to_lowercase()),
        HEX_LEN => {
            tracing::warn!(hash = %clean, "Invalid hex info hash");
            None
        }
        BASE32_LEN => match decode_base32(clean) {
            Some(bytes) => {
                tracing::info!(hash = %clean, "Converting base32 info hash to hex");
                Some(hex::encode(bytes))
            }
            None => {
                tracing::warn!(hash = %clean, "Invalid base32 info hash");
                None
            }
        },
        0 => None,
        len => {
            tracing::warn!(hash = %clean, len, "Unrecognized info hash length");
            None
        }
    }
}

/// Decodes exactly 32 base-32 characters into 20 bytes. Case-insensitive.
fn decode_base32(input: &str) -> Option<[u8; HASH_BYTES]> {
    let mut out = [0u8; HASH_BYTES];
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    let mut idx = 0;

    for byte in input.bytes() {
        let value = match byte.to_ascii_uppercase() {
            c @ b'A'..=b'Z' => c - b'A',
            c @ b'2'..=b'7' => c - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            *out.get_mut(idx)? = (buffer >> bits) as u8;
            idx += 1;
            buffer &= (1 << bits) - 1;
        }
    }

    (idx == HASH_BYTES).then_some(out)
}
