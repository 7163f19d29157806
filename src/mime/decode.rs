//! Content-Transfer-Encoding decoding.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::DecodeError;
use crate::model::structure::TransferEncoding;

/// Base64 engine that accepts missing padding and stray trailing bits,
/// both common in bodies produced by mobile clients.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a raw part body according to its transfer encoding.
///
/// | encoding           | transform                     |
/// |--------------------|-------------------------------|
/// | 7bit / 8bit        | octets returned unchanged     |
/// | binary             | identity                      |
/// | base64             | base64 decode                 |
/// | quoted-printable   | quoted-printable decode       |
/// | other              | returned unchanged            |
///
/// Unknown encodings pass through on purpose: the body is assumed to be
/// already decoded.
pub fn decode(raw: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>, DecodeError> {
    match encoding {
        TransferEncoding::SevenBit | TransferEncoding::EightBit => Ok(raw.to_vec()),
        TransferEncoding::Binary => Ok(raw.to_vec()),
        TransferEncoding::Base64 => decode_base64(raw),
        TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(raw)),
        TransferEncoding::Other => Ok(raw.to_vec()),
    }
}

/// Decode base64, skipping line breaks and other ASCII whitespace.
///
/// Some mailers glue separately encoded blocks together, each with its own
/// padding, so every padded chunk is decoded on its own.
fn decode_base64(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let cleaned: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let mut out = Vec::with_capacity(cleaned.len() / 4 * 3 + 3);
    for chunk in padded_chunks(&cleaned) {
        LENIENT_BASE64
            .decode_vec(chunk, &mut out)
            .map_err(|e| DecodeError::Base64(e.to_string()))?;
    }
    Ok(out)
}

/// Split after every run of `=` that is followed by more data.
fn padded_chunks(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = data;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .windows(2)
            .position(|w| w[0] == b'=' && w[1] != b'=')
            .map_or(rest.len(), |i| i + 1);
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

/// Decode quoted-printable (RFC 2045 §6.7).
///
/// Soft line breaks (`=` at end of line, optionally followed by trailing
/// blanks) are removed. A `=` not followed by two hex digits is kept as-is.
fn decode_quoted_printable(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let b = raw[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }

        if let Some(skip) = soft_break_len(&raw[i + 1..]) {
            i += 1 + skip;
            continue;
        }

        let hi = raw.get(i + 1).copied().and_then(hex_value);
        let lo = raw.get(i + 2).copied().and_then(hex_value);
        match (hi, lo) {
            (Some(hi), Some(lo)) => {
                out.push((hi << 4) | lo);
                i += 3;
            }
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}

/// If `rest` (the bytes after a `=`) starts with optional blanks and a line
/// break, return how many bytes the soft break occupies.
fn soft_break_len(rest: &[u8]) -> Option<usize> {
    let blanks = rest
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t')
        .count();
    match &rest[blanks..] {
        [b'\r', b'\n', ..] => Some(blanks + 2),
        [b'\n', ..] => Some(blanks + 1),
        [] if blanks > 0 => Some(blanks),
        _ => None,
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}
