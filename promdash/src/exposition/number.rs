//! Locale-independent numeric decoding.
//!
//! Sample values must match `[-+]?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?` in
//! full. There are no grouping separators and `.` is the only decimal mark.
//! Callers pick the width they need: [`decode_float`] for scalar samples and
//! the `_sum` / `_count` aggregates, [`decode_count`] for histogram buckets.

use super::ErrorKind;

/// Advance `idx` over ASCII digits, returning how many were skipped.
fn skip_digits(bytes: &[u8], idx: &mut usize) -> usize {
    let start = *idx;
    while bytes.get(*idx).is_some_and(u8::is_ascii_digit) {
        *idx += 1;
    }
    *idx - start
}

/// Whether `token` matches the numeric grammar in full.
fn conforms(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut idx = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        idx += 1;
    }
    if skip_digits(bytes, &mut idx) == 0 {
        return false;
    }
    if bytes.get(idx) == Some(&b'.') {
        idx += 1;
        if skip_digits(bytes, &mut idx) == 0 {
            return false;
        }
    }
    if matches!(bytes.get(idx), Some(b'e' | b'E')) {
        idx += 1;
        if matches!(bytes.get(idx), Some(b'+' | b'-')) {
            idx += 1;
        }
        if skip_digits(bytes, &mut idx) == 0 {
            return false;
        }
    }

    idx == bytes.len()
}

fn invalid(token: &str) -> ErrorKind {
    ErrorKind::NumberFormat(token.to_string())
}

/// Decode `token` as a 64-bit float.
pub(crate) fn decode_float(token: &str) -> Result<f64, ErrorKind> {
    if !conforms(token) {
        return Err(invalid(token));
    }
    token.parse::<f64>().map_err(|_| invalid(token))
}

/// Decode `token` as a non-negative integer count.
///
/// Tokens written in decimal or exponent form are accepted when they denote a
/// whole number, so `2.5e3` decodes to 2500 while `2.5` is rejected.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn decode_count(token: &str) -> Result<u64, ErrorKind> {
    // 2^64, the first float past `u64::MAX`.
    const LIMIT: f64 = 18_446_744_073_709_551_616.0;

    if !conforms(token) {
        return Err(invalid(token));
    }
    if let Ok(count) = token.parse::<u64>() {
        return Ok(count);
    }
    let value = token.parse::<f64>().map_err(|_| invalid(token))?;
    if value.is_finite() && value >= 0.0 && value < LIMIT && value.fract() == 0.0 {
        // Guarded above: whole, non-negative and in range.
        Ok(value as u64)
    } else {
        Err(invalid(token))
    }
}

/// Decode a sample timestamp, integer milliseconds since the Unix epoch.
pub(crate) fn decode_timestamp(token: &str) -> Result<i64, ErrorKind> {
    token.parse::<i64>().map_err(|_| invalid(token))
}
