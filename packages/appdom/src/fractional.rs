//! # Fractional Index Keys
//!
//! Sortable string keys that let a new sibling be inserted between any two
//! existing siblings without renumbering anyone else. Keys compare with
//! plain lexicographic string order; inserting between two keys produces a
//! key strictly between them, growing the string when the gap closes.
//!
//! Keys are base-36 fractions (digits `0-9a-z`) without the leading "0.".
//! A generated key never ends in `0`, which guarantees a smaller key can
//! always be derived later.

use std::cmp::Ordering;

use crate::error::DomError;

const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const BASE: usize = DIGITS.len();

fn digit_value(c: u8) -> usize {
    DIGITS.iter().position(|&d| d == c).unwrap_or(0)
}

/// Compare two keys. Plain string comparison, named for call-site clarity.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

/// Return a key strictly between `lower` and `upper`, where `None` stands
/// for -infinity / +infinity respectively.
///
/// Fails only when the bounds themselves are out of order (equal bounds
/// included) -- that signals corrupted sibling keys upstream.
pub fn key_between(lower: Option<&str>, upper: Option<&str>) -> Result<String, DomError> {
    if let (Some(lo), Some(hi)) = (lower, upper) {
        if lo >= hi {
            return Err(DomError::InvariantViolation(format!(
                "fractional key bounds out of order: {lo:?} >= {hi:?}"
            )));
        }
    }
    Ok(midpoint(lower.unwrap_or(""), upper.unwrap_or("")))
}

/// Midpoint of two base-36 fraction strings, `a < b`, empty meaning the
/// open bound on that side.
fn midpoint(a: &str, b: &str) -> String {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // Shared prefix stays; recurse on the tails.
    if !b.is_empty() {
        let mut n = 0;
        while n < b_bytes.len() && a_bytes.get(n).copied().unwrap_or(b'0') == b_bytes[n] {
            n += 1;
        }
        if n > 0 {
            let tail_a = if n < a.len() { &a[n..] } else { "" };
            return format!("{}{}", &b[..n], midpoint(tail_a, &b[n..]));
        }
    }

    let da = a_bytes.first().map(|&c| digit_value(c)).unwrap_or(0);
    let db = b_bytes.first().map(|&c| digit_value(c)).unwrap_or(BASE);

    if db - da > 1 {
        // Room for a single digit in between.
        let mid = (da + db) / 2;
        (DIGITS[mid] as char).to_string()
    } else {
        // Consecutive leading digits: keep `a`'s digit and bisect the
        // remainder of `a` against the open upper bound.
        let tail_a = if a.len() > 1 { &a[1..] } else { "" };
        format!("{}{}", DIGITS[da] as char, midpoint(tail_a, ""))
    }
}
