use crate::{Error, Result};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Longest encoding of a positive `i64` (`i64::MAX` is `1y2p0ij32e8e7`).
pub const MAX_ENCODED_LEN: usize = 13;

/// Encodes an identifier as lowercase base-36 without padding.
///
/// Negative input is encoded with a leading `-` so that every `i64` has a
/// text form, but [`parse`] only accepts the positive ones back.
///
/// ```
/// assert_eq!(nodeflake::format(35), "z");
/// assert_eq!(nodeflake::format(36), "10");
/// assert_eq!(nodeflake::format(i64::MAX), "1y2p0ij32e8e7");
/// ```
pub fn format(id: i64) -> String {
    // one extra byte for the sign of i64::MIN
    let mut buf = [0u8; MAX_ENCODED_LEN + 1];
    let mut pos = buf.len();
    let mut n = id.unsigned_abs();
    loop {
        pos -= 1;
        buf[pos] = ALPHABET[(n % 36) as usize];
        n /= 36;
        if n == 0 {
            break;
        }
    }
    let digits = core::str::from_utf8(&buf[pos..]).unwrap_or_default();
    if id < 0 {
        let mut out = String::with_capacity(digits.len() + 1);
        out.push('-');
        out.push_str(digits);
        out
    } else {
        digits.to_owned()
    }
}

/// Decodes a base-36 identifier.
///
/// Letters are accepted in either case and a leading `+` or `-` is tolerated
/// the same way [`i64::from_str_radix`] tolerates it. The 63 payload bits of
/// the layout fill exactly the positive range of `i64`, so the overflow check
/// is the only range check required.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] on a syntax error, on overflow of the
/// `i64` range, or when the value is not positive.
///
/// ```
/// assert_eq!(nodeflake::parse("ZZ")?, 36 * 36 - 1);
/// assert!(nodeflake::parse("0").is_err());
/// # Ok::<(), nodeflake::Error>(())
/// ```
pub fn parse(text: &str) -> Result<i64> {
    let id = i64::from_str_radix(text, 36).map_err(|e| {
        let reason = match e.kind() {
            core::num::IntErrorKind::PosOverflow | core::num::IntErrorKind::NegOverflow => {
                "out of range"
            }
            core::num::IntErrorKind::Empty => "empty input",
            _ => "not a base-36 integer",
        };
        Error::invalid_id(text, reason)
    })?;
    if id <= 0 {
        return Err(Error::invalid_id(text, "identifier must be positive"));
    }
    Ok(id)
}
