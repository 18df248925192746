//! TLV header analysis: one `<tag, length>` preamble per call.
//!
//! DER restrictions enforced here, with distinct error kinds:
//! long-form (multi-byte) tag numbers and lengths wider than the native
//! word are [`RangeExceeded`](crate::DerError::RangeExceeded); indefinite
//! length, truncation, and BIT STRING padding violations are
//! [`BadMessage`](crate::DerError::BadMessage).
//!
//! The BIT STRING check is deliberate canonicalization: BER welcomes
//! arbitrary values in the unused trailing bits, DER requires them to be
//! zero.  Rejecting them here closes a signature-replay and bit-buffer
//! overflow surface, and spares downstream code from re-checking.

use crate::cursor::DerCursor;
use crate::error::{DerError, Result};
use crate::schema::{LEAVE, TAG_BITSTRING};

/// Content lengths at or above this collide with the reserved top bit and
/// are rejected on decode and on emit.
pub(crate) const MAX_CONTENT_LEN: usize = usize::MAX >> 1;

/// Decoded `<tag, length>` preamble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// The tag byte (class, constructed bit, and tag number).
    pub tag: u8,
    /// Content length in bytes.
    pub len: usize,
    /// Number of header bytes consumed (0 for the synthetic leave).
    pub hlen: usize,
}

impl Header {
    /// True for the synthetic header produced at the end of input, which
    /// callers use as a terminator signal.
    pub fn is_leave(&self) -> bool {
        self.hlen == 0
    }
}

/// Decode the header under the cursor and advance the cursor past it.
///
/// At the end of input this succeeds with the synthetic leave header
/// (`tag == LEAVE`, zero length, zero header length) instead of failing.
/// On any error the cursor is zeroed so continued use is visibly wrong.
pub fn header<'a>(crs: &mut DerCursor<'a>) -> Result<Header> {
    let rest = crs.bytes;
    if rest.is_empty() {
        return Ok(Header { tag: LEAVE, len: 0, hlen: 0 });
    }
    if rest.len() < 2 {
        crs.zero();
        return Err(DerError::BadMessage);
    }
    let tag = rest[0];
    if tag & 0x1f == 0x1f {
        // No support for long-form tag numbers.
        crs.zero();
        return Err(DerError::RangeExceeded);
    }
    let first = rest[1];
    let (len, hlen) = if first & 0x80 == 0 {
        (first as usize, 2)
    } else {
        let k = (first & 0x7f) as usize;
        if k == 0 {
            // Indefinite form is BER, not DER.
            crs.zero();
            return Err(DerError::BadMessage);
        }
        if k > rest.len() - 2 {
            crs.zero();
            return Err(DerError::BadMessage);
        }
        if k > core::mem::size_of::<usize>() {
            crs.zero();
            return Err(DerError::RangeExceeded);
        }
        let mut len = 0usize;
        for &b in &rest[2..2 + k] {
            len = (len << 8) | b as usize;
        }
        (len, 2 + k)
    };
    if len > MAX_CONTENT_LEN {
        crs.zero();
        return Err(DerError::RangeExceeded);
    }
    let content = &rest[hlen..];
    if len > content.len() {
        crs.zero();
        return Err(DerError::BadMessage);
    }
    if tag == TAG_BITSTRING {
        if let Err(e) = check_bitstring(&content[..len]) {
            crs.zero();
            return Err(e);
        }
    }
    crs.bytes = content;
    Ok(Header { tag, len, hlen })
}

/// Number of header bytes the shortest legal encoding takes for a given
/// content length: a single length byte below 128, else `0x80|k` followed
/// by `k` big-endian length octets.
pub fn header_len(content_len: usize) -> usize {
    if content_len < 0x80 {
        2
    } else {
        let mut extra = 0;
        let mut l = content_len;
        while l > 0 {
            extra += 1;
            l >>= 8;
        }
        2 + extra
    }
}

/// DER canonical form for a primitive BIT STRING body: a leading
/// unused-bit count of at most 7, with those bits cleared in the final
/// byte.  An empty body lacks even the count byte and is rejected.
fn check_bitstring(content: &[u8]) -> Result<()> {
    let unused = match content.first() {
        None => return Err(DerError::BadMessage),
        Some(&u) => u,
    };
    if unused > 7 {
        return Err(DerError::BadMessage);
    }
    let mask = (1u8 << unused) - 1;
    if content[content.len() - 1] & mask != 0 {
        return Err(DerError::BadMessage);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<(Header, usize)> {
        let mut crs = DerCursor::new(bytes);
        let h = header(&mut crs)?;
        Ok((h, crs.remaining()))
    }

    #[test]
    fn short_form() {
        let (h, rest) = decode(&[0x02, 0x01, 0x00]).unwrap();
        assert_eq!(h, Header { tag: 0x02, len: 1, hlen: 2 });
        assert_eq!(rest, 1);
    }

    #[test]
    fn empty_input_yields_synthetic_leave() {
        let (h, rest) = decode(&[]).unwrap();
        assert!(h.is_leave());
        assert_eq!((h.tag, h.len, h.hlen), (LEAVE, 0, 0));
        assert_eq!(rest, 0);
    }

    #[test]
    fn single_byte_is_truncated() {
        assert_eq!(decode(&[0x02]), Err(DerError::BadMessage));
    }

    #[test]
    fn long_form_tag_rejected() {
        assert_eq!(decode(&[0x1f, 0x20, 0x01, 0x00]), Err(DerError::RangeExceeded));
    }

    #[test]
    fn indefinite_length_rejected() {
        assert_eq!(
            decode(&[0x30, 0x80, 0x02, 0x01, 0x05, 0x00, 0x00]),
            Err(DerError::BadMessage)
        );
    }

    #[test]
    fn multi_byte_length() {
        let mut input = vec![0x04, 0x81, 0x80];
        input.extend(std::iter::repeat(0xaa).take(128));
        let (h, rest) = decode(&input).unwrap();
        assert_eq!(h, Header { tag: 0x04, len: 128, hlen: 3 });
        assert_eq!(rest, 128);
    }

    #[test]
    fn truncated_length_octets_rejected() {
        assert_eq!(decode(&[0x04, 0x82, 0x01]), Err(DerError::BadMessage));
    }

    #[test]
    fn oversized_length_count_rejected() {
        // k = 9 length octets exceed the native word on every supported
        // platform.
        let input = [0x04, 0x89, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert_eq!(decode(&input), Err(DerError::RangeExceeded));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn length_top_bit_rejected() {
        let input = [0x04, 0x88, 0x80, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(decode(&input), Err(DerError::RangeExceeded));
    }

    #[test]
    fn content_truncation_rejected() {
        assert_eq!(decode(&[0x04, 0x05, 0x41, 0x42]), Err(DerError::BadMessage));
    }

    #[test]
    fn bitstring_unused_count_over_seven_rejected() {
        assert_eq!(decode(&[0x03, 0x02, 0x08, 0x00]), Err(DerError::BadMessage));
    }

    #[test]
    fn bitstring_dirty_trailing_bits_rejected() {
        // Four unused bits, lowest bit set.
        assert_eq!(decode(&[0x03, 0x02, 0x04, 0x01]), Err(DerError::BadMessage));
    }

    #[test]
    fn bitstring_clean_trailing_bits_accepted() {
        let (h, _) = decode(&[0x03, 0x02, 0x04, 0x30]).unwrap();
        assert_eq!(h.len, 2);
    }

    #[test]
    fn bitstring_empty_body_rejected() {
        assert_eq!(decode(&[0x03, 0x00]), Err(DerError::BadMessage));
    }

    #[test]
    fn bitstring_zero_unused_accepts_any_final_byte() {
        let (h, _) = decode(&[0x03, 0x02, 0x00, 0xff]).unwrap();
        assert_eq!(h.len, 2);
    }

    #[test]
    fn cursor_zeroed_on_error() {
        let mut crs = DerCursor::new(&[0x1f, 0x20, 0x01, 0x00]);
        assert!(header(&mut crs).is_err());
        assert_eq!(crs.remaining(), 0);
    }

    #[test]
    fn header_len_shortest_form() {
        assert_eq!(header_len(0), 2);
        assert_eq!(header_len(0x7f), 2);
        assert_eq!(header_len(0x80), 3);
        assert_eq!(header_len(0xff), 3);
        assert_eq!(header_len(0x100), 4);
        assert_eq!(header_len(0xffff), 4);
        assert_eq!(header_len(0x10000), 5);
    }
}
