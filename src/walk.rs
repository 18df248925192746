//! Tag-directed path walking: follow a linear path of one-byte steps into
//! a DER structure without decomposing it.
//!
//! Each step is either a flag byte ([`OPTIONAL`](crate::schema::OPTIONAL)
//! or [`CHOICE`](crate::schema::CHOICE)) or a tag combined with a mode
//! bit: enter (descend into the matching element) or skip (advance past
//! it).  ASN.1 guarantees distinct tags wherever the syntax allows
//! alternatives, so the first tag encountered decides the parse.
//!
//! Validation is lazy: only elements on the traversed path are
//! structurally checked.  Siblings off the path are never inspected, so
//! corruption there neither costs time nor causes failure.

use crate::cursor::DerCursor;
use crate::error::{DerError, Result};
use crate::header::header;
use crate::schema::{CHOICE, END, ENTER, MATCHBITS, OPTIONAL, TAG_BITSTRING};

/// Walk `path` from the element under `crs`.
///
/// On success the cursor is updated to the walk's end position and the
/// number of unprocessed path bytes is returned: `0` when the whole path
/// resolved, more when the input ran out part-way (useful for probing how
/// deep a structure goes).  On error the cursor is zeroed.
///
/// Step rules, per path element:
///
/// - `CHOICE` alone: skip whatever element is present; the following path
///   byte applies to the next element.
/// - A matching tag: enter or skip per the mode bit.  Entering a BIT
///   STRING demands a zero unused-bit count and steps past it.
/// - A mismatch under `OPTIONAL`: skip the element and retry the same
///   path byte against the next one.
/// - A bare mismatch: `BadMessage`.
pub fn walk(crs: &mut DerCursor<'_>, path: &[u8]) -> Result<usize> {
    let mut cur = *crs;
    let mut optional = false;
    let mut choice = false;
    let mut i = 0;

    while path[i] != END {
        if path[i] == OPTIONAL {
            optional = true;
            i += 1;
            if path[i] == END || path[i] == OPTIONAL {
                crs.zero();
                return Err(DerError::BadMessage);
            }
        }
        if path[i] == CHOICE {
            choice = true;
            // Advance now so an OPTIONAL CHOICE can try the arm that
            // follows the flag.
            i += 1;
            if path[i] == END || path[i] == CHOICE || path[i] == OPTIONAL {
                crs.zero();
                return Err(DerError::BadMessage);
            }
        }
        if cur.remaining() < 2 {
            if cur.is_empty() {
                // Ran out of data: the path resolved only partially.
                break;
            }
            crs.zero();
            return Err(DerError::BadMessage);
        }
        let h = match header(&mut cur) {
            Ok(h) => h,
            Err(e) => {
                crs.zero();
                return Err(e);
            }
        };
        if choice && !optional {
            // Whatever sits here is the chosen arm; step over it and let
            // the next path byte decide.
            cur.advance(h.len);
        } else if (h.tag ^ path[i]) & MATCHBITS == 0 {
            if path[i] & ENTER != 0 {
                cur.truncate(h.len);
                if h.tag == TAG_BITSTRING {
                    // Header validation left a non-empty body; entering
                    // additionally demands zero padding.
                    if cur.as_bytes()[0] != 0x00 {
                        crs.zero();
                        return Err(DerError::BadMessage);
                    }
                    cur.advance(1);
                }
            } else {
                cur.advance(h.len);
            }
            i += 1;
        } else if optional {
            // Tolerated mismatch: step over the element and retry the
            // current path byte (for a CHOICE the flag byte was already
            // consumed above).
            cur.advance(h.len);
        } else {
            crs.zero();
            return Err(DerError::BadMessage);
        }
        optional = false;
        choice = false;
    }

    *crs = cur;
    let mut unprocessed = 0;
    while path[i + unprocessed] != END {
        unprocessed += 1;
    }
    Ok(unprocessed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{enter, skip, TAG_OID, TAG_SEQUENCE, TAG_SET};

    // SET { SEQUENCE { OID 55 04 03, PrintableString "abc" } }
    const RDN: &[u8] = &[
        0x31, 0x0c, 0x30, 0x0a, 0x06, 0x03, 0x55, 0x04, 0x03, 0x13, 0x03, 0x61, 0x62, 0x63,
    ];

    #[test]
    fn enter_path_lands_on_oid_content() {
        let mut crs = DerCursor::new(RDN);
        let path = [enter(TAG_SET), enter(TAG_SEQUENCE), enter(TAG_OID), END];
        assert_eq!(walk(&mut crs, &path).unwrap(), 0);
        assert_eq!(crs.as_bytes(), &[0x55, 0x04, 0x03]);
    }

    #[test]
    fn skip_path_lands_on_next_sibling() {
        let mut crs = DerCursor::new(RDN);
        let path = [enter(TAG_SET), enter(TAG_SEQUENCE), skip(TAG_OID), END];
        assert_eq!(walk(&mut crs, &path).unwrap(), 0);
        // Cursor now covers the value following the type OID.
        assert_eq!(crs.as_bytes(), &[0x13, 0x03, 0x61, 0x62, 0x63]);
    }

    #[test]
    fn mismatch_without_flags_fails() {
        let mut crs = DerCursor::new(RDN);
        let path = [enter(TAG_SEQUENCE), END];
        assert_eq!(walk(&mut crs, &path), Err(DerError::BadMessage));
        assert!(crs.is_empty());
    }

    #[test]
    fn exhausted_input_reports_unprocessed_path_bytes() {
        let mut crs = DerCursor::new(&[0x30, 0x00]);
        let path = [enter(TAG_SEQUENCE), enter(TAG_SEQUENCE), skip(TAG_OID), END];
        assert_eq!(walk(&mut crs, &path).unwrap(), 2);
        assert!(crs.is_empty());
    }

    #[test]
    fn choice_skips_whatever_is_present() {
        // SEQUENCE { IA5String "t", INTEGER 7 }
        let bytes = [0x30, 0x06, 0x16, 0x01, 0x74, 0x02, 0x01, 0x07];
        let mut crs = DerCursor::new(&bytes);
        let path = [enter(TAG_SEQUENCE), CHOICE, skip(0x02), END];
        assert_eq!(walk(&mut crs, &path).unwrap(), 0);
        assert!(crs.is_empty());
    }

    #[test]
    fn optional_mismatch_retries_same_step() {
        // SEQUENCE { BOOLEAN TRUE, OID 2A }: the walk tolerates one
        // leading element that is not the OID.
        let bytes = [0x30, 0x06, 0x01, 0x01, 0xff, 0x06, 0x01, 0x2a];
        let mut crs = DerCursor::new(&bytes);
        let path = [enter(TAG_SEQUENCE), OPTIONAL, enter(TAG_OID), END];
        assert_eq!(walk(&mut crs, &path).unwrap(), 0);
        assert_eq!(crs.as_bytes(), &[0x2a]);
    }

    #[test]
    fn optional_match_consumes_normally() {
        let bytes = [0x30, 0x03, 0x06, 0x01, 0x2a];
        let mut crs = DerCursor::new(&bytes);
        let path = [enter(TAG_SEQUENCE), OPTIONAL, enter(TAG_OID), END];
        assert_eq!(walk(&mut crs, &path).unwrap(), 0);
        assert_eq!(crs.as_bytes(), &[0x2a]);
    }

    #[test]
    fn malformed_flag_sequences_rejected() {
        let mut crs = DerCursor::new(RDN);
        assert!(walk(&mut crs, &[OPTIONAL, END]).is_err());
        let mut crs = DerCursor::new(RDN);
        assert!(walk(&mut crs, &[OPTIONAL, OPTIONAL, skip(TAG_SET), END]).is_err());
        let mut crs = DerCursor::new(RDN);
        assert!(walk(&mut crs, &[CHOICE, CHOICE, skip(TAG_SET), END]).is_err());
        let mut crs = DerCursor::new(RDN);
        assert!(walk(&mut crs, &[CHOICE, OPTIONAL, skip(TAG_SET), END]).is_err());
    }

    #[test]
    fn walker_ignores_siblings_off_the_path() {
        // SET { SEQUENCE {...}, <corrupt sibling> }: the sibling claims an
        // absurd length but the walk never looks at it.
        let bytes = [
            0x31, 0x0e, 0x30, 0x0a, 0x06, 0x03, 0x55, 0x04, 0x03, 0x13, 0x03, 0x61, 0x62, 0x63,
            0xee, 0xff,
        ];
        let mut crs = DerCursor::new(&bytes);
        let path = [enter(TAG_SET), enter(TAG_SEQUENCE), enter(TAG_OID), END];
        assert_eq!(walk(&mut crs, &path).unwrap(), 0);
        assert_eq!(crs.as_bytes(), &[0x55, 0x04, 0x03]);
    }

    #[test]
    fn enter_bitstring_on_path_steps_past_pad() {
        // BIT STRING wrapping SEQUENCE {}.
        let bytes = [0x03, 0x03, 0x00, 0x30, 0x00];
        let mut crs = DerCursor::new(&bytes);
        let path = [enter(TAG_BITSTRING), enter(TAG_SEQUENCE), END];
        assert_eq!(walk(&mut crs, &path).unwrap(), 0);
        assert!(crs.is_empty());
    }
}
