//! E2E Test Suite 03: Path Walking
//!
//! Drives the walker over protocol-flavoured structures: application- and
//! context-class tags, partial resolution for probing, and the lazy
//! validation guarantee.

use derpack::schema::{
    application, context, enter, skip, CHOICE, END, OPTIONAL, TAG_GENERALIZEDTIME, TAG_INTEGER,
    TAG_OCTETSTRING, TAG_SEQUENCE,
};
use derpack::{walk, DerCursor, DerError};

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    assert!(content.len() < 0x80);
    let mut out = vec![tag, content.len() as u8];
    out.extend_from_slice(content);
    out
}

/// A Kerberos-flavoured shell: [APPLICATION 1] SEQUENCE {
///   [0] INTEGER 5, [1] GeneralizedTime, [2] OCTET STRING }
fn ticketish() -> Vec<u8> {
    let body = [
        tlv(0xa0, &tlv(0x02, &[0x05])),
        tlv(0xa1, &tlv(0x18, b"20260101000000Z")),
        tlv(0xa2, &tlv(0x04, b"payload")),
    ]
    .concat();
    tlv(0x61, &tlv(0x30, &body))
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: full path through application and context tags
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn walks_through_application_and_context_tags() {
    let der = ticketish();
    let path = [
        enter(application(1)),
        enter(TAG_SEQUENCE),
        skip(context(0)),
        enter(context(1)),
        enter(TAG_GENERALIZEDTIME),
        END,
    ];
    let mut crs = DerCursor::new(&der);
    assert_eq!(walk(&mut crs, &path).unwrap(), 0);
    assert_eq!(crs.as_bytes(), b"20260101000000Z");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: partial resolution counts the unprocessed tail
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn partial_resolution_reports_remaining_steps() {
    // The SEQUENCE holds only one element; the probe asks for three more
    // levels than exist.
    let der = tlv(0x30, &tlv(0x02, &[0x01]));
    let path = [
        enter(TAG_SEQUENCE),
        skip(TAG_INTEGER),
        skip(TAG_INTEGER),
        skip(TAG_OCTETSTRING),
        END,
    ];
    let mut crs = DerCursor::new(&der);
    assert_eq!(walk(&mut crs, &path).unwrap(), 2);
    assert!(crs.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: CHOICE steps over the unknown arm
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn choice_defers_to_following_step() {
    // SEQUENCE { <some arm>, INTEGER 9 } with two different arms.
    for arm in [tlv(0x17, b"260101000000Z"), tlv(0x18, b"20260101000000Z")] {
        let der = tlv(0x30, &[arm, tlv(0x02, &[0x09])].concat());
        let path = [enter(TAG_SEQUENCE), CHOICE, enter(TAG_INTEGER), END];
        let mut crs = DerCursor::new(&der);
        assert_eq!(walk(&mut crs, &path).unwrap(), 0);
        assert_eq!(crs.as_bytes(), &[0x09]);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: mismatches fail, flagged or not
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn hard_mismatch_zeroes_cursor() {
    let der = ticketish();
    let path = [enter(application(2)), END];
    let mut crs = DerCursor::new(&der);
    assert_eq!(walk(&mut crs, &path), Err(DerError::BadMessage));
    assert!(crs.is_empty());
}

#[test]
fn optional_mismatch_is_forgiven_once() {
    // SEQUENCE { OCTET STRING, INTEGER }: the OPTIONAL step tolerates the
    // octet string, the retried step must then match the integer.
    let der = tlv(0x30, &[tlv(0x04, b"zz"), tlv(0x02, &[0x07])].concat());
    let path = [enter(TAG_SEQUENCE), OPTIONAL, enter(TAG_INTEGER), END];
    let mut crs = DerCursor::new(&der);
    assert_eq!(walk(&mut crs, &path).unwrap(), 0);
    assert_eq!(crs.as_bytes(), &[0x07]);

    // Two non-matching elements exhaust the single forgiveness.
    let der = tlv(
        0x30,
        &[tlv(0x04, b"zz"), tlv(0x04, b"yy"), tlv(0x02, &[0x07])].concat(),
    );
    let mut crs = DerCursor::new(&der);
    assert_eq!(walk(&mut crs, &path), Err(DerError::BadMessage));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: lazy validation — garbage off the path never surfaces
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn corruption_off_path_is_never_read() {
    // SEQUENCE { INTEGER 1, <sibling with absurd inner claim> }.  The
    // sibling's own content is structurally broken, but the path stops at
    // the integer.
    let broken_sibling = tlv(0x30, &[0x04, 0x7f, 0x00]); // inner claims 127 bytes
    let der = tlv(0x30, &[tlv(0x02, &[0x01]), broken_sibling].concat());
    let path = [enter(TAG_SEQUENCE), enter(TAG_INTEGER), END];
    let mut crs = DerCursor::new(&der);
    assert_eq!(walk(&mut crs, &path).unwrap(), 0);
    assert_eq!(crs.as_bytes(), &[0x01]);
}
