//! E2E Test Suite 01: Boundary Encodings
//!
//! Exercises the codec's edge behaviour with literal byte sequences:
//! - minimal INTEGER round-trip
//! - BIT STRING canonicalization rejections
//! - indefinite-length and long-form-tag rejections
//! - OPTIONAL absence and CHOICE selection through unpack and pack
//! - measurement equality between the counting and writing pack runs
//! - prepacked-array idempotence

use derpack::schema::{
    enter, store, ANY, CHOICE_BEGIN, CHOICE_END, END, LEAVE, OPTIONAL, TAG_BITSTRING,
    TAG_GENERALIZEDTIME, TAG_INTEGER, TAG_OCTETSTRING, TAG_SEQUENCE, TAG_UTCTIME,
};
use derpack::{pack, pack_to_vec, unpack, DerCursor, DerError, DerView};

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: minimal INTEGER 0 unpacks to one view and repacks identically
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn minimal_integer_round_trip() {
    let input = [0x02, 0x01, 0x00];
    let prog = [store(TAG_INTEGER), END];

    let mut crs = DerCursor::new(&input);
    let mut out = [DerView::Absent; 1];
    unpack(&mut crs, &prog, &mut out, 1).expect("unpack should succeed");
    assert_eq!(out[0].as_bytes().unwrap(), &[0x00]);

    assert_eq!(pack_to_vec(&prog, &out).unwrap(), input.to_vec());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: BIT STRING with unused-bit count 8 is rejected
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn bitstring_with_eight_unused_bits_rejected() {
    let input = [0x03, 0x02, 0x08, 0x00];
    let prog = [store(TAG_BITSTRING), END];
    let mut crs = DerCursor::new(&input);
    let mut out = [DerView::Absent; 1];
    assert_eq!(
        unpack(&mut crs, &prog, &mut out, 1),
        Err(DerError::BadMessage)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: indefinite-length form is rejected
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn indefinite_length_rejected() {
    let input = [0x30, 0x80, 0x02, 0x01, 0x05, 0x00, 0x00];
    let prog = [enter(TAG_SEQUENCE), store(TAG_INTEGER), LEAVE, END];
    let mut crs = DerCursor::new(&input);
    let mut out = [DerView::Absent; 1];
    assert_eq!(
        unpack(&mut crs, &prog, &mut out, 1),
        Err(DerError::BadMessage)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: long-form tag numbers are rejected
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn long_form_tag_rejected() {
    let input = [0x1f, 0x20, 0x01, 0x00];
    let prog = [ANY, END];
    let mut crs = DerCursor::new(&input);
    let mut out = [DerView::Absent; 1];
    assert_eq!(
        unpack(&mut crs, &prog, &mut out, 1),
        Err(DerError::RangeExceeded)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: absent OPTIONAL produces the absent marker and repacks cleanly
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn optional_absent_round_trip() {
    let input = [0x04, 0x03, 0x41, 0x42, 0x43];
    let prog = [OPTIONAL, store(TAG_INTEGER), store(TAG_OCTETSTRING), END];

    let mut crs = DerCursor::new(&input);
    let mut out = [DerView::Absent; 2];
    unpack(&mut crs, &prog, &mut out, 1).unwrap();
    assert!(out[0].is_absent());
    assert_eq!(out[1].as_bytes().unwrap(), b"ABC");

    assert_eq!(pack_to_vec(&prog, &out).unwrap(), input.to_vec());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 6: CHOICE picks exactly one slot, either way around
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn choice_selection_round_trip() {
    let prog = [
        CHOICE_BEGIN,
        store(TAG_UTCTIME),
        store(TAG_GENERALIZEDTIME),
        CHOICE_END,
        END,
    ];

    let mut utc = vec![0x17, 0x0d];
    utc.extend_from_slice(b"170101000000Z");
    let mut crs = DerCursor::new(&utc);
    let mut out = [DerView::Absent; 2];
    unpack(&mut crs, &prog, &mut out, 1).unwrap();
    assert_eq!(out[0].as_bytes().unwrap(), b"170101000000Z".as_slice());
    assert!(out[1].is_absent());
    assert_eq!(pack_to_vec(&prog, &out).unwrap(), utc);

    let mut gen = vec![0x18, 0x0f];
    gen.extend_from_slice(b"20170101000000Z");
    let mut crs = DerCursor::new(&gen);
    let mut out = [DerView::Absent; 2];
    unpack(&mut crs, &prog, &mut out, 1).unwrap();
    assert!(out[0].is_absent());
    assert_eq!(out[1].as_bytes().unwrap(), b"20170101000000Z".as_slice());
    assert_eq!(pack_to_vec(&prog, &out).unwrap(), gen);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 7: null-buffer pack measures exactly what the real pack writes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn measurement_equality() {
    let prog = [
        enter(TAG_SEQUENCE),
        store(TAG_INTEGER),
        OPTIONAL,
        store(TAG_OCTETSTRING),
        ANY,
        LEAVE,
        END,
    ];
    let long = vec![0x55u8; 200];
    let field_sets: Vec<Vec<DerView>> = vec![
        vec![
            DerView::Bytes(&[0x01]),
            DerView::Bytes(&long),
            DerView::Bytes(&[0x05, 0x00]),
        ],
        vec![
            DerView::Bytes(&[0x01]),
            DerView::Absent,
            DerView::Bytes(&[0x05, 0x00]),
        ],
    ];
    for fields in &field_sets {
        let measured = pack(&prog, fields, None).unwrap();
        let mut buf = vec![0u8; measured];
        let written = pack(&prog, fields, Some(&mut buf)).unwrap();
        assert_eq!(measured, written);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 8: wrapping views into a prepacked array is invisible on the wire
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn prepack_idempotence() {
    let prog = [store(TAG_SEQUENCE), END];

    let elems = [
        DerView::Bytes(&[0x02, 0x01, 0x07]),
        DerView::Bytes(&[0x04, 0x02, 0x68, 0x69]),
    ];
    let via_array = pack_to_vec(&prog, &[DerView::Array(&elems)]).unwrap();

    let preassembled: Vec<u8> = [&[0x02, 0x01, 0x07][..], &[0x04, 0x02, 0x68, 0x69][..]].concat();
    let via_bytes = pack_to_vec(&prog, &[DerView::Bytes(&preassembled)]).unwrap();

    assert_eq!(via_array, via_bytes);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 9: a failed unpack leaves no partial output behind
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn failure_discards_all_output() {
    // SEQUENCE { INTEGER 1, BIT STRING <bad padding> }
    let input = [0x30, 0x07, 0x02, 0x01, 0x01, 0x03, 0x02, 0x04, 0x01];
    let prog = [
        enter(TAG_SEQUENCE),
        store(TAG_INTEGER),
        store(TAG_BITSTRING),
        LEAVE,
        END,
    ];
    let mut crs = DerCursor::new(&input);
    let mut out = [DerView::Bytes(b"stale"); 2];
    assert!(unpack(&mut crs, &prog, &mut out, 1).is_err());
    assert!(out.iter().all(DerView::is_absent));
    assert!(crs.is_empty());
}
