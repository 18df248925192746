//! E2E Test Suite 05: Scalar and Bit-String Helpers
//!
//! Identity checks for the int32/uint32/bool converters and the
//! bit-string accessors, driven through real unpacked views where it
//! matters: encode, wrap, unpack, decode.

use derpack::bitstring::{bit_count, get_byte, get_flag, put_byte, put_flag};
use derpack::scalar::{get_bool, get_int32, get_uint32, put_bool, put_int32, put_uint32};
use derpack::schema::{store, END, TAG_BITSTRING, TAG_BOOLEAN, TAG_INTEGER};
use derpack::{pack_to_vec, unpack, DerCursor, DerError, DerView};

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: int32 identity through a packed INTEGER
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn int32_survives_the_wire() {
    let prog = [store(TAG_INTEGER), END];
    let values: [i32; 14] = [
        0, 1, -1, 127, 128, -128, -129, 32767, -32768, 65536, i32::MAX, i32::MIN, -0x4000_0000,
        0x0102_0304,
    ];
    for &v in &values {
        let mut buf = [0u8; 4];
        let fields = [DerView::Bytes(put_int32(&mut buf, v))];
        let wire = pack_to_vec(&prog, &fields).unwrap();

        let mut crs = DerCursor::new(&wire);
        let mut out = [DerView::Absent; 1];
        unpack(&mut crs, &prog, &mut out, 1).unwrap();
        assert_eq!(get_int32(out[0].as_bytes().unwrap()), Ok(v), "value {v}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: uint32 identity, including the five-byte top half
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn uint32_survives_the_wire() {
    let prog = [store(TAG_INTEGER), END];
    let values: [u32; 13] = [
        0, 1, 255, 256, 32767, 32768, 65535, 65536, 0x7fff_ffff, 0x8000_0000, 0xc000_0000,
        0xf000_0000, 0xffff_ffff,
    ];
    for &v in &values {
        let mut buf = [0u8; 5];
        let fields = [DerView::Bytes(put_uint32(&mut buf, v))];
        let wire = pack_to_vec(&prog, &fields).unwrap();

        let mut crs = DerCursor::new(&wire);
        let mut out = [DerView::Absent; 1];
        unpack(&mut crs, &prog, &mut out, 1).unwrap();
        assert_eq!(get_uint32(out[0].as_bytes().unwrap()), Ok(v), "value {v}");
    }
}

#[test]
fn uint32_top_value_takes_five_bytes() {
    let mut buf = [0u8; 5];
    let enc = put_uint32(&mut buf, 0xffff_ffff);
    assert_eq!(enc, &[0x00, 0xff, 0xff, 0xff, 0xff]);
    assert_eq!(get_uint32(enc), Ok(0xffff_ffff));
    assert_eq!(
        get_uint32(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05]),
        Err(DerError::RangeExceeded)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: BOOLEAN identity and leniency
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn bool_survives_the_wire() {
    let prog = [store(TAG_BOOLEAN), END];
    for v in [true, false] {
        let mut buf = [0u8; 1];
        let fields = [DerView::Bytes(put_bool(&mut buf, v))];
        let wire = pack_to_vec(&prog, &fields).unwrap();
        assert_eq!(wire[2], if v { 0xff } else { 0x00 });

        let mut crs = DerCursor::new(&wire);
        let mut out = [DerView::Absent; 1];
        unpack(&mut crs, &prog, &mut out, 1).unwrap();
        assert_eq!(get_bool(out[0].as_bytes().unwrap()), Ok(v));
    }
    // Any nonzero byte decodes true; wrong sizes are refused.
    assert_eq!(get_bool(&[0x2a]), Ok(true));
    assert_eq!(get_bool(&[]), Err(DerError::BadMessage));
    assert_eq!(get_bool(&[0x00, 0x00]), Err(DerError::BadMessage));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: bit-string flags through an unpacked BIT STRING
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn bitstring_flags_match_wire_positions() {
    // keyUsage-style: 7 valid bits, pattern 1010 0000.
    let wire = [0x03, 0x02, 0x01, 0xa0];
    let prog = [store(TAG_BITSTRING), END];
    let mut crs = DerCursor::new(&wire);
    let mut out = [DerView::Absent; 1];
    unpack(&mut crs, &prog, &mut out, 1).unwrap();

    let body = out[0].as_bytes().unwrap();
    assert_eq!(bit_count(body), Ok(7));
    assert_eq!(get_flag(body, 0), Ok(true));
    assert_eq!(get_flag(body, 1), Ok(false));
    assert_eq!(get_flag(body, 2), Ok(true));
    assert_eq!(get_flag(body, 6), Ok(false));
    assert_eq!(get_flag(body, 7), Err(DerError::RangeExceeded));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: flag and byte writes keep the body canonical
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn bitstring_writes_stay_canonical() {
    let mut body = [0x04, 0x00, 0x00]; // 12 valid bits
    for bit in 0..12 {
        put_flag(&mut body, bit, true).unwrap();
    }
    assert_eq!(body, [0x04, 0xff, 0xf0]);
    assert_eq!(put_flag(&mut body, 12, true), Err(DerError::RangeExceeded));

    for bit in (0..12).step_by(2) {
        put_flag(&mut body, bit, false).unwrap();
    }
    assert_eq!(body, [0x04, 0x55, 0x50]);

    // Byte-level access with final-byte masking.
    assert_eq!(get_byte(&body, 0), Ok(0x55));
    assert_eq!(get_byte(&body, 1), Ok(0x50));
    assert_eq!(put_byte(&mut body, 1, 0x08), Err(DerError::BadMessage));
    put_byte(&mut body, 1, 0xa0).unwrap();
    assert_eq!(body, [0x04, 0x55, 0xa0]);
}
