//! E2E Test Suite 06: Property Tests
//!
//! The quantified invariants, checked over generated inputs: wire
//! round-trips across all length forms, measurement equality, scalar
//! encode/decode identity, and the integer comparator's order laws.

use proptest::prelude::*;

use derpack::scalar::{get_int32, get_uint32, put_int32, put_uint32};
use derpack::schema::{enter, store, END, LEAVE, OPTIONAL, TAG_OCTETSTRING, TAG_SEQUENCE};
use derpack::{cmp_int, pack, pack_to_vec, unpack, DerCursor, DerView};

proptest! {
    // Any content, any length form: pack → unpack → pack is the identity
    // on the wire image.
    #[test]
    fn octet_string_wire_round_trip(content in proptest::collection::vec(any::<u8>(), 0..600)) {
        let prog = [store(TAG_OCTETSTRING), END];
        let fields = [DerView::Bytes(&content)];
        let wire = pack_to_vec(&prog, &fields).unwrap();

        let mut crs = DerCursor::new(&wire);
        let mut out = [DerView::Absent; 1];
        unpack(&mut crs, &prog, &mut out, 1).unwrap();
        prop_assert_eq!(out[0].as_bytes().unwrap(), content.as_slice());
        prop_assert!(crs.is_empty());

        prop_assert_eq!(pack_to_vec(&prog, &out).unwrap(), wire);
    }

    // A null-buffer pack always measures exactly what a real pack writes,
    // with optional fields present or absent.
    #[test]
    fn measurement_always_equals_written(
        a in proptest::collection::vec(any::<u8>(), 0..300),
        b in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..300)),
    ) {
        let prog = [
            enter(TAG_SEQUENCE),
            store(TAG_OCTETSTRING),
            OPTIONAL,
            store(TAG_OCTETSTRING),
            LEAVE,
            END,
        ];
        let fields = [
            DerView::Bytes(&a),
            b.as_deref().map_or(DerView::Absent, DerView::Bytes),
        ];
        let measured = pack(&prog, &fields, None).unwrap();
        let mut buf = vec![0u8; measured];
        let written = pack(&prog, &fields, Some(&mut buf)).unwrap();
        prop_assert_eq!(measured, written);
    }

    // Scalar identity over the whole 32-bit ranges.
    #[test]
    fn int32_identity(v in any::<i32>()) {
        let mut buf = [0u8; 4];
        prop_assert_eq!(get_int32(put_int32(&mut buf, v)), Ok(v));
    }

    #[test]
    fn uint32_identity(v in any::<u32>()) {
        let mut buf = [0u8; 5];
        prop_assert_eq!(get_uint32(put_uint32(&mut buf, v)), Ok(v));
    }

    // The integer comparator agrees with native ordering on minimal
    // encodings, which gives transitivity for free.
    #[test]
    fn cmp_int_matches_native_order(a in any::<i32>(), b in any::<i32>()) {
        let mut abuf = [0u8; 4];
        let mut bbuf = [0u8; 4];
        let av = DerView::Bytes(put_int32(&mut abuf, a));
        let bv = DerView::Bytes(put_int32(&mut bbuf, b));
        prop_assert_eq!(cmp_int(av, bv), a.cmp(&b));
        prop_assert_eq!(cmp_int(bv, av), b.cmp(&a));
    }

    // Antisymmetry and transitivity, checked directly on triples.
    #[test]
    fn cmp_int_order_laws(a in any::<i32>(), b in any::<i32>(), c in any::<i32>()) {
        let mut abuf = [0u8; 4];
        let mut bbuf = [0u8; 4];
        let mut cbuf = [0u8; 4];
        let av = DerView::Bytes(put_int32(&mut abuf, a));
        let bv = DerView::Bytes(put_int32(&mut bbuf, b));
        let cv = DerView::Bytes(put_int32(&mut cbuf, c));
        prop_assert_eq!(cmp_int(av, bv), cmp_int(bv, av).reverse());
        if cmp_int(av, bv).is_lt() && cmp_int(bv, cv).is_lt() {
            prop_assert!(cmp_int(av, cv).is_lt());
        }
    }
}
