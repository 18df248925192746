//! E2E Test Suite 04: Subparser Driver
//!
//! Directory-flavoured structures with data-dependent arity: a message
//! wrapping a SET OF attribute, each attribute wrapping a SET OF value.
//! The driver must explode both levels into arena-backed arrays while the
//! primary unpack stays allocation-free.

use derpack::schema::{
    enter, store, END, LEAVE, OPTIONAL, TAG_INTEGER, TAG_OCTETSTRING, TAG_SEQUENCE, TAG_SET,
};
use derpack::{unpack_all, DerCursor, DerError, DerView, SubParser, ViewArena};

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    assert!(content.len() < 0x80);
    let mut out = vec![tag, content.len() as u8];
    out.extend_from_slice(content);
    out
}

/// SEQUENCE { INTEGER msgid, SET OF SEQUENCE { OCTET STRING type,
/// SET OF OCTET STRING values } }
fn message(msgid: u8, attrs: &[(&[u8], &[&[u8]])]) -> Vec<u8> {
    let attr_list: Vec<u8> = attrs
        .iter()
        .map(|(ty, vals)| {
            let val_set: Vec<u8> = vals.iter().map(|v| tlv(0x04, v)).collect::<Vec<_>>().concat();
            tlv(
                0x30,
                &[tlv(0x04, ty), tlv(0x31, &val_set)].concat(),
            )
        })
        .collect::<Vec<_>>()
        .concat();
    tlv(
        0x30,
        &[tlv(0x02, &[msgid]), tlv(0x31, &attr_list)].concat(),
    )
}

const MESSAGE: &[u8] = &[
    enter(TAG_SEQUENCE),
    store(TAG_INTEGER),
    store(TAG_SET),
    LEAVE,
    END,
];

const ATTRIBUTE: &[u8] = &[
    enter(TAG_SEQUENCE),
    store(TAG_OCTETSTRING),
    store(TAG_SET),
    LEAVE,
    END,
];

const VALUE: &[u8] = &[store(TAG_OCTETSTRING), END];

fn subparsers() -> [SubParser<'static>; 1] {
    const VALUES: [SubParser<'static>; 1] = [SubParser { slot: 1, program: VALUE, sub: &[] }];
    [SubParser { slot: 1, program: ATTRIBUTE, sub: &VALUES }]
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: two levels of repetition explode into nested arrays
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn nested_repetition_explodes_fully() {
    let der = message(
        0x07,
        &[
            (b"cn", &[b"alpha".as_slice(), b"beta"]),
            (b"mail", &[b"a@example.test"]),
        ],
    );

    let arena = ViewArena::new();
    let mut fields = [DerView::Absent; 2];
    let mut crs = DerCursor::new(&der);
    unpack_all(&mut crs, MESSAGE, &mut fields, &subparsers(), 1, &arena).unwrap();

    assert_eq!(fields[0].as_bytes().unwrap(), &[0x07]);
    let attrs = fields[1].as_array().unwrap();
    assert_eq!(attrs.len(), 4); // two attributes, two fields each

    assert_eq!(attrs[0].as_bytes().unwrap(), b"cn");
    let cn_values = attrs[1].as_array().unwrap();
    assert_eq!(cn_values.len(), 2);
    assert_eq!(cn_values[0].as_bytes().unwrap(), b"alpha");
    assert_eq!(cn_values[1].as_bytes().unwrap(), b"beta");

    assert_eq!(attrs[2].as_bytes().unwrap(), b"mail");
    let mail_values = attrs[3].as_array().unwrap();
    assert_eq!(mail_values.len(), 1);
    assert_eq!(mail_values[0].as_bytes().unwrap(), b"a@example.test");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: empty repetitions become empty arrays, not errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_attribute_list_is_an_empty_array() {
    let der = message(0x01, &[]);
    let arena = ViewArena::new();
    let mut fields = [DerView::Absent; 2];
    let mut crs = DerCursor::new(&der);
    unpack_all(&mut crs, MESSAGE, &mut fields, &subparsers(), 1, &arena).unwrap();
    assert_eq!(fields[1].as_array().unwrap().len(), 0);
    assert_eq!(arena.allocated(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: the arena quota turns runaway input into AllocationFailed
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn quota_bounds_total_allocation() {
    let der = message(
        0x02,
        &[(b"cn", &[b"a".as_slice(), b"b", b"c", b"d", b"e", b"f"])],
    );

    // Attribute level needs 2 views, the value level 6 more.
    let arena = ViewArena::with_quota(4);
    let mut fields = [DerView::Absent; 2];
    let mut crs = DerCursor::new(&der);
    assert_eq!(
        unpack_all(&mut crs, MESSAGE, &mut fields, &subparsers(), 1, &arena),
        Err(DerError::AllocationFailed)
    );

    let arena = ViewArena::with_quota(8);
    let mut fields = [DerView::Absent; 2];
    let mut crs = DerCursor::new(&der);
    unpack_all(&mut crs, MESSAGE, &mut fields, &subparsers(), 1, &arena).unwrap();
    assert_eq!(arena.allocated(), 8);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: an absent container slot is left alone
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn optional_absent_container_stays_absent() {
    let prog: &[u8] = &[
        enter(TAG_SEQUENCE),
        store(TAG_INTEGER),
        OPTIONAL,
        store(TAG_SET),
        LEAVE,
        END,
    ];
    let der = tlv(0x30, &tlv(0x02, &[0x05]));

    let arena = ViewArena::new();
    let subs = [SubParser { slot: 1, program: VALUE, sub: &[] }];
    let mut fields = [DerView::Absent; 2];
    let mut crs = DerCursor::new(&der);
    unpack_all(&mut crs, prog, &mut fields, &subs, 1, &arena).unwrap();
    assert!(fields[1].is_absent());
    assert_eq!(arena.allocated(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: malformed nested elements propagate the unpack failure
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn nested_unpack_failure_propagates() {
    // The attribute SET holds an INTEGER where a SEQUENCE must appear.
    let bad_attr_list = tlv(0x02, &[0x00]);
    let der = tlv(
        0x30,
        &[tlv(0x02, &[0x01]), tlv(0x31, &bad_attr_list)].concat(),
    );

    let arena = ViewArena::new();
    let mut fields = [DerView::Absent; 2];
    let mut crs = DerCursor::new(&der);
    assert_eq!(
        unpack_all(&mut crs, MESSAGE, &mut fields, &subparsers(), 1, &arena),
        Err(DerError::BadMessage)
    );
}
