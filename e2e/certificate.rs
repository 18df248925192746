//! E2E Test Suite 02: X.509 Certificate
//!
//! Runs the whole engine against a complete Certificate structure: nested
//! SEQUENCEs, an EXPLICIT [0] version, UTCTime/GeneralizedTime CHOICEs,
//! ANY algorithm parameters, IMPLICIT context-tagged OPTIONALs, and an
//! extension list handled by the subparser.  The assembled input must
//! survive unpack → pack byte-for-byte.

use derpack::scalar::get_bool;
use derpack::schema::{
    context, enter, store, ANY, CHOICE_BEGIN, CHOICE_END, END, LEAVE, OPTIONAL, TAG_BITSTRING,
    TAG_BOOLEAN, TAG_GENERALIZEDTIME, TAG_INTEGER, TAG_OCTETSTRING, TAG_OID, TAG_SEQUENCE,
    TAG_SET, TAG_UTCTIME,
};
use derpack::{
    cmp_der, pack, pack_to_vec, put_default, unpack, unpack_all, walk, DerCursor, DerView,
    SubParser, ViewArena,
};

// ─────────────────────────────────────────────────────────────────────────────
// Schema programs
// ─────────────────────────────────────────────────────────────────────────────

const CERTIFICATE: &[u8] = &[
    enter(TAG_SEQUENCE), // Certificate
    enter(TAG_SEQUENCE), // TBSCertificate
    OPTIONAL,
    enter(context(0)), // [0] EXPLICIT version
    store(TAG_INTEGER),
    LEAVE,
    store(TAG_INTEGER), // serialNumber
    enter(TAG_SEQUENCE), // signature AlgorithmIdentifier
    store(TAG_OID),
    ANY, // parameters ANY DEFINED BY algorithm
    LEAVE,
    store(TAG_SEQUENCE), // issuer Name
    enter(TAG_SEQUENCE), // validity
    CHOICE_BEGIN,
    store(TAG_UTCTIME),
    store(TAG_GENERALIZEDTIME),
    CHOICE_END,
    CHOICE_BEGIN,
    store(TAG_UTCTIME),
    store(TAG_GENERALIZEDTIME),
    CHOICE_END,
    LEAVE,
    store(TAG_SEQUENCE), // subject Name
    enter(TAG_SEQUENCE), // subjectPublicKeyInfo
    enter(TAG_SEQUENCE), // algorithm
    store(TAG_OID),
    ANY,
    LEAVE,
    store(TAG_BITSTRING), // subjectPublicKey
    LEAVE,
    OPTIONAL,
    store(context(1)), // issuerUniqueID
    OPTIONAL,
    store(context(2)), // subjectUniqueID
    OPTIONAL,
    enter(context(3)), // [3] EXPLICIT extensions
    store(TAG_SEQUENCE),
    LEAVE,
    LEAVE,               // TBSCertificate
    enter(TAG_SEQUENCE), // signatureAlgorithm
    store(TAG_OID),
    ANY,
    LEAVE,
    store(TAG_BITSTRING), // signatureValue
    LEAVE,
    END,
];

const EXTENSION: &[u8] = &[
    enter(TAG_SEQUENCE),
    store(TAG_OID),
    OPTIONAL,
    store(TAG_BOOLEAN),
    store(TAG_OCTETSTRING),
    LEAVE,
    END,
];

/// Named overlay of the certificate's 19 output slots.
struct Certificate<'a> {
    version: DerView<'a>,
    serial: DerView<'a>,
    sig_oid: DerView<'a>,
    sig_params: DerView<'a>,
    issuer: DerView<'a>,
    not_before_utc: DerView<'a>,
    not_before_gen: DerView<'a>,
    not_after_utc: DerView<'a>,
    not_after_gen: DerView<'a>,
    subject: DerView<'a>,
    spki_oid: DerView<'a>,
    spki_params: DerView<'a>,
    public_key: DerView<'a>,
    issuer_uid: DerView<'a>,
    subject_uid: DerView<'a>,
    extensions: DerView<'a>,
    sig_alg_oid: DerView<'a>,
    sig_alg_params: DerView<'a>,
    signature: DerView<'a>,
}

impl<'a> From<&[DerView<'a>; 19]> for Certificate<'a> {
    fn from(f: &[DerView<'a>; 19]) -> Self {
        Certificate {
            version: f[0],
            serial: f[1],
            sig_oid: f[2],
            sig_params: f[3],
            issuer: f[4],
            not_before_utc: f[5],
            not_before_gen: f[6],
            not_after_utc: f[7],
            not_after_gen: f[8],
            subject: f[9],
            spki_oid: f[10],
            spki_params: f[11],
            public_key: f[12],
            issuer_uid: f[13],
            subject_uid: f[14],
            extensions: f[15],
            sig_alg_oid: f[16],
            sig_alg_params: f[17],
            signature: f[18],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DER assembly helpers (test-side only)
// ─────────────────────────────────────────────────────────────────────────────

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let mut octets = Vec::new();
        let mut l = len;
        while l > 0 {
            octets.push((l & 0xff) as u8);
            l >>= 8;
        }
        octets.reverse();
        out.push(0x80 | octets.len() as u8);
        out.extend_from_slice(&octets);
    }
    out.extend_from_slice(content);
    out
}

fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x30, &parts.concat())
}

fn set(parts: &[Vec<u8>]) -> Vec<u8> {
    tlv(0x31, &parts.concat())
}

fn bitstring(payload: &[u8]) -> Vec<u8> {
    let mut body = vec![0x00];
    body.extend_from_slice(payload);
    tlv(0x03, &body)
}

const OID_CN: &[u8] = &[0x55, 0x04, 0x03];
const OID_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
const OID_SHA256_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b];
const OID_BASIC_CONSTRAINTS: &[u8] = &[0x55, 0x1d, 0x13];
const OID_KEY_USAGE: &[u8] = &[0x55, 0x1d, 0x0f];

fn name(common_name: &str) -> Vec<u8> {
    seq(&[set(&[seq(&[
        tlv(0x06, OID_CN),
        tlv(0x13, common_name.as_bytes()),
    ])])])
}

fn build_certificate() -> Vec<u8> {
    let alg = seq(&[tlv(0x06, OID_SHA256_RSA), tlv(0x05, &[])]);
    let version = tlv(0xa0, &tlv(0x02, &[0x02]));
    let serial = tlv(0x02, &[0x42]);
    let validity = seq(&[
        tlv(0x17, b"260101000000Z"),
        tlv(0x17, b"270101000000Z"),
    ]);
    let spki = seq(&[
        seq(&[tlv(0x06, OID_RSA), tlv(0x05, &[])]),
        bitstring(&[0xde, 0xad, 0xbe, 0xef, 0x10, 0x20, 0x30, 0x40]),
    ]);
    let ext_basic = seq(&[
        tlv(0x06, OID_BASIC_CONSTRAINTS),
        tlv(0x01, &[0xff]),
        tlv(0x04, &seq(&[])),
    ]);
    let ext_key_usage = seq(&[
        tlv(0x06, OID_KEY_USAGE),
        tlv(0x04, &[0x03, 0x02, 0x05, 0xa0]),
    ]);
    let extensions = tlv(0xa3, &seq(&[ext_basic, ext_key_usage]));
    let tbs = seq(&[
        version,
        serial,
        alg.clone(),
        name("Test CA"),
        validity,
        name("Test Leaf"),
        spki,
        extensions,
    ]);
    seq(&[
        tbs,
        alg,
        bitstring(&[0x5a; 32]),
    ])
}

fn unpack_certificate<'a>(der: &'a [u8]) -> (DerCursor<'a>, [DerView<'a>; 19]) {
    let mut crs = DerCursor::new(der);
    let mut fields = [DerView::Absent; 19];
    unpack(&mut crs, CERTIFICATE, &mut fields, 1).expect("certificate should unpack");
    (crs, fields)
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: field-by-field decomposition
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn fields_land_in_overlay_order() {
    let der = build_certificate();
    let (rest, fields) = unpack_certificate(&der);
    assert!(rest.is_empty());

    let cert = Certificate::from(&fields);
    assert_eq!(cert.version.as_bytes().unwrap(), &[0x02]);
    assert_eq!(cert.serial.as_bytes().unwrap(), &[0x42]);
    assert_eq!(cert.sig_oid.as_bytes().unwrap(), OID_SHA256_RSA);
    // ANY keeps the whole TLV, header included.
    assert_eq!(cert.sig_params.as_bytes().unwrap(), &[0x05, 0x00]);
    assert_eq!(
        cert.not_before_utc.as_bytes().unwrap(),
        b"260101000000Z".as_slice()
    );
    assert!(cert.not_before_gen.is_absent());
    assert_eq!(
        cert.not_after_utc.as_bytes().unwrap(),
        b"270101000000Z".as_slice()
    );
    assert!(cert.not_after_gen.is_absent());
    assert_eq!(cert.spki_oid.as_bytes().unwrap(), OID_RSA);
    // Stored BIT STRING content starts with its unused-bit count.
    assert_eq!(cert.public_key.as_bytes().unwrap()[0], 0x00);
    assert!(cert.issuer_uid.is_absent());
    assert!(cert.subject_uid.is_absent());
    assert!(!cert.extensions.is_absent());
    assert_eq!(cert.sig_alg_oid.as_bytes().unwrap(), OID_SHA256_RSA);
    assert_eq!(cert.sig_alg_params.as_bytes().unwrap(), &[0x05, 0x00]);
    assert_eq!(cert.signature.as_bytes().unwrap().len(), 33);

    // The issuer and subject store the Name's content span.
    assert!(!cert.issuer.is_absent());
    assert!(!cert.subject.is_absent());
    assert_ne!(
        cmp_der(cert.issuer, cert.subject),
        core::cmp::Ordering::Equal
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: unpack then pack reproduces the input byte-for-byte
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn certificate_round_trip_is_byte_identical() {
    let der = build_certificate();
    let (_, fields) = unpack_certificate(&der);

    let measured = pack(CERTIFICATE, &fields, None).unwrap();
    assert_eq!(measured, der.len());

    let rebuilt = pack_to_vec(CERTIFICATE, &fields).unwrap();
    assert_eq!(rebuilt, der);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: RDN walks over the issuer Name
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn rdn_walks_find_type_and_value() {
    let der = build_certificate();
    let (_, fields) = unpack_certificate(&der);
    let cert = Certificate::from(&fields);

    let rdn2type = [enter(TAG_SET), enter(TAG_SEQUENCE), enter(TAG_OID), END];
    let rdn2value = [enter(TAG_SET), enter(TAG_SEQUENCE), store(TAG_OID), END];

    let issuer = DerCursor::from_view(cert.issuer);
    let mut found = 0;
    for rdn in issuer.iter() {
        let mut type_crs = rdn;
        assert_eq!(walk(&mut type_crs, &rdn2type).unwrap(), 0);
        assert_eq!(type_crs.as_bytes(), OID_CN);

        let mut value_crs = rdn;
        assert_eq!(walk(&mut value_crs, &rdn2value).unwrap(), 0);
        value_crs.enter().unwrap();
        assert_eq!(value_crs.as_bytes(), b"Test CA");
        found += 1;
    }
    assert_eq!(found, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: extensions through the subparser driver
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn extensions_subparse_into_child_views() {
    let der = build_certificate();
    let arena = ViewArena::new();
    let subs = [SubParser { slot: 15, program: EXTENSION, sub: &[] }];

    let mut crs = DerCursor::new(&der);
    let mut fields = [DerView::Absent; 19];
    unpack_all(&mut crs, CERTIFICATE, &mut fields, &subs, 1, &arena).unwrap();

    let exts = fields[15].as_array().expect("extensions become an array");
    assert_eq!(exts.len(), 6); // two extensions, three fields each

    // First extension: basicConstraints, critical TRUE.
    assert_eq!(exts[0].as_bytes().unwrap(), OID_BASIC_CONSTRAINTS);
    assert_eq!(get_bool(exts[1].as_bytes().unwrap()), Ok(true));
    assert_eq!(exts[2].as_bytes().unwrap(), &[0x30, 0x00]);

    // Second extension: keyUsage, critical DEFAULT FALSE.
    const DEFAULT_FALSE: &[u8] = &[0x00];
    assert_eq!(exts[3].as_bytes().unwrap(), OID_KEY_USAGE);
    assert!(exts[4].is_absent());
    let mut critical = exts[4];
    put_default(&mut critical, DerView::Bytes(DEFAULT_FALSE));
    assert_eq!(get_bool(critical.as_bytes().unwrap()), Ok(false));
    assert_eq!(exts[5].as_bytes().unwrap(), &[0x03, 0x02, 0x05, 0xa0]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: a version-less (v1) certificate keeps its slot absent
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn v1_certificate_has_absent_version() {
    let alg = seq(&[tlv(0x06, OID_SHA256_RSA), tlv(0x05, &[])]);
    let tbs = seq(&[
        tlv(0x02, &[0x01]),
        alg.clone(),
        name("CA"),
        seq(&[tlv(0x17, b"260101000000Z"), tlv(0x17, b"270101000000Z")]),
        name("Leaf"),
        seq(&[
            seq(&[tlv(0x06, OID_RSA), tlv(0x05, &[])]),
            bitstring(&[0x01, 0x02]),
        ]),
    ]);
    let der = seq(&[tbs, alg, bitstring(&[0x03, 0x04])]);

    let (rest, fields) = unpack_certificate(&der);
    assert!(rest.is_empty());
    let cert = Certificate::from(&fields);
    assert!(cert.version.is_absent());
    assert_eq!(cert.serial.as_bytes().unwrap(), &[0x01]);
    assert!(cert.extensions.is_absent());

    // And it still round-trips: the absent version contributes no bytes.
    assert_eq!(pack_to_vec(CERTIFICATE, &fields).unwrap(), der);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 6: corruption off the walked path is invisible to the walker
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn walker_is_lazy_about_siblings() {
    let mut der = build_certificate();
    // Trash the signature BIT STRING payload (the last byte of the file).
    let last = der.len() - 1;
    der[last] ^= 0xff;

    // Walking to the serial number touches only the path to it.
    let path = [
        enter(TAG_SEQUENCE), // Certificate
        enter(TAG_SEQUENCE), // TBSCertificate
        OPTIONAL,
        derpack::schema::skip(context(0)),
        derpack::schema::skip(TAG_INTEGER),
        END,
    ];
    let mut crs = DerCursor::new(&der);
    assert_eq!(walk(&mut crs, &path).unwrap(), 0);
}
