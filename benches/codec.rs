//! Criterion benchmarks for the unpack/pack/walk primitives.
//!
//! Run with:
//!   cargo bench --bench codec
//!
//! The fixture is a certificate-shaped structure with a configurable
//! payload size, so the throughput numbers track the zero-copy claim:
//! unpack cost should be dominated by header decoding, not payload size.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use derpack::schema::{
    context, enter, skip, store, ANY, END, LEAVE, OPTIONAL, TAG_BITSTRING, TAG_INTEGER, TAG_OID,
    TAG_SEQUENCE,
};
use derpack::{pack, unpack, walk, DerCursor, DerView};

const PROGRAM: &[u8] = &[
    enter(TAG_SEQUENCE),
    OPTIONAL,
    enter(context(0)),
    store(TAG_INTEGER),
    LEAVE,
    store(TAG_INTEGER),
    enter(TAG_SEQUENCE),
    store(TAG_OID),
    ANY,
    LEAVE,
    store(TAG_BITSTRING),
    LEAVE,
    END,
];

const FIELDS: usize = 5;

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

fn fixture(payload: usize) -> Vec<u8> {
    let mut body = vec![0x00u8];
    body.extend(std::iter::repeat(0x5a).take(payload));
    let content = [
        tlv(0xa0, &tlv(0x02, &[0x02])),
        tlv(0x02, &[0x42]),
        tlv(
            0x30,
            &[
                tlv(0x06, &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b]),
                tlv(0x05, &[]),
            ]
            .concat(),
        ),
        tlv(0x03, &body),
    ]
    .concat();
    tlv(0x30, &content)
}

fn bench_unpack_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpack_pack");

    for &payload in &[64usize, 4096, 65_536] {
        let der = fixture(payload);
        group.throughput(Throughput::Bytes(der.len() as u64));

        group.bench_with_input(BenchmarkId::new("unpack", payload), &der, |b, der| {
            b.iter(|| {
                let mut crs = DerCursor::new(der);
                let mut out = [DerView::Absent; FIELDS];
                unpack(&mut crs, PROGRAM, &mut out, 1).unwrap();
                out
            })
        });

        let mut crs = DerCursor::new(&der);
        let mut fields = [DerView::Absent; FIELDS];
        unpack(&mut crs, PROGRAM, &mut fields, 1).unwrap();
        let measured = pack(PROGRAM, &fields, None).unwrap();
        let mut buf = vec![0u8; measured];

        group.bench_with_input(BenchmarkId::new("pack", payload), &fields, |b, fields| {
            b.iter(|| pack(PROGRAM, fields, Some(&mut buf)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("pack_measure", payload), &fields, |b, fields| {
            b.iter(|| pack(PROGRAM, fields, None).unwrap())
        });
    }
    group.finish();
}

fn bench_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk");
    let der = fixture(65_536);
    let path = [
        enter(TAG_SEQUENCE),
        OPTIONAL,
        skip(context(0)),
        skip(TAG_INTEGER),
        enter(TAG_SEQUENCE),
        enter(TAG_OID),
        END,
    ];
    group.throughput(Throughput::Bytes(der.len() as u64));
    group.bench_function("rdn_path", |b| {
        b.iter(|| {
            let mut crs = DerCursor::new(&der);
            walk(&mut crs, &path).unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_unpack_pack, bench_walk);
criterion_main!(benches);
