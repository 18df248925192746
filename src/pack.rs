//! Schema-driven serialization: walk the program from end to start and
//! emit bytes right-to-left into the tail of the caller's buffer.
//!
//! DER lengths are prefix-encoded, so emitting backwards means every frame
//! knows its content length at the exact moment it must write its header —
//! no length precomputation, single pass.  Each recursive frame returns
//! the byte count it emitted; the parent wraps it in the enclosing
//! `<tag, length>`.
//!
//! Calling with no output buffer performs the identical walk as a pure
//! measurement; a second call with a buffer of that size cannot fail.
//! OPTIONAL and CHOICE are invisible here: absence is encoded data-side as
//! an absent view, which contributes no bytes and no header.

use crate::error::{DerError, Result};
use crate::header::MAX_CONTENT_LEN;
use crate::schema::{
    scan, ANY, CHOICE_BEGIN, ENTER, LEAVE, OPTIONAL, TAG_BITSTRING, TAG_EMBEDDED_PDV,
    TAG_EXTERNAL, TAG_SEQUENCE, TAG_SET,
};
use crate::view::DerView;

/// Serialize `fields` according to `program`.
///
/// With `out` of `None` this only measures: the return value is the number
/// of bytes a real run will write.  With a buffer, bytes are written into
/// its tail — `out[out.len() - n..]` — and the same `n` is returned, so
/// the measure-then-write idiom sizes the buffer exactly.
///
/// `fields` must hold at least [`field_count`](crate::schema::field_count)
/// views; a buffer smaller than the measured size is reported as
/// `RangeExceeded`.
pub fn pack(program: &[u8], fields: &[DerView<'_>], out: Option<&mut [u8]>) -> Result<usize> {
    let (plen, nstores) = scan(program);
    if fields.len() < nstores {
        return Err(DerError::RangeExceeded);
    }
    let mut sink = Sink { out, written: 0 };
    let mut pc = plen;
    let mut next_field = nstores;
    let mut total = 0usize;
    while pc > 0 {
        total += pack_rec(program, &mut pc, &mut sink, fields, &mut next_field)?;
    }
    Ok(total)
}

/// Measure, allocate, write: the owned-buffer convenience around [`pack`].
pub fn pack_to_vec(program: &[u8], fields: &[DerView<'_>]) -> Result<Vec<u8>> {
    let len = pack(program, fields, None)?;
    let mut buf = vec![0u8; len];
    let written = pack(program, fields, Some(&mut buf))?;
    debug_assert_eq!(written, len);
    Ok(buf)
}

/// Right-to-left byte emitter over an optional buffer.  Without a buffer
/// it only counts, which is what makes measurement and writing share one
/// code path.
struct Sink<'o> {
    out: Option<&'o mut [u8]>,
    written: usize,
}

impl Sink<'_> {
    fn put_byte(&mut self, b: u8) -> Result<()> {
        if let Some(buf) = self.out.as_deref_mut() {
            if self.written >= buf.len() {
                return Err(DerError::RangeExceeded);
            }
            let end = buf.len() - self.written;
            buf[end - 1] = b;
        }
        self.written += 1;
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(buf) = self.out.as_deref_mut() {
            if self.written + bytes.len() > buf.len() {
                return Err(DerError::RangeExceeded);
            }
            let end = buf.len() - self.written;
            buf[end - bytes.len()..end].copy_from_slice(bytes);
        }
        self.written += bytes.len();
        Ok(())
    }

    /// Shortest-form header, emitted backwards: length octets low byte
    /// first, then the `0x80|k` prefix (or the single length byte), then
    /// the tag at the lowest address.  Returns the header size.
    fn put_header(&mut self, tag: u8, len: usize) -> Result<usize> {
        if len > MAX_CONTENT_LEN {
            return Err(DerError::RangeExceeded);
        }
        let hlen = if len < 0x80 {
            self.put_byte(len as u8)?;
            2
        } else {
            let mut l = len;
            let mut k = 0usize;
            while l > 0 {
                self.put_byte((l & 0xff) as u8)?;
                l >>= 8;
                k += 1;
            }
            self.put_byte(0x80 | k as u8)?;
            2 + k
        };
        self.put_byte(tag)?;
        Ok(hlen)
    }
}

/// The four universal tags whose primitive encoding is invalid regain
/// their constructed bit when a stored view is wrapped.
fn stored_tag(cmd: u8) -> u8 {
    match cmd {
        TAG_EXTERNAL | TAG_EMBEDDED_PDV | TAG_SEQUENCE | TAG_SET => cmd | 0x20,
        _ => cmd,
    }
}

/// One reverse frame: consume instructions right-to-left until the `ENTER`
/// that opened this span (which wraps and returns), or until the program
/// is spent.  `LEAVE` opens a child frame.
fn pack_rec(
    program: &[u8],
    pc: &mut usize,
    sink: &mut Sink<'_>,
    fields: &[DerView<'_>],
    next_field: &mut usize,
) -> Result<usize> {
    let mut totlen = 0usize;
    loop {
        *pc -= 1;
        let cmd = program[*pc];

        if cmd == CHOICE_BEGIN || cmd == OPTIONAL {
            // Flags carry no data; absent views already encode the choice.
            if *pc == 0 {
                return Ok(totlen);
            }
            continue;
        }

        if cmd == LEAVE {
            totlen += pack_rec(program, pc, sink, fields, next_field)?;
            if *pc == 0 {
                return Ok(totlen);
            }
            continue;
        }

        if cmd & ENTER != 0 {
            // This frame's opener: wrap what the frame emitted.  A frame
            // that emitted nothing (an absent OPTIONAL group) vanishes
            // entirely, header included.
            if totlen == 0 {
                return Ok(0);
            }
            let (tag, content_len) = if cmd == (ENTER | TAG_BITSTRING) {
                // Re-wrap byte-aligned DER in a bit-aligned container:
                // zero remainder bits, counted in the length.
                sink.put_byte(0x00)?;
                (TAG_BITSTRING, totlen + 1)
            } else {
                (cmd, totlen)
            };
            let hlen = sink.put_header(tag, content_len)?;
            return Ok(content_len + hlen);
        }

        // A store instruction, ANY included: consume one view from the
        // right end of the remaining field window.
        *next_field -= 1;
        let elm = match fields[*next_field] {
            DerView::Absent => 0,
            DerView::Array(children) => {
                let content = pack_array(children, sink)?;
                if cmd == ANY {
                    content
                } else {
                    content + sink.put_header(stored_tag(cmd), content)?
                }
            }
            DerView::Bytes(b) => {
                sink.put_slice(b)?;
                if cmd == ANY {
                    b.len()
                } else {
                    b.len() + sink.put_header(stored_tag(cmd), b.len())?
                }
            }
        };
        totlen += elm;
        if *pc == 0 {
            return Ok(totlen);
        }
    }
}

/// Emit a prepacked child array: the children back-to-front as a raw
/// concatenation, no headers added — each child is expected to carry its
/// own, or to be a nested array that does.
fn pack_array(children: &[DerView<'_>], sink: &mut Sink<'_>) -> Result<usize> {
    let mut totlen = 0usize;
    for child in children.iter().rev() {
        totlen += match *child {
            DerView::Absent => 0,
            DerView::Array(sub) => pack_array(sub, sink)?,
            DerView::Bytes(b) => {
                sink.put_slice(b)?;
                b.len()
            }
        };
    }
    Ok(totlen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::DerCursor;
    use crate::schema::{enter, store, END, TAG_INTEGER, TAG_OCTETSTRING};
    use crate::unpack::unpack;

    #[test]
    fn minimal_integer_repacks() {
        let prog = [store(TAG_INTEGER), END];
        let fields = [DerView::Bytes(&[0x00])];
        assert_eq!(pack_to_vec(&prog, &fields).unwrap(), vec![0x02, 0x01, 0x00]);
    }

    #[test]
    fn measurement_equals_written_length() {
        let prog = [
            enter(TAG_SEQUENCE),
            store(TAG_INTEGER),
            store(TAG_OCTETSTRING),
            LEAVE,
            END,
        ];
        let payload = [0xabu8; 300];
        let fields = [DerView::Bytes(&[0x05]), DerView::Bytes(&payload)];
        let len = pack(&prog, &fields, None).unwrap();
        let mut buf = vec![0u8; len];
        let written = pack(&prog, &fields, Some(&mut buf)).unwrap();
        assert_eq!(len, written);
        // Content exceeds 255 bytes, so the two-octet length form is used.
        assert_eq!(&buf[..2], &[0x30, 0x82]);
    }

    #[test]
    fn absent_optional_contributes_nothing() {
        let prog = [OPTIONAL, store(TAG_INTEGER), store(TAG_OCTETSTRING), END];
        let fields = [DerView::Absent, DerView::Bytes(b"ABC")];
        assert_eq!(
            pack_to_vec(&prog, &fields).unwrap(),
            vec![0x04, 0x03, 0x41, 0x42, 0x43]
        );
    }

    #[test]
    fn empty_entered_group_vanishes() {
        let prog = [
            OPTIONAL,
            enter(TAG_SEQUENCE),
            store(TAG_INTEGER),
            LEAVE,
            END,
        ];
        let fields = [DerView::Absent];
        assert_eq!(pack(&prog, &fields, None).unwrap(), 0);
        assert_eq!(pack_to_vec(&prog, &fields).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn stored_sequence_regains_constructed_bit() {
        let prog = [store(TAG_SEQUENCE), END];
        // Content of SEQUENCE { INTEGER 1 }.
        let fields = [DerView::Bytes(&[0x02, 0x01, 0x01])];
        assert_eq!(
            pack_to_vec(&prog, &fields).unwrap(),
            vec![0x30, 0x03, 0x02, 0x01, 0x01]
        );
    }

    #[test]
    fn any_is_copied_verbatim() {
        let prog = [ANY, END];
        let fields = [DerView::Bytes(&[0x05, 0x00])];
        assert_eq!(pack_to_vec(&prog, &fields).unwrap(), vec![0x05, 0x00]);
    }

    #[test]
    fn entered_bitstring_gets_zero_pad_inside_length() {
        let prog = [enter(TAG_BITSTRING), store(TAG_INTEGER), LEAVE, END];
        let fields = [DerView::Bytes(&[0x05])];
        let bytes = pack_to_vec(&prog, &fields).unwrap();
        assert_eq!(bytes, vec![0x03, 0x04, 0x00, 0x02, 0x01, 0x05]);

        // And the engine accepts its own output again.
        let mut crs = DerCursor::new(&bytes);
        let mut out = [DerView::Absent; 1];
        unpack(&mut crs, &prog, &mut out, 1).unwrap();
        assert_eq!(out[0].as_bytes().unwrap(), &[0x05]);
    }

    #[test]
    fn prepacked_array_matches_preassembled_bytes() {
        let a = DerView::Bytes(&[0x02, 0x01, 0x01]);
        let b = DerView::Bytes(&[0x02, 0x01, 0x02]);
        let children = [a, b];
        let prog = [store(TAG_SEQUENCE), END];

        let via_array = pack_to_vec(&prog, &[DerView::Array(&children)]).unwrap();
        let via_bytes = pack_to_vec(
            &prog,
            &[DerView::Bytes(&[0x02, 0x01, 0x01, 0x02, 0x01, 0x02])],
        )
        .unwrap();
        assert_eq!(via_array, via_bytes);
        assert_eq!(via_array, vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn nested_prepacked_arrays_flatten() {
        let inner = [
            DerView::Bytes(&[0x02, 0x01, 0x01]),
            DerView::Bytes(&[0x02, 0x01, 0x02]),
        ];
        let outer = [DerView::Array(&inner), DerView::Bytes(&[0x02, 0x01, 0x03])];
        let prog = [store(TAG_SEQUENCE), END];
        assert_eq!(
            pack_to_vec(&prog, &[DerView::Array(&outer)]).unwrap(),
            vec![0x30, 0x09, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x02, 0x01, 0x03]
        );
    }

    #[test]
    fn short_buffer_is_range_exceeded() {
        let prog = [store(TAG_OCTETSTRING), END];
        let fields = [DerView::Bytes(b"hello")];
        let mut buf = [0u8; 3];
        assert_eq!(
            pack(&prog, &fields, Some(&mut buf)),
            Err(DerError::RangeExceeded)
        );
    }

    #[test]
    fn output_lands_in_buffer_tail() {
        let prog = [store(TAG_INTEGER), END];
        let fields = [DerView::Bytes(&[0x2a])];
        let mut buf = [0xeeu8; 8];
        let n = pack(&prog, &fields, Some(&mut buf)).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..5], &[0xee; 5]);
        assert_eq!(&buf[5..], &[0x02, 0x01, 0x2a]);
    }

    #[test]
    fn undersized_field_slice_is_range_exceeded() {
        let prog = [store(TAG_INTEGER), store(TAG_INTEGER), END];
        let fields = [DerView::Bytes(&[0x01])];
        assert_eq!(pack(&prog, &fields, None), Err(DerError::RangeExceeded));
    }

    #[test]
    fn unpack_pack_round_trip() {
        // SEQUENCE { INTEGER 5, SEQUENCE { OCTET STRING "AB" }, BOOLEAN }
        let input = [
            0x30, 0x0c, 0x02, 0x01, 0x05, 0x30, 0x04, 0x04, 0x02, 0x41, 0x42, 0x01, 0x01, 0xff,
        ];
        let prog = [
            enter(TAG_SEQUENCE),
            store(TAG_INTEGER),
            enter(TAG_SEQUENCE),
            store(TAG_OCTETSTRING),
            LEAVE,
            store(0x01),
            LEAVE,
            END,
        ];
        let mut crs = DerCursor::new(&input);
        let mut out = [DerView::Absent; 3];
        unpack(&mut crs, &prog, &mut out, 1).unwrap();
        assert_eq!(pack_to_vec(&prog, &out).unwrap(), input.to_vec());
    }
}
