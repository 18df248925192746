//! Render the TLV tree of a DER encoding as indented text.
//!
//! This is the library half of the `derdump` tool.  It leans entirely on
//! the header codec and cursor primitives, so it doubles as a smoke test
//! of both: anything the engine accepts can be printed, anything
//! malformed errors out with the same error kinds the engine uses.

use std::fmt::Write as _;

use crate::cursor::DerCursor;
use crate::error::{DerError, Result};
use crate::schema::{
    TAG_BITSTRING, TAG_BMPSTRING, TAG_BOOLEAN, TAG_ENUMERATED, TAG_GENERALIZEDTIME,
    TAG_IA5STRING, TAG_INTEGER, TAG_NULL, TAG_OCTETSTRING, TAG_OID, TAG_PRINTABLESTRING,
    TAG_SEQUENCE, TAG_SET, TAG_UTCTIME, TAG_UTF8STRING,
};

/// Nesting ceiling: deeper input is treated as malformed rather than
/// risking the stack.
const MAX_DEPTH: usize = 128;

/// Bytes of content shown per primitive line before eliding.
const PREVIEW: usize = 16;

/// Render the elements of `input` (one or more top-level TLVs) as an
/// indented tree.
pub fn dump(input: &[u8]) -> Result<String> {
    let mut out = String::new();
    dump_rec(DerCursor::new(input), 0, &mut out)?;
    Ok(out)
}

fn dump_rec(crs: DerCursor<'_>, depth: usize, out: &mut String) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(DerError::BadMessage);
    }
    let mut rest = crs;
    while !rest.is_empty() {
        let h = rest.peek_header()?;
        let indent = depth * 2;
        if h.tag & 0x20 != 0 {
            let _ = writeln!(out, "{:indent$}{} ({} bytes)", "", tag_label(h.tag), h.len);
            let mut inner = rest;
            inner.focus()?;
            inner.enter()?;
            dump_rec(inner, depth + 1, out)?;
        } else if h.tag == TAG_BITSTRING {
            let content = &rest.as_bytes()[h.hlen..h.hlen + h.len];
            let _ = writeln!(
                out,
                "{:indent$}{} ({} bits): {}",
                "",
                tag_label(h.tag),
                (h.len - 1) * 8 - content[0] as usize,
                preview(&content[1..]),
            );
        } else {
            let content = &rest.as_bytes()[h.hlen..h.hlen + h.len];
            let _ = writeln!(
                out,
                "{:indent$}{} ({} bytes): {}",
                "",
                tag_label(h.tag),
                h.len,
                preview(content),
            );
        }
        rest.skip()?;
    }
    Ok(())
}

fn preview(content: &[u8]) -> String {
    let mut s = String::new();
    for b in content.iter().take(PREVIEW) {
        let _ = write!(s, "{b:02x} ");
    }
    if content.len() > PREVIEW {
        s.push_str("..");
    } else {
        s.pop();
    }
    s
}

fn tag_label(tag: u8) -> String {
    let number = tag & 0x1f;
    match tag >> 6 {
        0b00 => universal_name(number).map_or_else(|| format!("UNIVERSAL {number}"), String::from),
        0b01 => format!("[APPLICATION {number}]"),
        0b10 => format!("[{number}]"),
        _ => format!("[PRIVATE {number}]"),
    }
}

fn universal_name(number: u8) -> Option<&'static str> {
    Some(match number {
        t if t == TAG_BOOLEAN => "BOOLEAN",
        t if t == TAG_INTEGER => "INTEGER",
        t if t == TAG_BITSTRING => "BIT STRING",
        t if t == TAG_OCTETSTRING => "OCTET STRING",
        t if t == TAG_NULL => "NULL",
        t if t == TAG_OID => "OBJECT IDENTIFIER",
        t if t == TAG_ENUMERATED => "ENUMERATED",
        t if t == TAG_UTF8STRING => "UTF8String",
        t if t == TAG_SEQUENCE => "SEQUENCE",
        t if t == TAG_SET => "SET",
        t if t == TAG_PRINTABLESTRING => "PrintableString",
        t if t == TAG_IA5STRING => "IA5String",
        t if t == TAG_UTCTIME => "UTCTime",
        t if t == TAG_GENERALIZEDTIME => "GeneralizedTime",
        t if t == TAG_BMPSTRING => "BMPString",
        _ => return None,
    })
}
