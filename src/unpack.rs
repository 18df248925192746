//! Schema-driven decomposition: one pass over the input explodes a DER
//! octet stream into a flat vector of element views.
//!
//! The interpreter recurses over the program.  `ENTER` descends into the
//! matching element's content span, `STORE` records a view (content only;
//! `ANY` keeps the header), `OPTIONAL` forgives one mismatch, and a
//! CHOICE group stores exactly one arm, marking the others absent.  Output
//! slots are written in strict program order, so a named overlay of the
//! flat vector lines up field by field.
//!
//! Once a mismatch is forgiven — or a CHOICE arm has been taken — the
//! affected instructions still run, in *opt-out* mode: they consume
//! program bytes and fill their slots with the absent marker without
//! touching the input.  That keeps slot positions fixed no matter which
//! shape the data takes.

use crate::cursor::DerCursor;
use crate::error::{DerError, Result};
use crate::header::header;
use crate::schema::{field_count, ANY, CHOICE_BEGIN, CHOICE_END, ENTER, LEAVE, MATCHBITS, OPTIONAL, TAG_BITSTRING};
use crate::view::DerView;

/// Policy for bytes left inside an entered element after its span of the
/// program has been interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Trailing {
    /// Leftover bytes inside an entered frame are a structural error.
    #[default]
    Strict,
    /// Leftover bytes are ignored; the cursor still resumes right after
    /// the entered element, so siblings are unaffected.
    Lenient,
}

/// Unpack `repeats` consecutive runs of `program` from the cursor into
/// `out`, with the strict trailing-bytes policy.
///
/// See [`unpack_with`] for the full contract.
pub fn unpack<'a>(
    crs: &mut DerCursor<'a>,
    program: &[u8],
    out: &mut [DerView<'a>],
    repeats: usize,
) -> Result<()> {
    unpack_with(crs, program, out, repeats, Trailing::Strict)
}

/// Unpack with an explicit trailing-bytes policy.
///
/// Fills `out[0..repeats * field_count(program)]` in program order, each
/// slot either a view into the input or [`DerView::Absent`].  On success
/// the cursor has advanced past the last consumed element.  On failure the
/// cursor is zeroed and every slot of `out` is reset to absent: partial
/// output never survives.
///
/// `out` shorter than the required slot count is `RangeExceeded`.
pub fn unpack_with<'a>(
    crs: &mut DerCursor<'a>,
    program: &[u8],
    out: &mut [DerView<'a>],
    repeats: usize,
    trailing: Trailing,
) -> Result<()> {
    if out.len() < repeats.saturating_mul(field_count(program)) {
        return Err(DerError::RangeExceeded);
    }
    match run(crs, program, out, repeats, trailing) {
        Ok(()) => Ok(()),
        Err(e) => {
            crs.zero();
            out.fill(DerView::Absent);
            Err(e)
        }
    }
}

fn run<'a>(
    crs: &mut DerCursor<'a>,
    program: &[u8],
    out: &mut [DerView<'a>],
    repeats: usize,
    trailing: Trailing,
) -> Result<()> {
    let mut outctr = 0usize;
    for _ in 0..repeats {
        let mut pc = 0usize;
        unpack_rec(
            crs, program, &mut pc, out, &mut outctr, false, false, false, trailing,
        )?;
    }
    Ok(())
}

/// One recursion frame.  The terminal instruction is `LEAVE` for entered
/// frames (and the top level, where the same byte is `END`) or
/// `CHOICE_END` for choice frames.
#[allow(clippy::too_many_arguments)]
fn unpack_rec<'a>(
    crs: &mut DerCursor<'a>,
    program: &[u8],
    pc: &mut usize,
    out: &mut [DerView<'a>],
    outctr: &mut usize,
    choice: bool,
    mut optional: bool,
    mut optout: bool,
    trailing: Trailing,
) -> Result<()> {
    let terminal = if choice { CHOICE_END } else { LEAVE };
    let mut chosen = false;

    while program[*pc] != terminal {
        let mut cmd = program[*pc];

        // OPTIONAL prefixes the one element that follows.  Doubling it, or
        // using it directly inside a CHOICE, is a program error.
        if cmd == OPTIONAL {
            if optional || choice {
                return Err(DerError::BadMessage);
            }
            optional = true;
            *pc += 1;
            cmd = program[*pc];
        }

        // A CHOICE group becomes its own frame, inheriting the OPTIONAL
        // flag for the group as a whole.  (Inside a choice frame this
        // byte is the terminal, so nesting never reaches here.)
        if cmd == CHOICE_BEGIN {
            *pc += 1;
            unpack_rec(crs, program, pc, out, outctr, true, optional, optout, trailing)?;
            optional = false;
            continue;
        }

        // Exhausted input is acceptable only under OPTIONAL or opt-out;
        // a single leftover byte never is.
        let exhausted = crs.is_empty();
        if crs.remaining() < 2 && !(exhausted && (optional || optout)) {
            return Err(DerError::BadMessage);
        }

        let mut probe = *crs;
        let h = header(&mut probe)?;
        *pc += 1;

        // Decide between a real match, a forgiven mismatch, and a hard
        // failure.  After a choice arm has been taken, or under opt-out,
        // no matching is attempted at all.
        let matched = if chosen || optout {
            false
        } else if !exhausted && (cmd == ANY || (h.tag ^ cmd) & MATCHBITS == 0) {
            if choice {
                chosen = true;
                optout = true; // later arms only mark absence
            }
            true
        } else if choice || optional {
            false
        } else {
            return Err(DerError::BadMessage);
        };

        if cmd & ENTER != 0 {
            if matched {
                let bytes = crs.as_bytes();
                let mut content = DerCursor::new(&bytes[h.hlen..h.hlen + h.len]);
                if cmd == (ENTER | TAG_BITSTRING) {
                    // Byte-aligned DER inside a bit-aligned container:
                    // zero remainder bits required, then skipped.
                    if content.as_bytes().first() != Some(&0x00) {
                        return Err(DerError::BadMessage);
                    }
                    content.advance(1);
                }
                unpack_rec(
                    &mut content, program, pc, out, outctr, false, false, false, trailing,
                )?;
                if trailing == Trailing::Strict && !content.is_empty() {
                    return Err(DerError::BadMessage);
                }
                crs.advance(h.hlen + h.len);
            } else {
                // Walk the span against a throwaway cursor purely to
                // consume its program bytes and mark its slots absent.
                let mut scratch = *crs;
                unpack_rec(
                    &mut scratch, program, pc, out, outctr, false, false, true, trailing,
                )?;
            }
        } else if matched {
            let bytes = crs.as_bytes();
            out[*outctr] = if cmd == ANY {
                DerView::Bytes(&bytes[..h.hlen + h.len])
            } else {
                DerView::Bytes(&bytes[h.hlen..h.hlen + h.len])
            };
            *outctr += 1;
            crs.advance(h.hlen + h.len);
        } else {
            out[*outctr] = DerView::Absent;
            *outctr += 1;
        }

        // The prefix serves one element; in a choice frame it covers the
        // whole group instead.
        if !choice {
            optional = false;
        }
    }
    *pc += 1;

    // A CHOICE that matched nothing is an error unless the group itself
    // was optional or opted out.
    if choice && !chosen && !optional && !optout {
        return Err(DerError::BadMessage);
    }
    Ok(())
}
