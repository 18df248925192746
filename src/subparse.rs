//! Second-pass decomposition of repeated content: SEQUENCE OF / SET OF.
//!
//! The primary unpack leaves a repeated container as one opaque content
//! view, because its arity is data-dependent and the primary path must not
//! allocate.  This driver runs afterwards: it counts the elements, draws
//! one child view array from a pool-style arena, unpacks every element
//! into it (recursively, so nested repetitions work), and rewrites the
//! parent slot to [`DerView::Array`] so the caller indexes children by
//! number instead of re-parsing bytes.
//!
//! Lifetime contract: the arena owns every child array en masse.  There is
//! no per-array release — drop the arena and everything it handed out goes
//! with it.  On failure, arrays allocated so far simply stay in the arena.

use core::cell::{Cell, RefCell};

use crate::cursor::DerCursor;
use crate::error::{DerError, Result};
use crate::schema::field_count;
use crate::unpack::unpack;
use crate::view::DerView;

// ─────────────────────────────────────────────────────────────────────────────
// Pool-style view arena
// ─────────────────────────────────────────────────────────────────────────────

/// Arena for child view arrays, with free-all-on-drop lifetime management.
///
/// The self-referential shape — an arena of views that may themselves point
/// at arena-allocated arrays — is what lets one lifetime cover the input
/// buffer, the flat vector, and every nested array:
///
/// ```
/// use derpack::{DerCursor, DerView, SubParser, ViewArena, schema, unpack_all};
///
/// let input = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
/// let program = [schema::store(schema::TAG_SEQUENCE), schema::END];
/// let ints = [schema::store(schema::TAG_INTEGER), schema::END];
/// let subs = [SubParser { slot: 0, program: &ints, sub: &[] }];
///
/// let arena = ViewArena::new();
/// let mut out = [DerView::Absent; 1];
/// let mut crs = DerCursor::new(&input);
/// unpack_all(&mut crs, &program, &mut out, &subs, 1, &arena).unwrap();
/// assert_eq!(out[0].as_array().unwrap().len(), 2);
/// ```
pub struct ViewArena<'a> {
    chunks: RefCell<Vec<Box<[DerView<'a>]>>>,
    /// Remaining view quota, when capped.
    quota: Cell<Option<usize>>,
}

impl<'a> ViewArena<'a> {
    /// Unbounded arena.
    pub fn new() -> Self {
        ViewArena {
            chunks: RefCell::new(Vec::new()),
            quota: Cell::new(None),
        }
    }

    /// Arena refusing to hand out more than `max_views` views in total.
    /// Use this to bound what untrusted input can make the driver
    /// allocate.
    pub fn with_quota(max_views: usize) -> Self {
        ViewArena {
            chunks: RefCell::new(Vec::new()),
            quota: Cell::new(Some(max_views)),
        }
    }

    /// Total views handed out so far.
    pub fn allocated(&self) -> usize {
        self.chunks.borrow().iter().map(|c| c.len()).sum()
    }

    /// Draw a zero-initialized (all-absent) view array from the arena, or
    /// `None` when the quota is spent.
    pub fn alloc(&'a self, count: usize) -> Option<&'a mut [DerView<'a>]> {
        if let Some(q) = self.quota.get() {
            if count > q {
                return None;
            }
            self.quota.set(Some(q - count));
        }
        let mut chunk = vec![DerView::Absent; count].into_boxed_slice();
        let ptr = chunk.as_mut_ptr();
        self.chunks.borrow_mut().push(chunk);
        // SAFETY: the boxed slice's heap storage has a stable address; the
        // arena only ever pushes chunks and drops them all at once when it
        // is itself dropped, which the `'a` borrow prevents while any
        // handed-out slice is live.  Each call returns a freshly created
        // chunk, so no two returned slices alias.
        Some(unsafe { core::slice::from_raw_parts_mut(ptr, count) })
    }
}

impl Default for ViewArena<'_> {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subparser actions
// ─────────────────────────────────────────────────────────────────────────────

/// Directs the driver into one repeated container of a schema.
///
/// `slot` indexes the container's view within one run of the parent
/// program; `program` describes a single element; `sub` descends further
/// for repetitions nested inside the element.
#[derive(Clone, Copy, Debug)]
pub struct SubParser<'p> {
    /// Output slot (per repeat) holding the repeated container.
    pub slot: usize,
    /// Schema of one contained element.
    pub program: &'p [u8],
    /// Subparsers for repetitions nested inside each element.
    pub sub: &'p [SubParser<'p>],
}

/// Unpack `program`, then explode every repeated container named in
/// `subs` into an arena-allocated child view array.
///
/// After success, each subparsed slot is a [`DerView::Array`] of
/// `count × field_count(child program)` views, grouped per element in
/// program order.  Absent containers (unmatched OPTIONALs) are left
/// absent.  A container with zero elements becomes an empty array.
///
/// Failures: [`DerError::AllocationFailed`] when the arena refuses, or
/// any primary unpack error from a child element.  The rewrite aborts
/// mid-way on failure; discard the output vector and the arena together.
pub fn unpack_all<'a>(
    crs: &mut DerCursor<'a>,
    program: &[u8],
    out: &mut [DerView<'a>],
    subs: &[SubParser<'_>],
    repeats: usize,
    arena: &'a ViewArena<'a>,
) -> Result<()> {
    unpack(crs, program, out, repeats)?;
    let per = field_count(program);
    for r in 0..repeats {
        let base = r * per;
        for s in subs {
            let idx = base + s.slot;
            let container = match out[idx] {
                DerView::Bytes(b) => b,
                _ => continue,
            };
            let n = DerCursor::new(container).count_elements();
            let views = arena
                .alloc(n * field_count(s.program))
                .ok_or(DerError::AllocationFailed)?;
            let mut sub_crs = DerCursor::new(container);
            unpack_all(&mut sub_crs, s.program, views, s.sub, n, arena)?;
            out[idx] = DerView::Array(&*views);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{enter, store, END, LEAVE, TAG_INTEGER, TAG_OCTETSTRING, TAG_SEQUENCE};

    // SEQUENCE OF SEQUENCE { INTEGER, OCTET STRING }, two elements.
    const PAIRS: &[u8] = &[
        0x30, 0x10, // outer SEQUENCE (as stored container)
        0x30, 0x06, 0x02, 0x01, 0x01, 0x04, 0x01, 0x61, // { 1, "a" }
        0x30, 0x06, 0x02, 0x01, 0x02, 0x04, 0x01, 0x62, // { 2, "b" }
    ];

    const PAIRS_PROG: &[u8] = &[store(TAG_SEQUENCE), END];
    const PAIR_ELEM: &[u8] = &[
        enter(TAG_SEQUENCE),
        store(TAG_INTEGER),
        store(TAG_OCTETSTRING),
        LEAVE,
        END,
    ];

    #[test]
    fn explodes_sequence_of_into_child_views() {
        let arena = ViewArena::new();
        let subs = [SubParser { slot: 0, program: PAIR_ELEM, sub: &[] }];
        let mut out = [DerView::Absent; 1];
        let mut crs = DerCursor::new(PAIRS);
        unpack_all(&mut crs, PAIRS_PROG, &mut out, &subs, 1, &arena).unwrap();

        let children = out[0].as_array().unwrap();
        assert_eq!(children.len(), 4);
        assert_eq!(children[0].as_bytes().unwrap(), &[0x01]);
        assert_eq!(children[1].as_bytes().unwrap(), b"a");
        assert_eq!(children[2].as_bytes().unwrap(), &[0x02]);
        assert_eq!(children[3].as_bytes().unwrap(), b"b");
        assert_eq!(arena.allocated(), 4);
    }

    #[test]
    fn zero_element_container_becomes_empty_array() {
        let input = [0x30, 0x00];
        let arena = ViewArena::new();
        let subs = [SubParser { slot: 0, program: PAIR_ELEM, sub: &[] }];
        let mut out = [DerView::Absent; 1];
        let mut crs = DerCursor::new(&input);
        unpack_all(&mut crs, PAIRS_PROG, &mut out, &subs, 1, &arena).unwrap();
        assert_eq!(out[0].as_array().unwrap().len(), 0);
    }

    #[test]
    fn absent_container_is_left_absent() {
        let prog = [
            crate::schema::OPTIONAL,
            store(TAG_SEQUENCE),
            store(TAG_INTEGER),
            END,
        ];
        let input = [0x02, 0x01, 0x2a];
        let arena = ViewArena::new();
        let subs = [SubParser { slot: 0, program: PAIR_ELEM, sub: &[] }];
        let mut out = [DerView::Absent; 2];
        let mut crs = DerCursor::new(&input);
        unpack_all(&mut crs, &prog, &mut out, &subs, 1, &arena).unwrap();
        assert!(out[0].is_absent());
        assert_eq!(out[1].as_bytes().unwrap(), &[0x2a]);
        assert_eq!(arena.allocated(), 0);
    }

    #[test]
    fn nested_repetition_recurses() {
        // SEQUENCE OF SEQUENCE { INTEGER 7, SEQUENCE OF INTEGER { 8, 9 } },
        // one element.
        let input = [
            0x30, 0x0d, 0x30, 0x0b, 0x02, 0x01, 0x07, 0x30, 0x06, 0x02, 0x01, 0x08, 0x02, 0x01,
            0x09,
        ];

        let elem_prog: &[u8] = &[
            enter(TAG_SEQUENCE),
            store(TAG_INTEGER),
            store(TAG_SEQUENCE),
            LEAVE,
            END,
        ];
        let int_prog: &[u8] = &[store(TAG_INTEGER), END];
        let inner_subs = [SubParser { slot: 1, program: int_prog, sub: &[] }];
        let subs = [SubParser { slot: 0, program: elem_prog, sub: &inner_subs }];

        let arena = ViewArena::new();
        let mut out = [DerView::Absent; 1];
        let mut crs = DerCursor::new(&input);
        unpack_all(&mut crs, PAIRS_PROG, &mut out, &subs, 1, &arena).unwrap();

        let elems = out[0].as_array().unwrap();
        assert_eq!(elems.len(), 2);
        assert_eq!(elems[0].as_bytes().unwrap(), &[0x07]);
        let inner = elems[1].as_array().unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner[0].as_bytes().unwrap(), &[0x08]);
        assert_eq!(inner[1].as_bytes().unwrap(), &[0x09]);
    }

    #[test]
    fn quota_exhaustion_is_allocation_failed() {
        let arena = ViewArena::with_quota(3);
        let subs = [SubParser { slot: 0, program: PAIR_ELEM, sub: &[] }];
        let mut out = [DerView::Absent; 1];
        let mut crs = DerCursor::new(PAIRS);
        assert_eq!(
            unpack_all(&mut crs, PAIRS_PROG, &mut out, &subs, 1, &arena),
            Err(DerError::AllocationFailed)
        );
    }

    #[test]
    fn quota_large_enough_succeeds() {
        let arena = ViewArena::with_quota(4);
        let subs = [SubParser { slot: 0, program: PAIR_ELEM, sub: &[] }];
        let mut out = [DerView::Absent; 1];
        let mut crs = DerCursor::new(PAIRS);
        unpack_all(&mut crs, PAIRS_PROG, &mut out, &subs, 1, &arena).unwrap();
        assert_eq!(arena.allocated(), 4);
    }
}
