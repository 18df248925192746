//! Cursor navigation over a DER byte buffer.
//!
//! A [`DerCursor`] is a shrinking window into an externally owned buffer:
//! the primitives decode headers, step past or into elements, and narrow
//! the window, but never copy.  After a failed mutating primitive the
//! cursor is zeroed, so code that ignores the error reads nothing instead
//! of garbage.

use crate::error::Result;
use crate::header::{header, Header};
use crate::schema::TAG_BITSTRING;
use crate::view::DerView;
use crate::DerError;

/// A window into a DER-encoded byte buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerCursor<'a> {
    pub(crate) bytes: &'a [u8],
}

impl<'a> DerCursor<'a> {
    /// Cursor over a whole buffer.
    pub fn new(bytes: &'a [u8]) -> Self {
        DerCursor { bytes }
    }

    /// Cursor over the content a view describes; absent and prepacked
    /// views give an empty cursor.
    pub fn from_view(view: DerView<'a>) -> Self {
        DerCursor {
            bytes: view.as_bytes().unwrap_or(&[]),
        }
    }

    /// The remaining window.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// A byte view over the remaining window.
    pub fn to_view(&self) -> DerView<'a> {
        DerView::Bytes(self.bytes)
    }

    /// Bytes left in the window.
    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn zero(&mut self) {
        self.bytes = &[];
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.bytes = &self.bytes[n..];
    }

    pub(crate) fn truncate(&mut self, n: usize) {
        self.bytes = &self.bytes[..n];
    }

    /// Decode the header under the cursor, advancing past it.
    pub fn header(&mut self) -> Result<Header> {
        header(self)
    }

    /// Decode the header under the cursor without moving it.
    pub fn peek_header(&self) -> Result<Header> {
        let mut probe = *self;
        header(&mut probe)
    }

    /// Step past the element under the cursor (header and content).
    ///
    /// At the end of input this is a successful no-op, leaving the cursor
    /// empty.
    pub fn skip(&mut self) -> Result<()> {
        match header(self) {
            Ok(h) => {
                self.advance(h.len);
                Ok(())
            }
            Err(e) => {
                self.zero();
                Err(e)
            }
        }
    }

    /// Narrow the cursor to the content of the element under it.
    ///
    /// Entering a BIT STRING requires a zero unused-bit count; that byte
    /// is stepped past, leaving the cursor on the contained octets.
    pub fn enter(&mut self) -> Result<()> {
        let h = match header(self) {
            Ok(h) => h,
            Err(e) => {
                self.zero();
                return Err(e);
            }
        };
        self.truncate(h.len);
        if h.tag == TAG_BITSTRING && !h.is_leave() {
            // Non-empty body guaranteed by header validation.
            if self.bytes[0] != 0x00 {
                self.zero();
                return Err(DerError::BadMessage);
            }
            self.advance(1);
        }
        Ok(())
    }

    /// Narrow the cursor to exactly the first element (header plus
    /// content), dropping any trailing siblings.
    pub fn focus(&mut self) -> Result<()> {
        match self.peek_header() {
            Ok(h) => {
                self.truncate(h.hlen + h.len);
                Ok(())
            }
            Err(e) => {
                self.zero();
                Err(e)
            }
        }
    }

    /// Iterate the elements contained in this window, yielding each as an
    /// exact cursor (header plus content).
    ///
    /// Iteration ends silently at the first spot with fewer than two bytes
    /// left or with a malformed header; use [`skip`](Self::skip) directly
    /// when errors must be told apart from exhaustion.
    pub fn iter(&self) -> DerIter<'a> {
        DerIter { rest: *self }
    }

    /// Count the elements in this window, e.g. the arity of a SEQUENCE OF
    /// content span.
    pub fn count_elements(&self) -> usize {
        self.iter().count()
    }
}

/// Iterator over the sibling elements of a container's content.
pub struct DerIter<'a> {
    rest: DerCursor<'a>,
}

impl<'a> Iterator for DerIter<'a> {
    type Item = DerCursor<'a>;

    fn next(&mut self) -> Option<DerCursor<'a>> {
        if self.rest.remaining() < 2 {
            return None;
        }
        let mut after = self.rest;
        after.skip().ok()?;
        let span = self.rest.remaining() - after.remaining();
        let mut elem = self.rest;
        elem.truncate(span);
        self.rest = after;
        Some(elem)
    }
}
