//! The element view: the single pervasive datum of the codec.
//!
//! Every decoded element is described by a [`DerView`] borrowing the
//! caller's input buffer — parsing never produces owned data.  The view is
//! a tagged variant rather than a pointer/length pair with a stolen bit:
//!
//! - `Absent` — a missing OPTIONAL, an unchosen CHOICE arm, or a value
//!   stripped back to its DEFAULT,
//! - `Bytes` — a borrowed span of DER content (or, for `ANY`, header plus
//!   content),
//! - `Array` — the "prepacked" constructed form: a borrowed slice of child
//!   views that [`pack`](crate::pack::pack) emits as a raw concatenation
//!   under the instruction's header.
//!
//! Views are value types; copy them freely.  They must not outlive the
//! buffer (or arena) they borrow from, which the lifetime enforces.

use core::cmp::Ordering;

/// Borrowed description of one decoded DER element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DerView<'a> {
    /// No value: OPTIONAL absent, CHOICE arm not taken, or DEFAULT'ed.
    #[default]
    Absent,
    /// A span of the input buffer.
    Bytes(&'a [u8]),
    /// A dynamically built constructed element: child views packed as a
    /// raw concatenation.  Produced by callers (prepacking) and by the
    /// subparser driver.
    Array(&'a [DerView<'a>]),
}

impl<'a> DerView<'a> {
    /// True for the absent marker.
    pub fn is_absent(&self) -> bool {
        matches!(self, DerView::Absent)
    }

    /// True when the view carries any payload: a non-empty byte span or a
    /// non-empty child array.
    pub fn is_nonempty(&self) -> bool {
        match self {
            DerView::Absent => false,
            DerView::Bytes(b) => !b.is_empty(),
            DerView::Array(a) => !a.is_empty(),
        }
    }

    /// True when the view's first byte carries the constructed tag bit.
    ///
    /// Meaningful for views that cover a whole element (header included),
    /// such as `ANY` stores and iterator items.
    pub fn is_constructed(&self) -> bool {
        match self {
            DerView::Bytes(b) => b.first().is_some_and(|&t| t & 0x20 != 0),
            _ => false,
        }
    }

    /// Complement of [`is_constructed`](Self::is_constructed) for byte views.
    pub fn is_primitive(&self) -> bool {
        matches!(self, DerView::Bytes(b) if b.first().is_some_and(|&t| t & 0x20 == 0))
    }

    /// The byte span, if this is a `Bytes` view.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            DerView::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The child views, if this is an `Array` view.
    pub fn as_array(&self) -> Option<&'a [DerView<'a>]> {
        match self {
            DerView::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Byte content for comparison purposes: `Absent` and `Array` views
    /// compare as empty.
    fn content(&self) -> &'a [u8] {
        match self {
            DerView::Bytes(b) => b,
            _ => &[],
        }
    }
}

impl<'a> From<&'a [u8]> for DerView<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        DerView::Bytes(bytes)
    }
}

/// Lexicographic byte comparison of two views.
///
/// A view that is a strict prefix of the other orders first; absent views
/// compare as empty.
pub fn cmp_der(a: DerView<'_>, b: DerView<'_>) -> Ordering {
    a.content().cmp(b.content())
}

/// Compare two DER-encoded INTEGER contents as two's-complement big-endian
/// signed values.
///
/// DER integers are minimal, so equal-length same-sign inputs reduce to an
/// unsigned byte comparison.  With equal lengths and differing signs the
/// sign of the first operand decides; with differing lengths the sign of
/// the longer operand decides (inverted when that is the second operand).
/// Only equal-length byte-equal inputs compare equal.
pub fn cmp_int(a: DerView<'_>, b: DerView<'_>) -> Ordering {
    fn negative(bytes: &[u8]) -> bool {
        bytes.first().is_some_and(|&x| x & 0x80 != 0)
    }
    let (ab, bb) = (a.content(), b.content());
    if ab.len() == bb.len() {
        if negative(ab) == negative(bb) {
            return ab.cmp(bb);
        }
        // Same size, different sign: sign of a decides.
        if negative(ab) {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    } else if ab.len() > bb.len() {
        // a covers the bigger range: its sign decides.
        if negative(ab) {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    } else if negative(bb) {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Replace an absent slot with its DEFAULT value.
///
/// The engine does not apply DEFAULTs during unpack; call this afterwards
/// on slots whose syntax carries one.
pub fn put_default<'a>(slot: &mut DerView<'a>, default_value: DerView<'a>) {
    if slot.is_absent() {
        *slot = default_value;
    }
}

/// Strip a slot back to absent when it equals its DEFAULT value, so that
/// packing omits it as DER requires.
pub fn unput_default(slot: &mut DerView<'_>, default_value: DerView<'_>) {
    if cmp_der(*slot, default_value) == Ordering::Equal && !slot.is_absent() {
        *slot = DerView::Absent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_the_default() {
        assert!(DerView::default().is_absent());
        assert!(!DerView::Bytes(b"x").is_absent());
    }

    #[test]
    fn predicates() {
        assert!(DerView::Bytes(&[0x30, 0x00]).is_constructed());
        assert!(DerView::Bytes(&[0x04, 0x00]).is_primitive());
        assert!(!DerView::Bytes(b"").is_nonempty());
        assert!(DerView::Bytes(b"a").is_nonempty());
        assert!(!DerView::Absent.is_constructed());
        assert!(!DerView::Absent.is_primitive());
    }

    #[test]
    fn cmp_der_prefix_orders_first() {
        let a = DerView::Bytes(&[0x01, 0x02]);
        let b = DerView::Bytes(&[0x01, 0x02, 0x00]);
        assert_eq!(cmp_der(a, b), Ordering::Less);
        assert_eq!(cmp_der(b, a), Ordering::Greater);
        assert_eq!(cmp_der(a, a), Ordering::Equal);
    }

    #[test]
    fn cmp_der_absent_is_empty() {
        assert_eq!(cmp_der(DerView::Absent, DerView::Bytes(b"")), Ordering::Equal);
        assert_eq!(cmp_der(DerView::Absent, DerView::Bytes(b"\x00")), Ordering::Less);
    }

    /// Monotone fixture: INTEGER contents in strictly climbing value order.
    const CLIMBERS: &[&[u8]] = &[
        &[0x80, 0x00, 0x00, 0x00, 0x00, 0x00],
        &[0x80, 0x00, 0x00, 0x00, 0x00],
        &[0x80, 0x00, 0x00, 0x00],
        &[0x80, 0x00, 0x00],
        &[0x80, 0x00],
        &[0xe0, 0x00],
        &[0xe0, 0xff],
        &[0x80],
        &[0xe0],
        &[0xf0],
        &[0xfe],
        &[0xff],
        &[0x00],
        &[0x01],
        &[0x40],
        &[0x7f],
        &[0x01, 0x01],
        &[0x7f, 0xff],
        &[0x7f, 0xff, 0xff],
        &[0x7f, 0xff, 0xff, 0xff],
        &[0x7f, 0xff, 0xff, 0xff, 0xff],
    ];

    #[test]
    fn cmp_int_orders_climbers() {
        for (i, a) in CLIMBERS.iter().enumerate() {
            for (j, b) in CLIMBERS.iter().enumerate() {
                let got = cmp_int(DerView::Bytes(a), DerView::Bytes(b));
                let want = i.cmp(&j);
                assert_eq!(got, want, "climbers[{i}] vs climbers[{j}]");
            }
        }
    }

    #[test]
    fn cmp_int_is_antisymmetric() {
        for a in CLIMBERS {
            for b in CLIMBERS {
                let ab = cmp_int(DerView::Bytes(a), DerView::Bytes(b));
                let ba = cmp_int(DerView::Bytes(b), DerView::Bytes(a));
                assert_eq!(ab, ba.reverse());
            }
        }
    }

    #[test]
    fn default_round_trip() {
        let dflt = DerView::Bytes(&[0x00]);
        let mut slot = DerView::Absent;
        put_default(&mut slot, dflt);
        assert_eq!(slot, dflt);
        unput_default(&mut slot, dflt);
        assert!(slot.is_absent());
    }

    #[test]
    fn unput_default_keeps_non_default_values() {
        let dflt = DerView::Bytes(&[0x00]);
        let mut slot = DerView::Bytes(&[0xff]);
        unput_default(&mut slot, dflt);
        assert_eq!(slot, DerView::Bytes(&[0xff]));
    }
}
