// derpack — schema-driven zero-copy DER codec

pub mod bitstring;
pub mod cursor;
pub mod dump;
pub mod error;
pub mod header;
pub mod pack;
pub mod scalar;
pub mod schema;
pub mod subparse;
pub mod unpack;
pub mod view;
pub mod walk;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the primary API surface.
// ─────────────────────────────────────────────────────────────────────────────

/// Error kind shared by every fallible primitive.
pub use error::{DerError, Result};

/// Borrowed description of one decoded element: absent, a byte span, or a
/// prepacked child array.
pub use view::DerView;

/// Lexicographic byte comparison of two views.
pub use view::cmp_der;
/// Signed-INTEGER-aware comparison of two views.
pub use view::cmp_int;
/// Manual DEFAULT handling: fill an absent slot before reading.
pub use view::put_default;
/// Manual DEFAULT handling: strip a default-valued slot before packing.
pub use view::unput_default;

/// Shrinking window over a DER buffer with the navigation primitives
/// (skip, enter, focus, iteration).
pub use cursor::{DerCursor, DerIter};

/// Decoded `<tag, length>` preamble.
pub use header::{header, Header};

/// Schema-driven decomposition into a flat vector of views.
pub use unpack::{unpack, unpack_with, Trailing};

/// Reverse-walking schema-driven serialization.
pub use pack::{pack, pack_to_vec};

/// Linear tag-directed navigation with OPTIONAL/CHOICE skipping.
pub use walk::walk;

/// Second pass over repeated content (SEQUENCE OF / SET OF).
pub use subparse::{unpack_all, SubParser, ViewArena};
