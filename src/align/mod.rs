//! Text alignment
//!
//! Locates annotation text inside a document and attaches the surrounding
//! markup and enclosing section to each annotation.
//!
//! # Overview
//!
//! ```text
//! fragments  "Hello"  "world"  "foo bar baz"
//!              │        │        │
//! buffer     "Hello world foo bar baz "
//!             0     6     12
//!                   └──┬───┘
//! annotation      "world foo"  → start fragment 1, end fragment 2
//! ```
//!
//! All fragment text is flattened into one buffer so that highlights spanning
//! several elements can be found with a single substring search. Two sorted
//! key arrays map buffer offsets back to fragments and to sections.
//!
//! Annotations must be aligned in location order: the search cursor only
//! moves forward, so an annotation that appears before the previous match
//! is left unaligned.

mod engine;
mod index;
mod strategy;

pub use engine::{align, AlignedMatch, Aligner, Alignment};
pub use index::{floor_index, lower_bound, TextIndex};
pub use strategy::{resolve_section, AnchorStrategy, SectionStrategy, TitleStrategy};
