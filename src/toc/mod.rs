//! Table of contents
//!
//! Document readers emit a flat, depth-tagged list of TOC entries. This
//! module turns them into a parent-linked `SectionTree`.
//!
//! # Example
//!
//! ```text
//! depth  title          level  parent
//! 0      Part One       1      -
//! 2        Chapter 1    2      Part One
//! 2        Chapter 2    2      Part One
//! 0      Part Two       1      -
//! ```
//!
//! Raw depths are whatever nesting the source markup happened to use; the
//! first time a depth is seen it is given the next free level.

mod builder;
mod section;

pub use builder::{LocationMode, SectionTreeBuilder, TocEntry, SYNTHETIC_LOCATION_STRIDE};
pub use section::{Section, SectionAnchor, SectionId, SectionTree};
