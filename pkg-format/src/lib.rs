//! The container's table/byte layer: header, name table, import table,
//! export table, and the raw body bytes they describe. Analogous to
//! `UObject`'s linker-facing serialization layer, scoped to the parts
//! that don't require a live class hierarchy to make sense of.
//!
//! Resolving an [`index::ObjectIndex`] across containers, materializing
//! objects from their class's body codec, and re-emitting a filtered
//! container are all one layer up, in `pkg-linker`/`pkg-export`.

pub mod container;
pub mod error;
pub mod format;
pub mod guid;
pub mod index;
pub mod name;
pub mod sections;
pub mod welder;

pub use container::{Container, Row};
pub use error::Error;
pub use index::{IndexTag, ObjectIndex};
