//! Foundation crate for the container format stack. Analogous to Unreal's
//! `Core` module, it carries the byte-level codec, primitive newtypes and
//! small cross-cutting helpers the higher crates (`pkg-format`, `pkg-graph`,
//! `pkg-linker`, `pkg-export`) build on.

pub mod binary;
pub mod context;
pub mod flags;
pub mod primitive;
pub mod string;

pub extern crate uuid;

pub use pkg_core_derive::*;
