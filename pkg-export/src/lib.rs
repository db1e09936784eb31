//! Re-emits a filtered, self-consistent subset of a loaded container's
//! object graph as a new container (§4.H). Builds on `pkg-format`'s
//! table/byte layer (the [`pkg_format::welder::Welder`] two-pass writer
//! in particular) and `pkg-linker`'s cross-container resolver to decide
//! which rows survive and where their new indices land.

pub mod augment;
pub mod body;
pub mod error;
mod exporter;
mod filter;

pub use augment::{NoopAugmentor, PostFilterAugmentor};
pub use body::{ExportBodyCodec, ExportBodyCodecRegistry, ExportBodyContext, IdentityBodyCodec};
pub use error::Error;
pub use exporter::{Exporter, Phase};
pub use filter::FilterOutcome;
