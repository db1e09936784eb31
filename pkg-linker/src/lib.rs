//! Resolves cross-container object references into a load order and
//! materializes objects in that order. Builds on `pkg-format`'s table
//! layer and `pkg-graph`'s topological sort; the per-class body codec
//! remains an external collaborator (`ObjectCodecRegistry`, §1).

pub mod cache;
pub mod container;
pub mod error;
pub mod load;
pub mod object;
pub mod resolve;

pub use cache::ContainerCache;
pub use container::{LoadedContainer, NativeClassProvider};
pub use error::Error;
pub use load::Loader;
pub use object::{Object, ObjectCodec, ObjectCodecRegistry, ObjectContext, ObjectHeader, RawBodyCodec};
pub use resolve::{ContainerSource, ResolvedImport, Resolver};
