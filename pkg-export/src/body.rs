use std::collections::HashMap;

use pkg_format::{Container, ObjectIndex, Row};
use pkg_linker::Object;

/// Everything a body re-encoder needs to remap references embedded in an
/// object's own serialized body (§4.H step 8: "re-emits `ObjectIndex` and
/// `FName` through the exporter's tables so references inside bodies
/// point at the NEW indices"). `FName` ids never move across export (the
/// name table is carried through untouched except for post-filter
/// augmentation, §4.H step 4), so only the `ObjectIndex` remap is
/// exposed here.
pub struct ExportBodyContext<'a> {
    pub old_to_new: &'a HashMap<ObjectIndex, ObjectIndex>,
}

impl<'a> ExportBodyContext<'a> {
    /// The new index a reference embedded in a body should be rewritten
    /// to, or null if the referenced row was dropped during filtering.
    pub fn remap(&self, old: ObjectIndex) -> ObjectIndex {
        if old.is_null() {
            return ObjectIndex::null();
        }
        self.old_to_new.get(&old).copied().unwrap_or(ObjectIndex::null())
    }
}

/// The external collaborator named `ObjectCodecRegistry` in §1, for the
/// write direction: encodes a materialized [`Object`] back into body
/// bytes for a new export row. The core ships only [`IdentityBodyCodec`],
/// which round-trips the object's raw bytes unmodified — correct because
/// the core never parses a class body's internals, so it has nothing to
/// remap there (§8 property 6 relies on exactly this).
pub trait ExportBodyCodec: Send + Sync {
    fn encode(&self, object: &Object, context: ExportBodyContext<'_>) -> anyhow::Result<Vec<u8>>;
}

/// Re-emits an object's stored raw bytes unchanged.
#[derive(Debug, Default)]
pub struct IdentityBodyCodec;

impl ExportBodyCodec for IdentityBodyCodec {
    fn encode(&self, object: &Object, _context: ExportBodyContext<'_>) -> anyhow::Result<Vec<u8>> {
        Ok(object.raw_body().to_vec())
    }
}

/// Looks up the most specific registered body codec for a class by
/// walking its super chain, mirroring
/// [`pkg_linker::ObjectCodecRegistry::find`] on the decode side (§9
/// "Polymorphic objects").
pub struct ExportBodyCodecRegistry {
    codecs: HashMap<String, Box<dyn ExportBodyCodec>>,
    default_codec: Box<dyn ExportBodyCodec>,
}

impl ExportBodyCodecRegistry {
    pub fn new(default_codec: Box<dyn ExportBodyCodec>) -> Self {
        Self {
            codecs: HashMap::new(),
            default_codec,
        }
    }

    pub fn register(&mut self, class_name: impl Into<String>, codec: Box<dyn ExportBodyCodec>) {
        self.codecs.insert(class_name.into(), codec);
    }

    pub fn find(&self, container: &Container, class_index: ObjectIndex) -> &dyn ExportBodyCodec {
        let mut current = class_index;
        loop {
            if current.is_null() {
                return self.default_codec.as_ref();
            }
            match container.get_row(current) {
                Some(Row::Export(export)) => {
                    let leaf = String::from_utf8_lossy(container.name_of(export.object_name)).into_owned();
                    if let Some(codec) = self.codecs.get(&leaf) {
                        return codec.as_ref();
                    }
                    current = export.super_ref;
                }
                Some(Row::Import(import)) => {
                    let leaf = String::from_utf8_lossy(container.name_of(import.object_name)).into_owned();
                    return self
                        .codecs
                        .get(&leaf)
                        .map(|codec| codec.as_ref())
                        .unwrap_or_else(|| self.default_codec.as_ref());
                }
                None => return self.default_codec.as_ref(),
            }
        }
    }
}

impl Default for ExportBodyCodecRegistry {
    fn default() -> Self {
        Self::new(Box::new(IdentityBodyCodec))
    }
}
