use std::collections::HashMap;

use pkg_core::flags::ObjectFlags;
use pkg_format::{Container, ObjectIndex, Row};

/// The capability set every materialized object exposes regardless of
/// its class: an owning container, an outer, a class, an archetype, and
/// object flags (§3 "Object (opaque)").
#[derive(Debug, Clone)]
pub struct ObjectHeader {
    pub container_name: String,
    pub index: ObjectIndex,
    pub outer: ObjectIndex,
    pub class: ObjectIndex,
    pub archetype: ObjectIndex,
    pub object_flags: ObjectFlags,
}

/// A materialized object. Per-class bodies are decoded by whichever
/// [`ObjectCodec`] the registry finds for the class; the core itself
/// ships only the catch-all [`RawBodyCodec`], which tags the variant
/// from the class's leaf name and stores the body unmodified.
#[derive(Debug, Clone)]
pub enum Object {
    UPackage { header: ObjectHeader, raw_body: Vec<u8> },
    UClass { header: ObjectHeader, raw_body: Vec<u8> },
    UMaterial { header: ObjectHeader, raw_body: Vec<u8> },
    UTexture { header: ObjectHeader, raw_body: Vec<u8> },
    USkeletalMesh { header: ObjectHeader, raw_body: Vec<u8> },
    UStaticMesh { header: ObjectHeader, raw_body: Vec<u8> },
    Other { header: ObjectHeader, raw_body: Vec<u8> },
}

impl Object {
    pub fn header(&self) -> &ObjectHeader {
        match self {
            Object::UPackage { header, .. }
            | Object::UClass { header, .. }
            | Object::UMaterial { header, .. }
            | Object::UTexture { header, .. }
            | Object::USkeletalMesh { header, .. }
            | Object::UStaticMesh { header, .. }
            | Object::Other { header, .. } => header,
        }
    }

    pub fn raw_body(&self) -> &[u8] {
        match self {
            Object::UPackage { raw_body, .. }
            | Object::UClass { raw_body, .. }
            | Object::UMaterial { raw_body, .. }
            | Object::UTexture { raw_body, .. }
            | Object::USkeletalMesh { raw_body, .. }
            | Object::UStaticMesh { raw_body, .. }
            | Object::Other { raw_body, .. } => raw_body,
        }
    }
}

/// Everything a body codec needs to construct an [`Object`] from an
/// export row, without itself depending on `Container`'s internals.
pub struct ObjectContext<'a> {
    pub header: ObjectHeader,
    pub class_full_name: &'a str,
    pub body: &'a [u8],
}

/// The external collaborator named `ObjectCodecRegistry` in §1: decodes
/// one class's serialized body into an [`Object`]. The core never ships
/// a concrete implementation beyond [`RawBodyCodec`].
pub trait ObjectCodec: Send + Sync {
    fn decode(&self, context: ObjectContext<'_>) -> anyhow::Result<Object>;
}

/// Stores an object's raw serial bytes unmodified, tagging the variant
/// by the class's leaf name. Round-trips any body without a concrete
/// per-class serializer (§8 property 6).
#[derive(Debug, Default)]
pub struct RawBodyCodec;

impl ObjectCodec for RawBodyCodec {
    fn decode(&self, context: ObjectContext<'_>) -> anyhow::Result<Object> {
        let raw_body = context.body.to_vec();
        let header = context.header;
        // `class_full_name` is the class row's dotted full name (or the
        // bare "Class" sentinel for a null `class_ref`); only the leaf
        // segment names the class itself.
        let leaf = context.class_full_name.rsplit('.').next().unwrap_or(context.class_full_name);
        Ok(match leaf {
            "Package" => Object::UPackage { header, raw_body },
            "Class" => Object::UClass { header, raw_body },
            "Material" | "MaterialInstance" => Object::UMaterial { header, raw_body },
            "Texture" | "Texture2D" => Object::UTexture { header, raw_body },
            "SkeletalMesh" => Object::USkeletalMesh { header, raw_body },
            "StaticMesh" => Object::UStaticMesh { header, raw_body },
            _ => Object::Other { header, raw_body },
        })
    }
}

/// Looks up the most specific registered codec for a class by walking
/// its super chain, falling back to a default catch-all (§9 "Polymorphic
/// objects": "the registry walks the class's super chain to find the
/// most specific registered serializer").
pub struct ObjectCodecRegistry {
    codecs: HashMap<String, Box<dyn ObjectCodec>>,
    default_codec: Box<dyn ObjectCodec>,
}

impl ObjectCodecRegistry {
    pub fn new(default_codec: Box<dyn ObjectCodec>) -> Self {
        Self {
            codecs: HashMap::new(),
            default_codec,
        }
    }

    pub fn register(&mut self, class_name: impl Into<String>, codec: Box<dyn ObjectCodec>) {
        self.codecs.insert(class_name.into(), codec);
    }

    pub fn find(&self, container: &Container, class_index: ObjectIndex) -> &dyn ObjectCodec {
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

impl Default for ObjectCodecRegistry {
    fn default() -> Self {
        Self::new(Box::new(RawBodyCodec))
    }
}

#[cfg(test)]
mod tests {
    use pkg_format::ObjectIndex;

    use super::*;

    fn header() -> ObjectHeader {
        ObjectHeader {
            container_name: "Test".into(),
            index: ObjectIndex::from_export(0),
            outer: ObjectIndex::null(),
            class: ObjectIndex::null(),
            archetype: ObjectIndex::null(),
            object_flags: ObjectFlags::empty(),
        }
    }

    /// A class referenced through an outer chain (e.g. `"Engine.StaticMesh"`)
    /// must still tag the variant by its leaf segment, not fall through to
    /// `Other` just because the class's full name carries a package prefix.
    #[test]
    fn raw_body_codec_tags_variant_from_dotted_full_name_leaf() {
        let codec = RawBodyCodec;
        let object = codec
            .decode(ObjectContext {
                header: header(),
                class_full_name: "Engine.StaticMesh",
                body: &[],
            })
            .unwrap();
        assert!(matches!(object, Object::UStaticMesh { .. }));
    }

    #[test]
    fn raw_body_codec_tags_other_for_unrecognized_class() {
        let codec = RawBodyCodec;
        let object = codec
            .decode(ObjectContext {
                header: header(),
                class_full_name: "Engine.Widget",
                body: &[],
            })
            .unwrap();
        assert!(matches!(object, Object::Other { .. }));
    }
}
