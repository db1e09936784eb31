use std::collections::HashMap;
use std::sync::RwLock;

use pkg_format::{Container, ObjectIndex, Row};
use pkg_graph::NativeClassHandle;
use tracing::trace;

use crate::error::Error;
use crate::object::{Object, ObjectCodecRegistry, ObjectContext, ObjectHeader};

/// A decoded [`Container`] plus its lazily-materialized objects (§3
/// "Container"). Wrapping rather than extending `Container` itself keeps
/// the table/byte layer ignorant of the object-body codec boundary,
/// which is this layer's named external collaborator.
pub struct LoadedContainer {
    pub container: Container,
    objects: RwLock<HashMap<ObjectIndex, Object>>,
}

/// Asked only when an import has no corresponding row in its target
/// container — whether the engine synthesizes `class_name` natively for
/// `container_name`, with no import/export row anywhere.
pub trait NativeClassProvider: Send + Sync {
    fn has_native_class(&self, container_name: &str, class_name: &str) -> bool;
}

impl LoadedContainer {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.container.name
    }

    pub fn is_materialized(&self, index: ObjectIndex) -> bool {
        self.objects.read().unwrap().contains_key(&index)
    }

    pub fn get_object(&self, index: ObjectIndex) -> Option<Object> {
        self.objects.read().unwrap().get(&index).cloned()
    }

    /// Returns a native class handle for `class_name` if `provider`
    /// confirms the engine synthesizes it for this container natively.
    pub fn find_class(&self, class_name: &str, provider: &dyn NativeClassProvider) -> Option<NativeClassHandle> {
        provider
            .has_native_class(&self.container.name, class_name)
            .then(|| NativeClassHandle::new(class_name))
    }

    /// Constructs the object at `index` if it isn't already materialized,
    /// by invoking `registry`'s most specific codec for its class over
    /// `[serial_offset, serial_offset + serial_size)`.
    ///
    /// Precondition (enforced by the caller, per the topological order
    /// produced by the resolver): every object this one's export row
    /// references has already been materialized.
    pub fn create_object(&self, index: ObjectIndex, registry: &ObjectCodecRegistry) -> Result<(), Error> {
        if self.is_materialized(index) {
            return Ok(());
        }

        let export = match self.container.get_row(index) {
            Some(Row::Export(export)) => export.clone(),
            _ => {
                return Err(Error::ObjectNotMaterialized(format!(
                    "{}:{:?} is not an export row",
                    self.container.name, index
                )))
            }
        };

        trace!(container = %self.container.name, ?index, "materializing object");

        // `class_ref == null` denotes the distinguished `Class` of classes
        // (§3 "ExportRow"), which has no row of its own to walk a full name
        // from.
        let class_full_name = if export.class_ref.is_null() {
            "Class".to_string()
        } else {
            self.container.get_full_name(export.class_ref)
        };
        let header = ObjectHeader {
            container_name: self.container.name.clone(),
            index,
            outer: export.outer_ref,
            class: export.class_ref,
            archetype: export.archetype_ref,
            object_flags: export.object_flags,
        };
        let body = export.body_bytes(&self.container.data);
        let codec = registry.find(&self.container, export.class_ref);
        let object = codec
            .decode(ObjectContext {
                header,
                class_full_name: &class_full_name,
                body,
            })
            .map_err(Error::Other)?;

        self.objects.write().unwrap().insert(index, object);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pkg_core::flags::ObjectFlags;
    use pkg_format::format::ARCHIVE_MAGIC;
    use pkg_format::guid::FGuid;
    use pkg_format::sections::builder::NameTableBuilder;
    use pkg_format::sections::{ExportRow, GenerationInfo, Summary};

    use super::*;

    fn minimal_summary() -> Summary {
        Summary {
            magic: ARCHIVE_MAGIC,
            file_version: 100,
            licensee_version: 0,
            total_header_size: 0,
            package_name: Default::default(),
            package_flags: 0,
            name_count: 0,
            name_offset: 0,
            export_count: 0,
            export_offset: 0,
            import_count: 0,
            import_offset: 0,
            depends_offset: 0,
            additional_packages_to_cook: Vec::new(),
            texture_allocations: Vec::new(),
            guid: Default::default(),
            generations: vec![GenerationInfo::default()],
            engine_version: 0,
            cooker_version: 0,
            thumbnail_table_offset: 0,
        }
    }

    /// An export whose own `class_ref` is null denotes "the distinguished
    /// `Class` of classes" (§3 "ExportRow") and must materialize as a
    /// `UClass`, not fall through to the catch-all `Other` variant.
    #[test]
    fn export_with_null_class_ref_materializes_as_uclass() {
        let mut names = NameTableBuilder::new();
        let class_name = names.get_or_insert("MyClass").unwrap();
        let names = names.build().unwrap();

        let mut container = Container {
            name: "Test".into(),
            summary: minimal_summary(),
            names,
            imports: Default::default(),
            exports: Default::default(),
            depends: Default::default(),
            data: Vec::new(),
        };
        let index = container.exports.push(ExportRow {
            class_ref: ObjectIndex::null(),
            super_ref: ObjectIndex::null(),
            outer_ref: ObjectIndex::null(),
            object_name: class_name,
            archetype_ref: ObjectIndex::null(),
            object_flags: ObjectFlags::empty(),
            serial_size: 0,
            serial_offset: 0,
            export_flags: 0,
            net_object_count: 0,
            guid: FGuid([0; 4]),
            package_flags: 0,
        });

        let loaded = LoadedContainer::new(container);
        let registry = ObjectCodecRegistry::default();
        loaded.create_object(ObjectIndex::from_export(index), &registry).unwrap();

        let object = loaded.get_object(ObjectIndex::from_export(index)).unwrap();
        assert!(matches!(object, Object::UClass { .. }));
    }
}
