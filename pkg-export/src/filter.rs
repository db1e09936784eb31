//! §4.H steps 2-3: drop rows the new container shouldn't carry, and build
//! the old-index -> new-index map the later reindex step consumes.

use std::collections::HashMap;

use pkg_format::sections::{ExportRow, ExportTable, ImportRow, ImportTable};
use pkg_format::{Container, ObjectIndex, Row};
use pkg_linker::{Resolver, ResolvedImport};
use tracing::warn;

/// The filtered-but-not-yet-reindexed tables, plus enough pedigree to
/// drive the later reindex and flag-rewrite steps without re-deriving
/// them from scratch.
pub struct FilterOutcome {
    pub imports: ImportTable,
    pub exports: ExportTable,
    /// `export_origins[new_index] == old_index` the new row was cloned
    /// from, in the source container.
    pub export_origins: Vec<ObjectIndex>,
    pub import_origins: Vec<ObjectIndex>,
    /// Old (export- or import-tagged) index -> new index of the same
    /// tag, for every row that survived filtering.
    pub old_to_new: HashMap<ObjectIndex, ObjectIndex>,
}

/// §4.H step 2: drops imports whose name triple is all `"None"` and
/// exports with `serial_size == 0`; removes a `UWorld` export and every
/// export whose outer chain contains it (map-container slimming). Step
/// 3: drops imports that resolve back into one of this container's own
/// exports (§9 Design Notes: the Open Question is resolved by preserving
/// the drop, logging a `warn!` instead of silently repairing it).
pub fn filter(container: &Container, resolver: &Resolver) -> Result<FilterOutcome, crate::Error> {
    let world_index = find_world_export(container);

    let mut exports = ExportTable::default();
    let mut export_origins = Vec::new();
    let mut old_to_new = HashMap::new();

    for (i, export) in container.exports.exports.iter().enumerate() {
        let old_index = ObjectIndex::from_export(i);

        if export.serial_size == 0 {
            continue;
        }
        if let Some(world_index) = world_index {
            if is_world_or_descendant(container, old_index, world_index) {
                continue;
            }
        }

        let new_index = ObjectIndex::from_export(exports.push(round_trip(export)?));
        export_origins.push(old_index);
        old_to_new.insert(old_index, new_index);
    }

    let mut imports = ImportTable::default();
    let mut import_origins = Vec::new();

    for (i, import) in container.imports.imports.iter().enumerate() {
        let old_index = ObjectIndex::from_import(i);

        if is_all_none(container, import) {
            continue;
        }

        if !resolver.is_native(container, import) {
            match resolver.resolve_import(container, import, old_index) {
                Ok(ResolvedImport::Row { container_name, index }) if resolves_into_self(container, &container_name, index) => {
                    warn!(
                        import = container.get_full_name(old_index),
                        "dropping import that resolves back into this container's own export table (RemoveInternalImports, unpromoted per open question)"
                    );
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(import = container.get_full_name(old_index), %err, "dropping import with no resolvable target");
                    continue;
                }
            }
        }

        let new_index = ObjectIndex::from_import(imports.push(round_trip(import)?));
        import_origins.push(old_index);
        old_to_new.insert(old_index, new_index);
    }

    Ok(FilterOutcome {
        imports,
        exports,
        export_origins,
        import_origins,
        old_to_new,
    })
}

/// §4.H step 3: "resolved object's outer is itself an export of this
/// container". Read literally this can only fire when the import's
/// resolution target is this very container (cross-container resolution
/// always lands in the *target* container's tables, never back in the
/// source's) — so the check collapses to "did this import, despite
/// naming another package in its outer chain, resolve to one of our own
/// export rows".
fn resolves_into_self(container: &Container, resolved_container_name: &str, resolved_index: ObjectIndex) -> bool {
    resolved_container_name == container.name && matches!(container.get_row(resolved_index), Some(Row::Export(_)))
}

fn is_all_none(container: &Container, import: &ImportRow) -> bool {
    [import.class_package, import.class_name, import.object_name]
        .iter()
        .all(|name| container.name_of(*name) == b"None")
}

/// The export whose class's own leaf name is `"World"`, if any (§4.H step
/// 2's map-container slimming targets exactly one `UWorld` per
/// container).
fn find_world_export(container: &Container) -> Option<ObjectIndex> {
    container
        .exports
        .exports
        .iter()
        .enumerate()
        .find(|(_, export)| class_leaf_name(container, export.class_ref) == "World")
        .map(|(i, _)| ObjectIndex::from_export(i))
}

fn is_world_or_descendant(container: &Container, index: ObjectIndex, world: ObjectIndex) -> bool {
    let mut current = index;
    loop {
        if current == world {
            return true;
        }
        match container.get_row(current) {
            Some(Row::Export(export)) if !export.outer_ref.is_null() => current = export.outer_ref,
            _ => return false,
        }
    }
}

/// The leaf name of the class a row belongs to: `class_ref == null`
/// denotes the distinguished `Class` of classes (§3 "ExportRow").
pub(crate) fn class_leaf_name(container: &Container, class_ref: ObjectIndex) -> String {
    if class_ref.is_null() {
        return "Class".to_string();
    }
    match container.get_row(class_ref) {
        Some(Row::Export(export)) => String::from_utf8_lossy(container.name_of(export.object_name)).into_owned(),
        Some(Row::Import(import)) => String::from_utf8_lossy(container.name_of(import.object_name)).into_owned(),
        None => String::new(),
    }
}

/// §4.H step 1: clones a row by round-tripping it through its own binary
/// encoder, decoupling the clone from the source container's allocation
/// the same way a byte-for-byte re-read would.
fn round_trip<T>(row: &T) -> Result<T, crate::Error>
where
    T: pkg_core::binary::Serialize + pkg_core::binary::Deserialize,
{
    let bytes = pkg_core::binary::serialize(row).map_err(crate::Error::Other)?;
    pkg_core::binary::deserialize(&bytes).map_err(crate::Error::Other)
}

#[cfg(test)]
mod tests {
    use pkg_core::flags::ObjectFlags;
    use pkg_format::format::ARCHIVE_MAGIC;
    use pkg_format::guid::FGuid;
    use pkg_format::sections::builder::NameTableBuilder;
    use pkg_format::sections::{GenerationInfo, Summary};
    use pkg_linker::{ContainerCache, NativeClassProvider};
    use std::sync::Arc;

    use super::*;

    struct NoSource;
    impl pkg_linker::ContainerSource for NoSource {
        fn open(&self, name: &str) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("container {name:?} unreachable in this test")
        }
    }

    struct NoNativeClasses;
    impl NativeClassProvider for NoNativeClasses {
        fn has_native_class(&self, _container_name: &str, _class_name: &str) -> bool {
            false
        }
    }

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

    fn blank_export(object_name: pkg_format::name::FName, outer_ref: ObjectIndex, class_ref: ObjectIndex, serial_size: i32) -> ExportRow {
        ExportRow {
            class_ref,
            super_ref: ObjectIndex::null(),
            outer_ref,
            object_name,
            archetype_ref: ObjectIndex::null(),
            object_flags: ObjectFlags::empty(),
            serial_size,
            serial_offset: 0,
            export_flags: 0,
            net_object_count: 0,
            guid: FGuid([0; 4]),
            package_flags: 0,
        }
    }

    /// S5: a `World` export and its `Level` child (outer = world) are
    /// dropped; a sibling `StaticMesh` export with its own root outer
    /// survives.
    #[test]
    fn filter_removes_world_and_its_descendants() {
        let mut names = NameTableBuilder::new();
        let package_name = names.get_or_insert("Map").unwrap();
        let world_class = names.get_or_insert("World").unwrap();
        let level_class = names.get_or_insert("Level").unwrap();
        let static_mesh_class = names.get_or_insert("StaticMesh").unwrap();
        let world_name = names.get_or_insert("TheWorld").unwrap();
        let level_name = names.get_or_insert("PersistentLevel").unwrap();
        let mesh_name = names.get_or_insert("Cube").unwrap();
        let names = names.build().unwrap();

        let mut container = Container {
            name: "Map".into(),
            summary: minimal_summary(),
            names,
            imports: Default::default(),
            exports: Default::default(),
            depends: Default::default(),
            data: Vec::new(),
        };

        let package_idx = container.exports.push(blank_export(package_name, ObjectIndex::null(), ObjectIndex::null(), 4));
        let world_class_idx = container
            .exports
            .push(blank_export(world_class, ObjectIndex::from_export(package_idx), ObjectIndex::null(), 4));
        let world_idx = container.exports.push(blank_export(
            world_name,
            ObjectIndex::from_export(package_idx),
            ObjectIndex::from_export(world_class_idx),
            4,
        ));
        let level_class_idx = container
            .exports
            .push(blank_export(level_class, ObjectIndex::from_export(package_idx), ObjectIndex::null(), 4));
        container.exports.push(blank_export(
            level_name,
            ObjectIndex::from_export(world_idx),
            ObjectIndex::from_export(level_class_idx),
            4,
        ));
        let mesh_class_idx = container
            .exports
            .push(blank_export(static_mesh_class, ObjectIndex::from_export(package_idx), ObjectIndex::null(), 4));
        container.exports.push(blank_export(
            mesh_name,
            ObjectIndex::from_export(package_idx),
            ObjectIndex::from_export(mesh_class_idx),
            4,
        ));

        let cache = Arc::new(ContainerCache::new());
        let resolver = Resolver::new(cache, Arc::new(NoSource), Arc::new(NoNativeClasses));

        let outcome = filter(&container, &resolver).unwrap();

        let surviving_names: Vec<String> = outcome
            .exports
            .exports
            .iter()
            .map(|export| String::from_utf8_lossy(container.name_of(export.object_name)).into_owned())
            .collect();

        assert!(!surviving_names.contains(&"TheWorld".to_string()));
        assert!(!surviving_names.contains(&"PersistentLevel".to_string()));
        assert!(surviving_names.contains(&"Cube".to_string()));
    }

    #[test]
    fn filter_drops_exports_with_zero_serial_size() {
        let mut names = NameTableBuilder::new();
        let package_name = names.get_or_insert("Pkg").unwrap();
        let names = names.build().unwrap();

        let mut container = Container {
            name: "Pkg".into(),
            summary: minimal_summary(),
            names,
            imports: Default::default(),
            exports: Default::default(),
            depends: Default::default(),
            data: Vec::new(),
        };
        container.exports.push(blank_export(package_name, ObjectIndex::null(), ObjectIndex::null(), 0));

        let cache = Arc::new(ContainerCache::new());
        let resolver = Resolver::new(cache, Arc::new(NoSource), Arc::new(NoNativeClasses));
        let outcome = filter(&container, &resolver).unwrap();

        assert_eq!(outcome.exports.exports.len(), 0);
    }
}
