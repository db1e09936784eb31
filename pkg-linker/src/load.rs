use std::io::{Read, Seek};
use std::sync::Arc;

use pkg_format::Container;
use pkg_graph::{DependencyGraph, NodeKey, NodeRef};
use tracing::debug;

use crate::cache::ContainerCache;
use crate::container::LoadedContainer;
use crate::error::Error;
use crate::object::ObjectCodecRegistry;
use crate::resolve::Resolver;

/// Orchestrates §4.G: decode, seed the graph from every row, topo-sort,
/// materialize in order.
pub struct Loader {
    resolver: Resolver,
    codecs: ObjectCodecRegistry,
}

impl Loader {
    pub fn new(resolver: Resolver, codecs: ObjectCodecRegistry) -> Self {
        Self { resolver, codecs }
    }

    pub fn cache(&self) -> &Arc<ContainerCache> {
        self.resolver.cache()
    }

    /// `load(stream, name) -> Container`. The filesystem convention that
    /// turns `name` into a byte stream is a host concern (§1); callers
    /// that already hold the bytes pass them in directly, and the
    /// resolver's [`crate::resolve::ContainerSource`] handles containers
    /// referenced transitively that aren't already in hand.
    pub fn load(&self, stream: &mut (impl Read + Seek), name: &str) -> Result<Arc<LoadedContainer>, Error> {
        if let Some(cached) = self.resolver.cache().get(name) {
            return Ok(cached);
        }

        let container = Container::decode(stream, name)?;
        let loaded = self.resolver.cache().add(LoadedContainer::new(container));

        let mut graph = DependencyGraph::new();
        let row_count = loaded.container.exports.exports.len() + loaded.container.imports.imports.len();
        debug!(container = name, rows = row_count, "seeding dependency graph");

        for i in 0..loaded.container.exports.exports.len() {
            let root = NodeRef::row(name, pkg_format::ObjectIndex::from_export(i));
            self.resolver.add_object_dependencies(&mut graph, root)?;
        }
        for i in 0..loaded.container.imports.imports.len() {
            let root = NodeRef::row(name, pkg_format::ObjectIndex::from_import(i));
            self.resolver.add_object_dependencies(&mut graph, root)?;
        }

        let order = graph.topo_sort();
        debug!(container = name, nodes = order.len(), "materializing in topological order");

        for node in order {
            let NodeKey::Row(index) = node.key else {
                continue;
            };
            let owner = self
                .resolver
                .resolve(&node.container_name)
                .ok_or_else(|| Error::UnresolvedContainer(node.container_name.clone()))?;
            if matches!(owner.container.get_row(index), Some(pkg_format::Row::Export(_))) {
                owner.create_object(index, &self.codecs)?;
            }
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use pkg_core::flags::ObjectFlags;
    use pkg_core::string::ContainerString;
    use pkg_core::uuid::Uuid;
    use pkg_format::format::ExportProfile;
    use pkg_format::guid::FGuid;
    use pkg_format::sections::builder::NameTableBuilder;
    use pkg_format::sections::{ExportRow, ExportTable, ImportTable};
    use pkg_format::welder::Welder;
    use pkg_format::ObjectIndex;

    use super::*;
    use crate::container::NativeClassProvider;
    use crate::resolve::ContainerSource;

    struct NoSource;

    impl ContainerSource for NoSource {
        fn open(&self, name: &str) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("container {name:?} is not reachable from this test's source")
        }
    }

    struct NoNativeClasses;

    impl NativeClassProvider for NoNativeClasses {
        fn has_native_class(&self, _container_name: &str, _class_name: &str) -> bool {
            false
        }
    }

    /// S2: decoding a minimal two-export container (a package and one
    /// object inside it) materializes both objects, the outer before its
    /// contents.
    #[test]
    fn minimal_container_loads_and_materializes_in_dependency_order() {
        let mut names = NameTableBuilder::new();
        let package_name = names.get_or_insert("MyPackage").unwrap();
        let object_name = names.get_or_insert("MyObject").unwrap();
        let names = names.build().unwrap();

        let mut exports = ExportTable::default();
        let package_index = exports.push(ExportRow {
            class_ref: ObjectIndex::null(),
            super_ref: ObjectIndex::null(),
            outer_ref: ObjectIndex::null(),
            object_name: package_name,
            archetype_ref: ObjectIndex::null(),
            object_flags: ObjectFlags::empty(),
            serial_size: 0,
            serial_offset: 0,
            export_flags: 0,
            net_object_count: 0,
            guid: FGuid([0; 4]),
            package_flags: 0,
        });
        exports.push(ExportRow {
            class_ref: ObjectIndex::null(),
            super_ref: ObjectIndex::null(),
            outer_ref: ObjectIndex::from_export(package_index),
            object_name,
            archetype_ref: ObjectIndex::null(),
            object_flags: ObjectFlags::empty(),
            serial_size: 0,
            serial_offset: 0,
            export_flags: 0,
            net_object_count: 0,
            guid: FGuid([0; 4]),
            package_flags: 0,
        });

        let bodies = vec![Vec::new(), Vec::new()];
        let welder = Welder {
            package_name: ContainerString::try_from("MyPackage").unwrap(),
            package_flags: 0,
            profile: ExportProfile::default(),
            guid: Uuid::nil(),
            names: &names,
            imports: &ImportTable::default(),
            exports: &exports,
            bodies: &bodies,
        };
        let bytes = welder.weld().unwrap();

        let cache = Arc::new(ContainerCache::new());
        let resolver = Resolver::new(Arc::clone(&cache), Arc::new(NoSource), Arc::new(NoNativeClasses));
        let loader = Loader::new(resolver, ObjectCodecRegistry::default());

        let mut cursor = std::io::Cursor::new(bytes);
        let loaded = loader.load(&mut cursor, "MyPackage").unwrap();

        assert!(loaded.is_materialized(ObjectIndex::from_export(package_index)));
        assert!(loaded.is_materialized(ObjectIndex::from_export(1)));
        assert!(loader.cache().is_cached("MyPackage"));
    }
}
