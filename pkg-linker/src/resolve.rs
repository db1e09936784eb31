use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Arc;

use pkg_format::{Container, ImportRow, ObjectIndex, Row};
use pkg_graph::{DependencyGraph, NativeClassHandle, NodeKey, NodeRef};
use tracing::{debug, warn};

use crate::cache::ContainerCache;
use crate::container::{LoadedContainer, NativeClassProvider};
use crate::error::Error;

/// Opens the plaintext byte stream for a container name not yet in the
/// cache. A thin seam over whatever filesystem/archive convention the
/// host uses — this core names only the interface it consumes (§1, §6).
pub trait ContainerSource: Send + Sync {
    fn open(&self, name: &str) -> anyhow::Result<Vec<u8>>;
}

/// Where an import row's reference ultimately points, per §4.F
/// `resolve_import`. Exposed for `pkg-export`'s filter phase, which needs
/// to know whether an import resolves at all (and to what) without
/// re-running the BFS closure itself.
#[derive(Debug, Clone)]
pub enum ResolvedImport {
    Row { container_name: String, index: ObjectIndex },
    Native { container_name: String, handle: NativeClassHandle },
}

/// Implements §4.D's `resolve` contract and §4.F's BFS closure algorithm.
/// Resolving a not-yet-cached container name decodes and caches it on
/// demand, which is what makes loading "recursive by transitivity"
/// (§4.G) without a separate pre-step mapping names to paths.
pub struct Resolver {
    cache: Arc<ContainerCache>,
    source: Arc<dyn ContainerSource>,
    classes: Arc<dyn NativeClassProvider>,
}

impl Resolver {
    pub fn new(cache: Arc<ContainerCache>, source: Arc<dyn ContainerSource>, classes: Arc<dyn NativeClassProvider>) -> Self {
        Self { cache, source, classes }
    }

    pub fn cache(&self) -> &Arc<ContainerCache> {
        &self.cache
    }

    /// `resolve(name) -> Container | None` (§4.D, §6). Returns `None`
    /// only when the container is neither cached nor openable by the
    /// source; callers turn that into `UnresolvedContainer`.
    pub fn resolve(&self, name: &str) -> Option<Arc<LoadedContainer>> {
        if let Some(container) = self.cache.resolve(name) {
            return Some(container);
        }
        debug!(container = name, "resolving container via source");
        let bytes = self
            .source
            .open(name)
            .map_err(|err| warn!(container = name, %err, "cannot open container"))
            .ok()?;
        let container = Container::decode(&mut Cursor::new(bytes), name)
            .map_err(|err| warn!(container = name, %err, "cannot decode container"))
            .ok()?;
        Some(self.cache.add(LoadedContainer::new(container)))
    }

    /// Enriches `graph` with the transitive closure of edges reachable
    /// from `root` (§4.F).
    pub fn add_object_dependencies(&self, graph: &mut DependencyGraph, root: NodeRef) -> Result<(), Error> {
        let mut queue = VecDeque::new();
        graph.add_node(root.clone());
        queue.push_back(root);

        while let Some(current) = queue.pop_front() {
            let index = match &current.key {
                NodeKey::Row(index) => *index,
                // Native class handles have no further edges to enumerate.
                NodeKey::Native(_) => continue,
            };

            let loaded = self
                .resolve(&current.container_name)
                .ok_or_else(|| Error::UnresolvedContainer(current.container_name.clone()))?;
            let container = &loaded.container;

            match container.get_row(index) {
                Some(Row::Import(import)) => {
                    let import = import.clone();
                    if !import.outer.is_null() {
                        let outer = NodeRef::row(&current.container_name, import.outer);
                        graph.add_edge(outer.clone(), current.clone())?;
                        queue.push_back(outer);
                    }
                    if self.is_native(container, &import) {
                        // The class is synthesized natively by the engine
                        // for this very container; look it up by its own
                        // leaf name instead of chasing a cross-container
                        // reference, and don't enqueue it for
                        // materialization (native classes have no body).
                        let leaf = String::from_utf8_lossy(container.name_of(import.object_name)).into_owned();
                        if let Some(handle) = loaded.find_class(&leaf, self.classes.as_ref()) {
                            let node = NodeRef::native(&current.container_name, handle);
                            graph.add_edge(node, current.clone())?;
                        }
                    } else {
                        match self.resolve_import(container, &import, index)? {
                            ResolvedImport::Row { container_name, index } => {
                                let node = NodeRef::row(container_name, index);
                                graph.add_edge(node.clone(), current.clone())?;
                                queue.push_back(node);
                            }
                            ResolvedImport::Native { container_name, handle } => {
                                let node = NodeRef::native(container_name, handle);
                                graph.add_edge(node, current.clone())?;
                            }
                        }
                    }
                }
                Some(Row::Export(export)) => {
                    for reference in [export.outer_ref, export.class_ref, export.super_ref, export.archetype_ref] {
                        if !reference.is_null() {
                            let node = NodeRef::row(&current.container_name, reference);
                            graph.add_edge(node.clone(), current.clone())?;
                            queue.push_back(node);
                        }
                    }
                }
                None => {}
            }
        }

        Ok(())
    }

    /// An import is native iff its top-level package self-identifies as
    /// the current container (§4.F "Is-native test").
    pub fn is_native(&self, container: &Container, import: &ImportRow) -> bool {
        top_level_package_name(container, import) == container.name.as_bytes()
    }

    /// §4.F "resolve_import". Public so the exporter's filter phase (§4.H
    /// step 2) can ask "does this import resolve, and to what" without
    /// duplicating the search.
    pub fn resolve_import(&self, container: &Container, row: &ImportRow, own_index: ObjectIndex) -> Result<ResolvedImport, Error> {
        let target_name = String::from_utf8_lossy(&top_level_package_name(container, row)).into_owned();
        let target = self
            .resolve(&target_name)
            .ok_or_else(|| Error::UnresolvedContainer(target_name.clone()))?;

        let full_name = container.get_full_name(own_index);
        let leaf = full_name.rsplit('.').next().unwrap_or(&full_name).to_string();
        // `full_name` is rooted at the import's own outer chain, which
        // bottoms out at the target package itself; the target container
        // never spells its own name as a prefix of its rows' full names,
        // so the comparison strips that leading segment back off.
        let path_within_target = full_name
            .strip_prefix(&target_name)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&full_name);

        for (i, export) in target.container.exports.exports.iter().enumerate() {
            let index = ObjectIndex::from_export(i);
            if target.container.name_of(export.object_name) == leaf.as_bytes()
                && target.container.get_full_name(index) == path_within_target
            {
                return Ok(ResolvedImport::Row {
                    container_name: target_name,
                    index,
                });
            }
        }

        for (i, candidate) in target.container.imports.imports.iter().enumerate() {
            let index = ObjectIndex::from_import(i);
            if target.container.name_of(candidate.object_name) == leaf.as_bytes()
                && target.container.get_full_name(index) == path_within_target
            {
                return Ok(ResolvedImport::Row {
                    container_name: target_name,
                    index,
                });
            }
        }

        if let Some(handle) = target.find_class(&leaf, self.classes.as_ref()) {
            return Ok(ResolvedImport::Native {
                container_name: target_name,
                handle,
            });
        }

        Err(Error::UnresolvedImport(full_name))
    }
}

fn top_level_package_name(container: &Container, row: &ImportRow) -> Vec<u8> {
    let mut current = row.clone();
    while !current.outer.is_null() {
        match container.get_row(current.outer) {
            Some(Row::Import(next)) => current = next.clone(),
            _ => break,
        }
    }
    container.name_of(current.object_name).to_vec()
}

#[cfg(test)]
mod tests {
    use pkg_core::flags::ObjectFlags;
    use pkg_format::format::ARCHIVE_MAGIC;
    use pkg_format::guid::FGuid;
    use pkg_format::name::FName;
    use pkg_format::sections::builder::NameTableBuilder;
    use pkg_format::sections::{ExportRow, GenerationInfo, Summary};

    use super::*;
    use crate::container::NativeClassProvider;

    struct NoSource;

    impl ContainerSource for NoSource {
        fn open(&self, name: &str) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("container {name:?} is not reachable from this test's source")
        }
    }

    struct NativeClasses {
        known: Vec<&'static str>,
    }

    impl NativeClassProvider for NativeClasses {
        fn has_native_class(&self, _container_name: &str, class_name: &str) -> bool {
            self.known.iter().any(|known| *known == class_name)
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

    fn blank_container(name: &str, names: pkg_format::sections::NameTable) -> Container {
        Container {
            name: name.into(),
            summary: minimal_summary(),
            names,
            imports: Default::default(),
            exports: Default::default(),
            depends: Default::default(),
            data: Vec::new(),
        }
    }

    fn blank_export(object_name: FName, outer_ref: ObjectIndex) -> ExportRow {
        ExportRow {
            class_ref: ObjectIndex::null(),
            super_ref: ObjectIndex::null(),
            outer_ref,
            object_name,
            archetype_ref: ObjectIndex::null(),
            object_flags: ObjectFlags::empty(),
            serial_size: 0,
            serial_offset: 0,
            export_flags: 0,
            net_object_count: 0,
            guid: FGuid([0; 4]),
            package_flags: 0,
        }
    }

    fn resolver_over(cache: Arc<ContainerCache>, native_classes: Vec<&'static str>) -> Resolver {
        Resolver::new(cache, Arc::new(NoSource), Arc::new(NativeClasses { known: native_classes }))
    }

    /// S3: an import chain `B.Core.Foo` in container "A" resolves to the
    /// matching export chain in container "B", pre-cached so the
    /// resolver never has to ask `ContainerSource` for it.
    #[test]
    fn cross_container_import_resolves_to_the_target_export() {
        let mut b_names = NameTableBuilder::new();
        let b_package = b_names.get_or_insert("B").unwrap();
        let b_core = b_names.get_or_insert("Core").unwrap();
        let b_foo = b_names.get_or_insert("Foo").unwrap();
        let b_names = b_names.build().unwrap();

        let mut b = blank_container("B", b_names);
        let b_package_export = b.exports.push(blank_export(b_package, ObjectIndex::null()));
        let b_core_export = b.exports.push(blank_export(b_core, ObjectIndex::from_export(b_package_export)));
        b.exports.push(blank_export(b_foo, ObjectIndex::from_export(b_core_export)));

        let mut a_names = NameTableBuilder::new();
        let a_b = a_names.get_or_insert("B").unwrap();
        let a_core = a_names.get_or_insert("Core").unwrap();
        let a_foo = a_names.get_or_insert("Foo").unwrap();
        let a_class_package = a_names.get_or_insert("Core").unwrap();
        let a_class_name = a_names.get_or_insert("Class").unwrap();
        let a_names = a_names.build().unwrap();

        let mut a = blank_container("A", a_names);
        let a_b_import = a.imports.push(ImportRow {
            class_package: a_class_package,
            class_name: a_class_name,
            outer: ObjectIndex::null(),
            object_name: a_b,
        });
        let a_core_import = a.imports.push(ImportRow {
            class_package: a_class_package,
            class_name: a_class_name,
            outer: ObjectIndex::from_import(a_b_import),
            object_name: a_core,
        });
        let a_foo_import = a.imports.push(ImportRow {
            class_package: a_class_package,
            class_name: a_class_name,
            outer: ObjectIndex::from_import(a_core_import),
            object_name: a_foo,
        });

        let cache = Arc::new(ContainerCache::new());
        cache.add(LoadedContainer::new(b));
        cache.add(LoadedContainer::new(a));

        let resolver = resolver_over(Arc::clone(&cache), vec![]);
        let mut graph = DependencyGraph::new();
        let root = NodeRef::row("A", ObjectIndex::from_import(a_foo_import));
        resolver.add_object_dependencies(&mut graph, root.clone()).unwrap();

        let target = NodeRef::row("B", ObjectIndex::from_export(b_core_export));
        assert!(graph.edges_of(&target).any(|dependent| *dependent == root));
    }

    /// S4: an import whose top-level package is the container itself
    /// resolves to a `NativeClassHandle` edge and is never enqueued for
    /// materialization.
    #[test]
    fn native_import_records_a_handle_edge_without_enqueueing_materialization() {
        let mut names = NameTableBuilder::new();
        let package_name = names.get_or_insert("A").unwrap();
        let vector_name = names.get_or_insert("Vector").unwrap();
        let class_package = names.get_or_insert("Core").unwrap();
        let class_name = names.get_or_insert("Class").unwrap();
        let names = names.build().unwrap();

        let mut a = blank_container("A", names);
        let own_package_import = a.imports.push(ImportRow {
            class_package,
            class_name,
            outer: ObjectIndex::null(),
            object_name: package_name,
        });
        let vector_import = a.imports.push(ImportRow {
            class_package,
            class_name,
            outer: ObjectIndex::from_import(own_package_import),
            object_name: vector_name,
        });

        let cache = Arc::new(ContainerCache::new());
        cache.add(LoadedContainer::new(a));

        let resolver = resolver_over(Arc::clone(&cache), vec!["Vector"]);
        let mut graph = DependencyGraph::new();
        let root = NodeRef::row("A", ObjectIndex::from_import(vector_import));
        resolver.add_object_dependencies(&mut graph, root.clone()).unwrap();

        let native = NodeRef::native("A", NativeClassHandle::new("Vector"));
        assert!(graph.contains_node(&native));
        assert!(graph.edges_of(&native).any(|dependent| *dependent == root));
    }

    /// §8 property 5: every row transitively referenced from a root
    /// (outer, then class) ends up as a graph node ordered before the
    /// root.
    #[test]
    fn closure_reaches_every_row_transitively_referenced_from_the_root() {
        let mut names = NameTableBuilder::new();
        let package_name = names.get_or_insert("A").unwrap();
        let class_name_entry = names.get_or_insert("Widget").unwrap();
        let object_name = names.get_or_insert("Instance").unwrap();
        let names = names.build().unwrap();

        let mut a = blank_container("A", names);
        let package_export = a.exports.push(blank_export(package_name, ObjectIndex::null()));
        let class_export = a.exports.push(blank_export(class_name_entry, ObjectIndex::from_export(package_export)));
        let mut instance = blank_export(object_name, ObjectIndex::from_export(package_export));
        instance.class_ref = ObjectIndex::from_export(class_export);
        let instance_export = a.exports.push(instance);

        let cache = Arc::new(ContainerCache::new());
        cache.add(LoadedContainer::new(a));

        let resolver = resolver_over(Arc::clone(&cache), vec![]);
        let mut graph = DependencyGraph::new();
        let root = NodeRef::row("A", ObjectIndex::from_export(instance_export));
        resolver.add_object_dependencies(&mut graph, root.clone()).unwrap();

        let package_node = NodeRef::row("A", ObjectIndex::from_export(package_export));
        let class_node = NodeRef::row("A", ObjectIndex::from_export(class_export));
        assert!(graph.contains_node(&package_node));
        assert!(graph.contains_node(&class_node));

        let order = graph.topo_sort();
        let pos = |node: &NodeRef| order.iter().position(|n| n == node).unwrap();
        assert!(pos(&package_node) < pos(&root));
        assert!(pos(&class_node) < pos(&root));
    }
}
