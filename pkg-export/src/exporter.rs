//! §4.H: builds a filtered, reindexed copy of a source container's
//! tables and welds them into a new container's bytes. The typestate
//! below mirrors the spec's `Built -> Filtered -> Reindexed ->
//! HeaderWritten -> TablesWritten -> BodiesWritten -> Finalized` chain;
//! the last three states collapse into one call into
//! `pkg_format::welder::Welder`, which already performs that exact
//! two-pass write non-reentrantly (see DESIGN.md).

use std::collections::HashMap;
use std::io::Write;

use pkg_core::flags::ObjectFlags;
use pkg_format::format::ExportProfile;
use pkg_format::sections::{NameTable, Summary};
use pkg_format::welder::Welder;
use pkg_format::{Container, ObjectIndex};
use pkg_linker::{LoadedContainer, ObjectCodecRegistry, Resolver};
use tracing::{debug, warn};

use crate::augment::PostFilterAugmentor;
use crate::body::{ExportBodyCodecRegistry, ExportBodyContext};
use crate::filter::{self, class_leaf_name};
use crate::Error;

/// The three classes export-row-flag rewrite distinguishes (§4.H step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagCategory {
    Package,
    Resource,
    Other,
}

fn categorize(class_leaf: &str) -> FlagCategory {
    match class_leaf {
        "Package" => FlagCategory::Package,
        "Material" | "MaterialInstance" | "SkeletalMesh" | "StaticMesh" | "Texture" | "Texture2D" => FlagCategory::Resource,
        _ => FlagCategory::Other,
    }
}

impl FlagCategory {
    fn rewrite(self) -> (ObjectFlags, u32) {
        match self {
            FlagCategory::Package => (ObjectFlags::from_bits_retain(0x0007_0004_0000_0000), 1),
            FlagCategory::Resource => (ObjectFlags::from_bits_retain(0x000F_0004_0000_0000), 0),
            FlagCategory::Other => (ObjectFlags::from_bits_retain(0x000F_0004_0000_0400), 0),
        }
    }
}

/// The exporter's state machine (§4.H). Tracked mainly for diagnostics
/// and to reject out-of-order calls with [`Error::NotFinalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Built,
    Filtered,
    Reindexed,
    HeaderWritten,
    TablesWritten,
    BodiesWritten,
    Finalized,
}

/// Builds a new container from a filtered subset of a source container's
/// object graph (§4.H). One `Exporter` performs one export; its methods
/// consume and return `self` so the typestate transitions are linear —
/// calling them out of order is a programmer error reported as
/// [`Error::NotFinalized`] rather than silently doing the wrong thing.
pub struct Exporter<'a> {
    source: &'a LoadedContainer,
    resolver: &'a Resolver,
    registry: &'a ObjectCodecRegistry,
    body_codecs: &'a ExportBodyCodecRegistry,
    augmentor: &'a dyn PostFilterAugmentor,
    profile: ExportProfile,
    phase: Phase,

    summary: Summary,
    names: NameTable,
    outcome: Option<filter::FilterOutcome>,
    /// Parallel to `outcome.exports`, snapshot of each export's
    /// pre-rewrite flags, for the §4.H step 8 "has stack" propagation.
    original_export_flags: Vec<ObjectFlags>,
}

impl<'a> Exporter<'a> {
    /// §4.H step 1: clones the source container's header and tables
    /// (round-tripped through their own encoders by the filter step, so
    /// the clone is decoupled from the source's allocations).
    pub fn new(
        source: &'a LoadedContainer,
        resolver: &'a Resolver,
        registry: &'a ObjectCodecRegistry,
        body_codecs: &'a ExportBodyCodecRegistry,
        augmentor: &'a dyn PostFilterAugmentor,
        profile: ExportProfile,
    ) -> Self {
        Self {
            source,
            resolver,
            registry,
            body_codecs,
            augmentor,
            profile,
            phase: Phase::Built,
            summary: source.container.summary.clone(),
            names: source.container.names.clone(),
            outcome: None,
            original_export_flags: Vec::new(),
        }
    }

    fn container(&self) -> &Container {
        &self.source.container
    }

    fn ensure_phase(&self, expected: Phase, action: &'static str) -> Result<(), Error> {
        if self.phase != expected {
            return Err(Error::NotFinalized { phase: self.phase, action });
        }
        Ok(())
    }

    /// §4.H steps 2-4: filter imports/exports, then run the post-filter
    /// augmentor over the surviving tables.
    pub fn filter(mut self) -> Result<Self, Error> {
        self.ensure_phase(Phase::Built, "filter")?;

        let mut outcome = filter::filter(self.container(), self.resolver)?;
        self.augmentor
            .augment(&mut self.names, &mut outcome.imports, &mut outcome.exports)
            .map_err(Error::Other)?;

        self.original_export_flags = outcome.exports.exports.iter().map(|export| export.object_flags).collect();

        debug!(
            container = %self.container().name,
            kept_exports = outcome.exports.exports.len(),
            kept_imports = outcome.imports.imports.len(),
            "filtered export tables"
        );

        self.outcome = Some(outcome);
        self.phase = Phase::Filtered;
        Ok(self)
    }

    /// §4.H step 5 (header rewrite), step 6 (export-flag rewrite by
    /// class), step 7 (reindex every non-null reference field against
    /// the filtered tables' new indices).
    pub fn reindex(mut self) -> Result<Self, Error> {
        self.ensure_phase(Phase::Filtered, "reindex")?;
        let outcome = self.outcome.as_mut().expect("Filtered phase always carries an outcome");

        self.summary.licensee_version = 0;
        self.summary.cooker_version = 0;
        self.summary.engine_version = self.profile.engine_version;
        self.summary.package_flags = 1;
        self.summary.additional_packages_to_cook.clear();
        self.summary.texture_allocations.clear();
        self.summary.thumbnail_table_offset = 0;

        let source = &self.source.container;
        for export in &mut outcome.exports.exports {
            let category = categorize(&class_leaf_name(source, export.class_ref));
            let (object_flags, package_flags) = category.rewrite();
            export.object_flags = object_flags;
            export.package_flags = package_flags;
        }

        let remap = |old: ObjectIndex, map: &HashMap<ObjectIndex, ObjectIndex>, full_name: &str, field: &str| -> ObjectIndex {
            if old.is_null() {
                return ObjectIndex::null();
            }
            match map.get(&old) {
                Some(&new) => new,
                None => {
                    warn!(object = full_name, field, "reference target was dropped during filtering, nulling it out");
                    ObjectIndex::null()
                }
            }
        };

        for (i, export) in outcome.exports.exports.iter_mut().enumerate() {
            let old_index = outcome.export_origins[i];
            let full_name = source.get_full_name(old_index);
            export.outer_ref = remap(export.outer_ref, &outcome.old_to_new, &full_name, "outer_ref");
            export.class_ref = remap(export.class_ref, &outcome.old_to_new, &full_name, "class_ref");
            export.super_ref = remap(export.super_ref, &outcome.old_to_new, &full_name, "super_ref");
            export.archetype_ref = remap(export.archetype_ref, &outcome.old_to_new, &full_name, "archetype_ref");
        }

        for (i, import) in outcome.imports.imports.iter_mut().enumerate() {
            let old_index = outcome.import_origins[i];
            let full_name = source.get_full_name(old_index);
            import.outer = remap(import.outer, &outcome.old_to_new, &full_name, "outer");
        }

        self.phase = Phase::Reindexed;
        Ok(self)
    }

    /// §4.H write phase: materializes every surviving export's object if
    /// needed, re-encodes its body through [`crate::body::ExportBodyCodecRegistry`],
    /// then hands the final tables and bodies to [`Welder`] for the
    /// two-pass byte layout (steps `HeaderWritten` through `Finalized`
    /// happen inside that one call).
    pub fn write(mut self, output: &mut impl Write) -> Result<(), Error> {
        self.ensure_phase(Phase::Reindexed, "write")?;
        let mut outcome = self.outcome.take().expect("Reindexed phase always carries an outcome");
        self.phase = Phase::HeaderWritten;

        let mut bodies = Vec::with_capacity(outcome.exports.exports.len());
        self.phase = Phase::TablesWritten;

        for (i, old_index) in outcome.export_origins.iter().enumerate() {
            self.source.create_object(*old_index, self.registry)?;
            let object = self
                .source
                .get_object(*old_index)
                .ok_or_else(|| Error::ObjectNotMaterialized(self.container().get_full_name(*old_index)))?;

            if self.original_export_flags[i].contains(ObjectFlags::HAS_STACK) {
                outcome.exports.exports[i].object_flags = object.header().object_flags;
            }

            let codec = self.body_codecs.find(self.container(), outcome.exports.exports[i].class_ref);
            let body = codec
                .encode(&object, ExportBodyContext { old_to_new: &outcome.old_to_new })
                .map_err(Error::Other)?;
            bodies.push(body);
        }
        self.phase = Phase::BodiesWritten;

        let welder = Welder {
            package_name: self.summary.package_name.clone(),
            package_flags: self.summary.package_flags,
            profile: self.profile,
            guid: self.summary.guid,
            names: &self.names,
            imports: &outcome.imports,
            exports: &outcome.exports,
            bodies: &bodies,
        };
        let bytes = welder.weld().map_err(Error::Other)?;
        output.write_all(&bytes).map_err(|err| Error::Other(err.into()))?;

        self.phase = Phase::Finalized;
        Ok(())
    }
}
