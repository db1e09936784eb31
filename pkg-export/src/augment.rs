use pkg_format::sections::{ExportTable, ImportTable, NameTable};

/// Runs once filtering has dropped rows (§4.H step 4: "Post-filter
/// augmentation... runs only after filtering"). The source engine uses
/// this hook to insert placeholder rows the target build expects to find
/// (e.g. a dummy material interface) that have no counterpart in the
/// source container. The core ships no concrete augmentor — this is a
/// deployment-specific policy, named only by the interface the exporter
/// consumes from it, the same way §1 treats body codecs as an external
/// collaborator.
pub trait PostFilterAugmentor: Send + Sync {
    fn augment(&self, names: &mut NameTable, imports: &mut ImportTable, exports: &mut ExportTable) -> anyhow::Result<()>;
}

/// The default augmentor: does nothing.
#[derive(Debug, Default)]
pub struct NoopAugmentor;

impl PostFilterAugmentor for NoopAugmentor {
    fn augment(&self, _names: &mut NameTable, _imports: &mut ImportTable, _exports: &mut ExportTable) -> anyhow::Result<()> {
        Ok(())
    }
}
