use std::io::{Read, Seek, SeekFrom};

use pkg_core::binary::Deserializer;
use tracing::debug;

use super::Summary;

/// The depends table holds one 32-bit slot per export. The core never
/// produces real per-object dependency data here (§6); it reads whatever
/// is on disk and, on export, emits `export_count` zeros.
#[derive(Debug, Clone, Default)]
pub struct DependencyTable {
    pub raw: Vec<u32>,
}

impl Summary {
    pub fn deserialize_dependency_table(
        &self,
        deserializer: &mut Deserializer<impl Read + Seek>,
    ) -> anyhow::Result<DependencyTable> {
        debug!(
            "deserializing dependency table ({} entries at {:08x})",
            self.export_count, self.depends_offset
        );
        deserializer.seek(SeekFrom::Start(self.depends_offset as u64))?;
        let mut raw = Vec::with_capacity(self.export_count as usize);
        for _ in 0..self.export_count {
            raw.push(deserializer.deserialize::<u32>()?);
        }
        Ok(DependencyTable { raw })
    }
}
