use std::io::{Read, Seek, SeekFrom};

use pkg_core::binary::Deserializer;
use pkg_core::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::index::ObjectIndex;
use crate::name::FName;

use super::Summary;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportRow {
    pub class_package: FName,
    pub class_name: FName,
    /// Null for a top-level container reference.
    pub outer: ObjectIndex,
    pub object_name: FName,
}

#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    pub imports: Vec<ImportRow>,
}

impl ImportTable {
    pub fn get(&self, index: usize) -> Option<&ImportRow> {
        self.imports.get(index)
    }

    pub fn push(&mut self, row: ImportRow) -> usize {
        let index = self.imports.len();
        self.imports.push(row);
        index
    }
}

impl Summary {
    pub fn deserialize_import_table(
        &self,
        deserializer: &mut Deserializer<impl Read + Seek>,
    ) -> anyhow::Result<ImportTable> {
        debug!(
            "deserializing import table ({} imports at {:08x})",
            self.import_count, self.import_offset
        );
        deserializer.seek(SeekFrom::Start(self.import_offset as u64))?;
        let mut imports = Vec::with_capacity(self.import_count as usize);
        for i in 0..self.import_count {
            trace!("import {i} at position {:08x}", deserializer.stream_position());
            imports.push(deserializer.deserialize::<ImportRow>()?);
        }
        Ok(ImportTable { imports })
    }
}
