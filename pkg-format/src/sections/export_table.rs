use std::io::{Read, Seek, SeekFrom};

use pkg_core::binary::{deserialize, Deserializer};
use pkg_core::flags::ObjectFlags;
use pkg_core::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::guid::FGuid;
use crate::index::ObjectIndex;
use crate::name::FName;

use super::Summary;

/// `class_ref` null denotes the distinguished `Class` of classes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportRow {
    pub class_ref: ObjectIndex,
    pub super_ref: ObjectIndex,
    pub outer_ref: ObjectIndex,
    pub object_name: FName,
    pub archetype_ref: ObjectIndex,
    pub object_flags: ObjectFlags,
    pub serial_size: i32,
    pub serial_offset: i32,
    pub export_flags: u32,
    pub net_object_count: i32,
    pub guid: FGuid,
    pub package_flags: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    pub exports: Vec<ExportRow>,
}

impl ExportTable {
    pub fn get(&self, index: usize) -> Option<&ExportRow> {
        self.exports.get(index)
    }

    pub fn push(&mut self, row: ExportRow) -> usize {
        let index = self.exports.len();
        self.exports.push(row);
        index
    }
}

impl ExportRow {
    /// The byte range of this export's serialized body within the
    /// container's decompressed data.
    pub fn serial_range(&self) -> std::ops::Range<usize> {
        self.serial_offset as usize..(self.serial_offset as usize + self.serial_size as usize)
    }

    pub fn body_bytes<'a>(&self, container_data: &'a [u8]) -> &'a [u8] {
        &container_data[self.serial_range()]
    }

    pub fn deserialize_body<T: pkg_core::binary::Deserialize>(
        &self,
        container_data: &[u8],
    ) -> anyhow::Result<T> {
        deserialize(self.body_bytes(container_data))
    }
}

impl Summary {
    pub fn deserialize_export_table(
        &self,
        deserializer: &mut Deserializer<impl Read + Seek>,
    ) -> anyhow::Result<ExportTable> {
        debug!(
            "deserializing export table ({} exports at {:08x})",
            self.export_count, self.export_offset
        );
        deserializer.seek(SeekFrom::Start(self.export_offset as u64))?;
        let mut exports = Vec::with_capacity(self.export_count as usize);
        for i in 0..self.export_count {
            trace!("export {i} at position {:08x}", deserializer.stream_position());
            exports.push(deserializer.deserialize::<ExportRow>()?);
        }
        Ok(ExportTable { exports })
    }
}
