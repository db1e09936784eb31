//! Two-pass container writer: serializes a header and its three tables,
//! then the export bodies, then rewrites the header and export table once
//! body offsets are known. This is the write half of the table/byte
//! layer; deciding *what* goes into a rewritten container (filtering,
//! reindexing) is `pkg-export`'s job — this module only turns already
//! final tables and bodies into bytes.

use std::io::Cursor;
use std::iter::zip;

use anyhow::Context;
use pkg_core::binary::{Serialize, Serializer};
use pkg_core::string::ContainerString;
use pkg_core::uuid::Uuid;
use thiserror::Error;

use crate::format::{ExportProfile, ARCHIVE_MAGIC};
use crate::sections::{ExportRow, ExportTable, GenerationInfo, ImportTable, NameTable, Summary};

/// Assembles a container from fully-built tables and per-export body
/// bytes. `exports[i].serial_size`/`serial_offset` are recomputed from
/// `bodies[i]`'s actual length and position; whatever the caller put
/// there is discarded.
pub struct Welder<'a> {
    pub package_name: ContainerString,
    pub package_flags: u32,
    pub profile: ExportProfile,
    pub guid: Uuid,
    pub names: &'a NameTable,
    pub imports: &'a ImportTable,
    pub exports: &'a ExportTable,
    /// One body per export, in the same order as `exports`.
    pub bodies: &'a [Vec<u8>],
}

impl<'a> Welder<'a> {
    pub fn weld(self) -> anyhow::Result<Vec<u8>> {
        if self.bodies.len() != self.exports.exports.len() {
            return Err(Error::BodyCountMismatch {
                exports: self.exports.exports.len(),
                bodies: self.bodies.len(),
            }
            .into());
        }

        let mut summary = Summary {
            magic: ARCHIVE_MAGIC,
            file_version: 0,
            licensee_version: self.profile.licensee_version,
            total_header_size: 0,
            package_name: self.package_name,
            package_flags: self.package_flags,
            name_count: self.names.entries.len() as u32,
            name_offset: 0,
            export_count: self.exports.exports.len() as u32,
            export_offset: 0,
            import_count: self.imports.imports.len() as u32,
            import_offset: 0,
            depends_offset: 0,
            additional_packages_to_cook: Vec::new(),
            texture_allocations: Vec::new(),
            guid: self.guid,
            generations: vec![GenerationInfo {
                export_count: self.exports.exports.len() as u32,
                name_count: self.names.entries.len() as u32,
                net_object_count: self.exports.exports.len() as u32,
            }],
            engine_version: self.profile.engine_version,
            cooker_version: self.profile.cooker_version,
            thumbnail_table_offset: 0,
        };

        let mut result = Vec::new();
        let mut cursor = Cursor::new(&mut result);

        summary
            .serialize(&mut Serializer::new(&mut cursor)?)
            .context("cannot serialize placeholder summary")?;

        summary.name_offset = position(&cursor)?;
        for entry in &self.names.entries {
            entry
                .serialize(&mut Serializer::new(&mut cursor)?)
                .context("cannot serialize name table entry")?;
        }

        summary.import_offset = position(&cursor)?;
        for import in &self.imports.imports {
            import
                .serialize(&mut Serializer::new(&mut cursor)?)
                .context("cannot serialize import table entry")?;
        }

        // Exports are written twice: once with placeholder body offsets so
        // every later offset in the file is known, and again once the
        // bodies have actually been placed.
        let mut exports = self.exports.exports.clone();

        let export_table_offset = position(&cursor)?;
        summary.export_offset = export_table_offset;
        for export in &exports {
            export
                .serialize(&mut Serializer::new(&mut cursor)?)
                .context("cannot serialize export table entry")?;
        }

        summary.depends_offset = position(&cursor)?;
        for _ in 0..exports.len() {
            0u32.serialize(&mut Serializer::new(&mut cursor)?)
                .context("cannot serialize depends table entry")?;
        }

        summary.total_header_size = position(&cursor)?;

        for (export, body) in zip(&mut exports, self.bodies) {
            export.serial_offset = position(&cursor)? as i32;
            export.serial_size = body.len() as i32;
            Serializer::new(&mut cursor)?
                .write_bytes(body)
                .context("cannot serialize object body")?;
        }

        cursor.set_position(export_table_offset as u64);
        for export in &exports {
            export
                .serialize(&mut Serializer::new(&mut cursor)?)
                .context("cannot re-serialize export table entry with final offsets")?;
        }

        cursor.set_position(0);
        summary
            .serialize(&mut Serializer::new(&mut cursor)?)
            .context("cannot serialize final summary")?;

        Ok(result)
    }
}

fn position(cursor: &Cursor<&mut Vec<u8>>) -> anyhow::Result<u32> {
    cursor
        .position()
        .try_into()
        .map_err(|_| Error::ContainerTooBig.into())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("container is too big (its size exceeds the signed 32-bit integer limit)")]
    ContainerTooBig,
    #[error("export table has {exports} rows but {bodies} bodies were supplied")]
    BodyCountMismatch { exports: usize, bodies: usize },
}
