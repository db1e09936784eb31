use std::io::{Read, Seek, SeekFrom};

use anyhow::Context;
use tracing::debug;

use crate::error::Error;
use crate::index::{IndexTag, ObjectIndex};
use crate::name::FName;
use crate::sections::{DependencyTable, ExportRow, ExportTable, ImportRow, ImportTable, NameTable, Summary};

/// A decoded container: header, name table, import table, export table.
/// Object bodies are left unread until a caller asks for them — decoding
/// structure is cheap, decoding every object's body eagerly is not.
///
/// `Container` only knows about the table/byte layer; resolving imports
/// across containers and materializing objects from class codecs is
/// `pkg-linker`'s job, since the per-class body codec is this core's
/// named external collaborator (`ObjectCodecRegistry`, §1).
#[derive(Debug, Clone)]
pub struct Container {
    pub name: String,
    pub summary: Summary,
    pub names: NameTable,
    pub imports: ImportTable,
    pub exports: ExportTable,
    pub depends: DependencyTable,
    /// The plaintext container stream, already decompressed by the host
    /// (decompression is this core's Non-goal, §1).
    pub data: Vec<u8>,
}

/// Either row a non-null [`ObjectIndex`] may resolve to within a single
/// container.
#[derive(Debug, Clone)]
pub enum Row<'a> {
    Import(&'a ImportRow),
    Export(&'a ExportRow),
}

impl Container {
    /// Parses header, names, imports and exports from an already
    /// plaintext stream. Object bodies are not read.
    pub fn decode(stream: &mut (impl Read + Seek), name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        debug!(container = %name, "decoding container");

        let mut data = Vec::new();
        stream.seek(SeekFrom::Start(0))?;
        stream.read_to_end(&mut data)?;

        let (summary, names, imports, exports, depends) = {
            let mut deserializer = pkg_core::binary::Deserializer::from_buffer(data.as_slice());
            let summary = deserializer
                .deserialize::<Summary>()
                .map_err(|err| Error::MalformedHeader(err.to_string()))?;
            let names = summary
                .deserialize_name_table(&mut deserializer)
                .with_context(|| "reading name table")
                .map_err(|err| truncated("name", summary.name_count, err))?;
            let imports = summary
                .deserialize_import_table(&mut deserializer)
                .with_context(|| "reading import table")
                .map_err(|err| truncated("import", summary.import_count, err))?;
            let exports = summary
                .deserialize_export_table(&mut deserializer)
                .with_context(|| "reading export table")
                .map_err(|err| truncated("export", summary.export_count, err))?;
            let depends = summary
                .deserialize_dependency_table(&mut deserializer)
                .with_context(|| "reading depends table")
                .map_err(|err| truncated("depends", summary.export_count, err))?;
            (summary, names, imports, exports, depends)
        };

        validate_name_references(&names, &imports, &exports)?;

        Ok(Self {
            name,
            summary,
            names,
            imports,
            exports,
            depends,
            data,
        })
    }

    /// Constant-time dispatch on an index's tag. Returns `None` for a
    /// null index or an index past the end of its table.
    pub fn get_row(&self, index: ObjectIndex) -> Option<Row<'_>> {
        match index.tag() {
            IndexTag::Null => None,
            IndexTag::Export => self.exports.get(index.as_export().ok()?).map(Row::Export),
            IndexTag::Import => self.imports.get(index.as_import().ok()?).map(Row::Import),
        }
    }

    pub fn name_of(&self, name: FName) -> &[u8] {
        name.to_bytes(&self.names)
    }

    /// Joins a row's own name with the chain of its outers, separated by
    /// `.`, walking `outer`/`outer_ref` until null.
    pub fn get_full_name(&self, index: ObjectIndex) -> String {
        let mut segments = Vec::new();
        let mut current = Some(index);
        while let Some(index) = current {
            match self.get_row(index) {
                Some(Row::Import(import)) => {
                    segments.push(String::from_utf8_lossy(self.name_of(import.object_name)).into_owned());
                    current = (!import.outer.is_null()).then_some(import.outer);
                }
                Some(Row::Export(export)) => {
                    segments.push(String::from_utf8_lossy(self.name_of(export.object_name)).into_owned());
                    current = (!export.outer_ref.is_null()).then_some(export.outer_ref);
                }
                None => break,
            }
        }
        segments.reverse();
        segments.join(".")
    }
}

fn truncated(table: &'static str, expected: u32, source: anyhow::Error) -> Error {
    debug!(table, expected, %source, "table truncated");
    Error::TruncatedTable { table, expected }
}

/// §4.C: `decode` fails with `BadNameReference` when a row's `FName`
/// points past the end of the name table it was decoded alongside.
fn validate_name_references(names: &NameTable, imports: &ImportTable, exports: &ExportTable) -> Result<(), Error> {
    let check = |name: FName| -> Result<(), Error> {
        if names.get(name.name_id as usize).is_none() {
            return Err(Error::BadNameReference(name.name_id));
        }
        Ok(())
    };
    for import in &imports.imports {
        check(import.class_package)?;
        check(import.class_name)?;
        check(import.object_name)?;
    }
    for export in &exports.exports {
        check(export.object_name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pkg_core::binary::serialize;

    use super::*;
    use crate::format::ARCHIVE_MAGIC;
    use crate::sections::{GenerationInfo, Summary};

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

    #[test]
    fn decode_rejects_bad_magic() {
        let mut summary = minimal_summary();
        summary.magic = 0xDEAD_BEEF;
        let bytes = serialize(&summary).unwrap();
        let mut cursor = Cursor::new(bytes);
        let err = Container::decode(&mut cursor, "Test").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }

    #[test]
    fn decode_empty_container_round_trips() {
        let summary = minimal_summary();
        let bytes = serialize(&summary).unwrap();
        let mut cursor = Cursor::new(bytes);
        let container = Container::decode(&mut cursor, "Test").unwrap();
        assert_eq!(container.name, "Test");
        assert_eq!(container.exports.exports.len(), 0);
        assert_eq!(container.imports.imports.len(), 0);
    }

    #[test]
    fn decode_rejects_export_with_out_of_bounds_name() {
        use pkg_core::flags::ObjectFlags;

        use crate::guid::FGuid;

        let mut summary = minimal_summary();
        summary.export_count = 1;

        let mut bytes = serialize(&summary).unwrap();
        summary.export_offset = bytes.len() as u32;
        summary.name_offset = bytes.len() as u32;

        let export = ExportRow {
            class_ref: ObjectIndex::null(),
            super_ref: ObjectIndex::null(),
            outer_ref: ObjectIndex::null(),
            object_name: FName::new(0),
            archetype_ref: ObjectIndex::null(),
            object_flags: ObjectFlags::empty(),
            serial_size: 0,
            serial_offset: 0,
            export_flags: 0,
            net_object_count: 0,
            guid: FGuid([0; 4]),
            package_flags: 0,
        };
        let export_bytes = serialize(&export).unwrap();

        bytes = serialize(&summary).unwrap();
        bytes.extend_from_slice(&export_bytes);

        let mut cursor = Cursor::new(bytes);
        let err = Container::decode(&mut cursor, "Test").unwrap_err();
        assert!(matches!(err, Error::BadNameReference(0)));
    }

    #[test]
    fn full_name_joins_outer_chain() {
        use pkg_core::flags::ObjectFlags;

        use crate::guid::FGuid;
        use crate::sections::builder::NameTableBuilder;

        let mut builder = NameTableBuilder::default();
        let package_name = builder.get_or_insert("MyPackage").unwrap();
        let object_name = builder.get_or_insert("MyObject").unwrap();
        let names = builder.build().unwrap();

        let mut container = Container {
            name: "Test".into(),
            summary: minimal_summary(),
            names,
            imports: Default::default(),
            exports: Default::default(),
            depends: Default::default(),
            data: Vec::new(),
        };

        let package_index = container.exports.push(ExportRow {
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
        container.exports.push(ExportRow {
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

        let full_name = container.get_full_name(ObjectIndex::from_export(1));
        assert_eq!(full_name, "MyPackage.MyObject");
    }
}
