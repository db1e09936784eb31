pub mod builder;
pub mod common;

use std::io::{Read, Seek, SeekFrom};

use pkg_core::binary::Deserializer;
use pkg_core::flags::ObjectFlags;
use pkg_core::string::ContainerString;
use pkg_core::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::name::FName;

use super::Summary;

pub use builder::Error as GetOrAddError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NameTableEntry {
    pub name: ContainerString,
    pub flags: ObjectFlags,
}

/// Ordered sequence of interned strings. Append-only during export
/// (`NameTableBuilder`); names are never removed once a session starts.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    pub entries: Vec<NameTableEntry>,
}

impl NameTable {
    pub fn get(&self, name_id: usize) -> Option<&NameTableEntry> {
        self.entries.get(name_id)
    }

    pub fn get_str(&self, name_id: usize) -> Option<&[u8]> {
        self.get(name_id).map(|entry| entry.name.to_bytes())
    }

    /// Appends `s` if absent and returns the resulting [`crate::name::FName`]
    /// at instance 0; returns the existing entry's `FName` if `s` is
    /// already interned (§4.B "`get_or_add(s) -> FName` is idempotent").
    /// Used by the exporter's post-filter augmentation step, which may
    /// need to intern a handful of new names into an otherwise untouched
    /// table.
    pub fn get_or_add(&mut self, s: &str) -> Result<FName, GetOrAddError> {
        if let Some(position) = self.entries.iter().position(|entry| entry.name.to_bytes() == s.as_bytes()) {
            return Ok(FName::new(position as u32));
        }
        if self.entries.len() > i32::MAX as usize {
            return Err(GetOrAddError::TooManyNames);
        }
        let fname = FName::new(self.entries.len() as u32);
        self.entries.push(NameTableEntry {
            name: ContainerString::try_from(s).map_err(|_| GetOrAddError::NameHasNulBytes(s.to_string()))?,
            flags: ObjectFlags::NAME,
        });
        Ok(fname)
    }
}

impl Summary {
    pub fn deserialize_name_table(
        &self,
        deserializer: &mut Deserializer<impl Read + Seek>,
    ) -> anyhow::Result<NameTable> {
        debug!(
            "deserializing name table ({} names at {:08x})",
            self.name_count, self.name_offset
        );
        deserializer.seek(SeekFrom::Start(self.name_offset as u64))?;
        let mut entries = Vec::with_capacity(self.name_count as usize);
        for i in 0..self.name_count {
            trace!("name {i} at position {:08x}", deserializer.stream_position());
            entries.push(deserializer.deserialize::<NameTableEntry>()?);
        }
        Ok(NameTable { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_add_is_idempotent() {
        let mut names = NameTable::default();
        let first = names.get_or_add("Core").unwrap();
        let second = names.get_or_add("Core").unwrap();
        assert_eq!(first, second);
        assert_eq!(names.entries.len(), 1);
    }

    #[test]
    fn get_or_add_appends_new_names_in_order() {
        let mut names = NameTable::default();
        let core = names.get_or_add("Core").unwrap();
        let object = names.get_or_add("Object").unwrap();
        assert_ne!(core, object);
        assert_eq!(names.entries.len(), 2);
        assert_eq!(names.get_str(object.name_id as usize), Some("Object".as_bytes()));
    }
}
