use std::collections::HashMap;

use pkg_core::flags::ObjectFlags;
use pkg_core::string::ContainerString;
use thiserror::Error;

use crate::name::FName;

use super::{NameTable, NameTableEntry};

/// Builds a fresh, append-only name table, used only by the exporter when
/// assembling a new container's tables from a filtered source.
#[derive(Debug, Clone, Default)]
pub struct NameTableBuilder {
    names: HashMap<String, FName>,
}

impl NameTableBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Idempotent: interning the same string twice returns the same
    /// [`FName`] (with instance number 0) both times.
    pub fn get_or_insert(&mut self, name: &str) -> Result<FName, Error> {
        if let Some(&existing) = self.names.get(name) {
            return Ok(existing);
        }
        if self.names.len() > i32::MAX as usize {
            return Err(Error::TooManyNames);
        }
        let fname = FName::new(self.names.len() as u32);
        self.names.insert(name.to_string(), fname);
        Ok(fname)
    }

    pub fn build(self) -> Result<NameTable, Error> {
        let mut entries = vec![NameTableEntry::default(); self.names.len()];
        for (name_string, fname) in self.names {
            let entry = &mut entries[fname.name_id as usize];
            entry.name = ContainerString::try_from(name_string.as_str())
                .map_err(|_| Error::NameHasNulBytes(name_string))?;
            entry.flags = ObjectFlags::NAME;
        }
        Ok(NameTable { entries })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("name {0:?} contains NUL bytes")]
    NameHasNulBytes(String),
    #[error("too many names (maximum of {} exceeded)", i32::MAX)]
    TooManyNames,
}
