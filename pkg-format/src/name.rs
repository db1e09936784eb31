use std::io::{Read, Write};

use pkg_core::binary::{Deserialize, Deserializer, Serialize, Serializer};

use crate::sections::NameTable;

pkg_core::context! {
    /// Thread-local name table used only to make `Debug` output on
    /// [`FName`] and the row types human-readable; never consulted by any
    /// correctness-bearing code path.
    pub let current_name_table: NameTable;
}

/// `(name_id, instance_number)`. `name_id` indexes a container's name
/// table; strings are compared by id within a container, never by value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FName {
    pub name_id: u32,
    pub instance_number: u32,
}

impl FName {
    pub const fn new(name_id: u32) -> Self {
        Self {
            name_id,
            instance_number: 0,
        }
    }

    pub fn to_bytes<'a>(&self, name_table: &'a NameTable) -> &'a [u8] {
        name_table.get_str(self.name_id as usize).unwrap_or(b"")
    }
}

impl Deserialize for FName {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
        Ok(Self {
            name_id: deserializer.deserialize()?,
            instance_number: deserializer.deserialize()?,
        })
    }
}

impl Serialize for FName {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
        self.name_id.serialize(serializer)?;
        self.instance_number.serialize(serializer)
    }
}

impl std::fmt::Debug for FName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name_table) = current_name_table::get() {
            if let Some(entry) = name_table.get(self.name_id as usize) {
                f.write_str("'")?;
                std::fmt::Display::fmt(&entry.name, f)?;
                f.write_str("'")?;
            } else {
                write!(f, "<invalid name {}>", self.name_id)?;
            }
        } else {
            write!(f, "<name {}>", self.name_id)?;
        }
        if self.instance_number != 0 {
            write!(f, "_{}", self.instance_number)?;
        }
        Ok(())
    }
}
