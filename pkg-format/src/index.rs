use std::fmt;
use std::io::{Read, Write};

use pkg_core::binary::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Which table a non-null [`ObjectIndex`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTag {
    Null,
    Import,
    Export,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("expected an {expected:?} index, but got a {actual:?} one")]
    WrongIndexTag { expected: IndexTag, actual: IndexTag },
}

/// A tagged signed-integer reference into one container's tables: `0` is
/// null, a positive value `i` refers to export row `i - 1`, a negative
/// value `i` refers to import row `-i - 1`.
///
/// Equality and hashing are value equality/hashing on the raw integer, as
/// the format itself treats it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIndex(i32);

impl ObjectIndex {
    pub const fn null() -> Self {
        Self(0)
    }

    pub fn from_export(export_index: usize) -> Self {
        Self(export_index as i32 + 1)
    }

    pub fn from_import(import_index: usize) -> Self {
        Self(-(import_index as i32) - 1)
    }

    pub fn tag(self) -> IndexTag {
        match self.0.cmp(&0) {
            std::cmp::Ordering::Equal => IndexTag::Null,
            std::cmp::Ordering::Greater => IndexTag::Export,
            std::cmp::Ordering::Less => IndexTag::Import,
        }
    }

    pub fn is_null(self) -> bool {
        self.tag() == IndexTag::Null
    }

    /// The export row index, if this index tags [`IndexTag::Export`].
    pub fn as_export(self) -> Result<usize, Error> {
        match self.tag() {
            IndexTag::Export => Ok((self.0 - 1) as usize),
            actual => Err(Error::WrongIndexTag {
                expected: IndexTag::Export,
                actual,
            }),
        }
    }

    /// The import row index, if this index tags [`IndexTag::Import`].
    pub fn as_import(self) -> Result<usize, Error> {
        match self.tag() {
            IndexTag::Import => Ok((-self.0 - 1) as usize),
            actual => Err(Error::WrongIndexTag {
                expected: IndexTag::Import,
                actual,
            }),
        }
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for ObjectIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            IndexTag::Null => f.write_str("Null"),
            IndexTag::Export => write!(f, "Export({})", self.as_export().unwrap()),
            IndexTag::Import => write!(f, "Import({})", self.as_import().unwrap()),
        }
    }
}

impl Deserialize for ObjectIndex {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
        Ok(Self(deserializer.deserialize::<i32>()?))
    }
}

impl Serialize for ObjectIndex {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
        self.0.serialize(serializer)
    }
}
