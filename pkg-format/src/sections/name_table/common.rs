use crate::name::FName;

use super::builder::{Error, NameTableBuilder};

/// The small set of well-known names the exporter needs to intern on
/// every run (the distinguished `"None"` sentinel and the handful of
/// built-in class/package names referenced when rewriting rows).
pub struct CommonNames {
    pub none: FName,
    pub class: CommonClassNames,
}

pub struct CommonClassNames {
    pub object: FName,
    pub class: FName,
    pub package: FName,
}

impl CommonNames {
    pub fn get_or_insert_into(builder: &mut NameTableBuilder) -> Result<Self, Error> {
        Ok(Self {
            none: builder.get_or_insert("None")?,
            class: CommonClassNames::get_or_insert_into(builder)?,
        })
    }
}

impl CommonClassNames {
    pub fn get_or_insert_into(builder: &mut NameTableBuilder) -> Result<Self, Error> {
        Ok(Self {
            object: builder.get_or_insert("Object")?,
            class: builder.get_or_insert("Class")?,
            package: builder.get_or_insert("Package")?,
        })
    }
}
