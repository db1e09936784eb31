use anyhow::ensure;
use pkg_core::string::ContainerString;
use pkg_core::uuid::Uuid;
use pkg_core::{Deserialize, Serialize};

use crate::format;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationInfo {
    pub export_count: u32,
    pub name_count: u32,
    pub net_object_count: u32,
}

/// One entry of the header's texture-allocation hint list; export clears
/// this list entirely (§4.H step 5), so the core only needs to round-trip
/// it faithfully on load.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextureAllocation {
    pub size_x: i32,
    pub size_y: i32,
    pub num_mips: i32,
    pub format: i32,
    pub tex_create_flags: i32,
    pub export_indices: Vec<i32>,
}

/// The container's header (`FileSummary`). Versions are carried through
/// verbatim on load; only export rewrites a handful of fields (§4.H step 5).
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub magic: u32,
    pub file_version: u16,
    pub licensee_version: u16,
    pub total_header_size: u32,
    pub package_name: ContainerString,
    pub package_flags: u32,

    pub name_count: u32,
    pub name_offset: u32,
    pub export_count: u32,
    pub export_offset: u32,
    pub import_count: u32,
    pub import_offset: u32,
    pub depends_offset: u32,

    pub additional_packages_to_cook: Vec<ContainerString>,
    pub texture_allocations: Vec<TextureAllocation>,

    pub guid: Uuid,
    pub generations: Vec<GenerationInfo>,

    pub engine_version: u32,
    pub cooker_version: u32,

    pub thumbnail_table_offset: u32,
}

impl pkg_core::binary::Deserialize for Summary {
    fn deserialize(
        deserializer: &mut pkg_core::binary::Deserializer<impl std::io::Read>,
    ) -> anyhow::Result<Self> {
        let magic = deserializer.deserialize()?;
        ensure!(
            magic == format::ARCHIVE_MAGIC,
            "container magic number does not match {:08x} (found {:08x})",
            format::ARCHIVE_MAGIC,
            magic
        );
        let summary = Self {
            magic,
            file_version: deserializer.deserialize()?,
            licensee_version: deserializer.deserialize()?,
            total_header_size: deserializer.deserialize()?,
            package_name: deserializer.deserialize()?,
            package_flags: deserializer.deserialize()?,
            name_count: deserializer.deserialize()?,
            name_offset: deserializer.deserialize()?,
            export_count: deserializer.deserialize()?,
            export_offset: deserializer.deserialize()?,
            import_count: deserializer.deserialize()?,
            import_offset: deserializer.deserialize()?,
            depends_offset: deserializer.deserialize()?,
            additional_packages_to_cook: deserializer.deserialize()?,
            texture_allocations: deserializer.deserialize()?,
            guid: deserializer.deserialize()?,
            generations: deserializer.deserialize()?,
            engine_version: deserializer.deserialize()?,
            cooker_version: deserializer.deserialize()?,
            thumbnail_table_offset: deserializer.deserialize()?,
        };
        Ok(summary)
    }
}

impl pkg_core::binary::Serialize for Summary {
    fn serialize(
        &self,
        serializer: &mut pkg_core::binary::Serializer<impl std::io::Write>,
    ) -> anyhow::Result<()> {
        self.magic.serialize(serializer)?;
        self.file_version.serialize(serializer)?;
        self.licensee_version.serialize(serializer)?;
        self.total_header_size.serialize(serializer)?;
        self.package_name.serialize(serializer)?;
        self.package_flags.serialize(serializer)?;
        self.name_count.serialize(serializer)?;
        self.name_offset.serialize(serializer)?;
        self.export_count.serialize(serializer)?;
        self.export_offset.serialize(serializer)?;
        self.import_count.serialize(serializer)?;
        self.import_offset.serialize(serializer)?;
        self.depends_offset.serialize(serializer)?;
        self.additional_packages_to_cook.serialize(serializer)?;
        self.texture_allocations.serialize(serializer)?;
        self.guid.serialize(serializer)?;
        self.generations.serialize(serializer)?;
        self.engine_version.serialize(serializer)?;
        self.cooker_version.serialize(serializer)?;
        self.thumbnail_table_offset.serialize(serializer)?;
        Ok(())
    }
}
