//! Format-wide constants and the export configuration surface.
//!
//! `ARCHIVE_MAGIC` is the one constant every container must agree on to be
//! decodable at all; everything else a concrete deployment might want to
//! pin (engine/cooker/licensee version written during export) is carried
//! on [`ExportProfile`] rather than hardcoded, so this crate isn't tied to
//! one engine build.

pub const ARCHIVE_MAGIC: u32 = 0x9E2A_83C1;

/// Values the exporter stamps into the rewritten header (§4.H step 5).
/// A host application constructs one for the engine build it targets;
/// the core ships a placeholder default only so tests don't need to.
#[derive(Debug, Clone, Copy)]
pub struct ExportProfile {
    pub engine_version: u32,
    pub cooker_version: u32,
    pub licensee_version: u16,
}

impl Default for ExportProfile {
    fn default() -> Self {
        Self {
            engine_version: 0,
            cooker_version: 0,
            licensee_version: 0,
        }
    }
}
