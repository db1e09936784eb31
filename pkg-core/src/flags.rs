use bitflags::bitflags;

use crate::serializable_bitflags;

bitflags! {
    /// Object flags carried on name table entries and export rows,
    /// preserved verbatim across load and export (the core assigns no
    /// semantics to individual bits besides the handful the exporter must
    /// set per §4.H step 6).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u64 {
        const TRANSACTIONAL  = 0x0000_0001_0000_0000;
        const PUBLIC         = 0x0000_0004_0000_0000;
        const TRANSIENT      = 0x0000_4000_0000_0000;
        const STANDALONE     = 0x0000_8000_0000_0000;
        const NOT_FOR_CLIENT = 0x0001_0000_0000_0000;
        const NOT_FOR_SERVER = 0x0002_0000_0000_0000;
        const NOT_FOR_EDIT   = 0x0004_0000_0000_0000;
        /// The object carries an execution stack (only ever set on
        /// in-memory actor/state objects); the exporter re-propagates the
        /// live object's flags onto its export row when this bit is set,
        /// rather than trusting the static per-class rewrite (§4.H step 8).
        const HAS_STACK      = 0x0000_0000_0200_0000;

        /// Present on every name table entry.
        const NAME           = 0x0007_0010_0000_0000;
    }
}

serializable_bitflags!(ObjectFlags, u64);

bitflags! {
    /// Container-level (package) flags; `1` after export per §4.H step 5.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PackageFlags: u32 {
        const ALLOW_DOWNLOAD = 0x0000_0001;
        const CLIENT_OPTIONAL = 0x0000_0002;
        const SERVER_SIDE_ONLY = 0x0000_0004;
        const COOKED = 0x0000_0008;
    }
}

serializable_bitflags!(PackageFlags, u32);
