use thiserror::Error;

/// Boundary errors for the exporter (§4.H, §7). Anything surfaced by a
/// lower crate during the build/reindex/write phases is fatal to the
/// export in progress; only the filter phase (§4.H step 2-3) is allowed
/// to drop rows silently by design.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Linker(#[from] pkg_linker::Error),

    #[error(transparent)]
    Format(#[from] pkg_format::Error),

    #[error("exporter was asked to {action} before reaching the required phase (currently {phase:?})")]
    NotFinalized { phase: crate::exporter::Phase, action: &'static str },

    #[error("object {0:?} was not materialized before its body was serialized for export")]
    ObjectNotMaterialized(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
