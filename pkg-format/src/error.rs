use thiserror::Error;

/// Errors from decoding a container's structural parts (header, name,
/// import and export tables). Per-object body data is never validated
/// here — only the reference graph is this core's concern.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed container header: {0}")]
    MalformedHeader(String),

    #[error("truncated {table} table (expected {expected} rows, stream ended early)")]
    TruncatedTable { table: &'static str, expected: u32 },

    #[error("name id {0} is out of bounds of the name table")]
    BadNameReference(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
