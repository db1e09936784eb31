use thiserror::Error;

/// Boundary errors for the resolver/loader layer. A `Format`/`Graph`
/// error from a lower crate is fatal to the enclosing load, same as
/// every variant declared directly here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("container {0:?} could not be resolved")]
    UnresolvedContainer(String),

    #[error("import {0:?} has no matching export, import, or native class in its target container")]
    UnresolvedImport(String),

    #[error("object {0:?} was not materialized before use")]
    ObjectNotMaterialized(String),

    #[error(transparent)]
    Format(#[from] pkg_format::Error),

    #[error(transparent)]
    Graph(#[from] pkg_graph::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
