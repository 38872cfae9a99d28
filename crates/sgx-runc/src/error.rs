//! Error types used by the runtime wrapper.

use std::path::PathBuf;

use oci_spec::OciSpecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed command line
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Opening, reading or writing a file failed
    #[error("{0}")]
    Stdio(#[from] std::io::Error),
    /// Requested item is not found
    #[error("not found: {0}")]
    NotFound(String),
    /// The spec document is not valid JSON for a runtime spec
    #[error("decode OCI spec: {0}")]
    Decode(#[source] serde_json::Error),
    /// The spec could not be serialized back
    #[error("encode OCI spec: {0}")]
    Encode(#[source] serde_json::Error),
    /// An error occurred while building an OCI spec entry
    #[error("{0}")]
    Oci(#[from] OciSpecError),
    /// A host device node could not be described
    #[error("resolve device {}: {reason}", path.display())]
    DeviceResolution { path: PathBuf, reason: String },
}

pub type Result<T, E = Error> = ::std::result::Result<T, E>;
