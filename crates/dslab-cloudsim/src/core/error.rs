//! Error types.

use thiserror::Error;

use crate::core::common::VmKey;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("no resources are reserved for vm {0}")]
    UnknownVm(VmKey),

    #[error("datacenter {0} has no processing elements")]
    NoProcessingElements(String),

    #[error("can't read topology file {path}: {source}")]
    TopologyIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed topology file, line {line}: {reason}")]
    TopologyParse { line: usize, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}
