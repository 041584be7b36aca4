use std::io;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpfsError {
    #[error("failed to spawn `{program}` for {op}: {source}")]
    Spawn {
        program: String,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("ipfs {op} exited with {status}: {stderr}")]
    Exit {
        op: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("ipfs {op} I/O error: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("ipfs add returned no content identifier")]
    MissingCid,

    #[error("invalid content identifier {0:?}")]
    InvalidCid(String),

    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("upload stream failed: {0}")]
    Input(String),
}

impl IpfsError {
    pub(crate) fn io(op: &'static str) -> impl FnOnce(io::Error) -> IpfsError {
        move |source| IpfsError::Io { op, source }
    }

    pub(crate) fn is_broken_pipe(&self) -> bool {
        matches!(self, IpfsError::Io { source, .. } if source.kind() == io::ErrorKind::BrokenPipe)
    }
}
