use crate::io::{ParseError, SerializeError};
use crate::store::StoreError;

/// Top-level error for library consumers that do not need to match on the
/// individual parse, serialize and store failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
