use std::io;
use thiserror::Error as ThisError;

/// Everything that can go wrong in the object database. The taxonomy is
/// closed; none of these are retried from inside the crate.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Malformed structured content: a bad identifier string, a bad
    /// tree or commit grammar, a bad signature.
    #[error("format error")]
    Format,

    /// A stored object's own framing is internally inconsistent.
    #[error("corrupt object database")]
    CorruptDb,

    /// The requested identifier is not present in any consulted store.
    #[error("missing object")]
    MissingObject,

    /// Discovery or open could not locate a valid database root.
    #[error("no object database found")]
    DbNotFound,

    /// A recognized object type with no structured decoder wired up.
    #[error("not implemented")]
    NotImplemented,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
