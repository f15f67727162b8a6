mod error;
mod object;
mod odb;
mod oid;
mod repo;

pub use error::Error;
pub use object::{Blob, Commit, Filemode, Object, ObjectType, RawObject, Signature, Tree, TreeEntry};
pub use odb::{LooseOdb, MemoryOdb, Odb};
pub use oid::{Oid, OID_LEN};
pub use repo::Repository;

pub type Result<T> = std::result::Result<T, Error>;
