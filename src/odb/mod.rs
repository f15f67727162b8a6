mod loose;
mod memory;

pub use loose::LooseOdb;
pub use memory::MemoryOdb;

use crate::{Oid, RawObject, Result};

/// A low-level interface to the object database. Chances are, you
/// won't have a need for it directly; [`crate::Repository`] implements
/// it too.
pub trait Odb {
    /// Fetches an object. Fails with [`crate::Error::MissingObject`]
    /// if the identifier is not stored.
    fn get(&self, oid: &Oid) -> Result<RawObject>;

    /// Stores an object and returns its content-derived identifier.
    /// Idempotent: writing byte-identical content of the same type
    /// yields the same identifier and never fails merely because the
    /// object already exists.
    fn put(&mut self, obj: RawObject) -> Result<Oid>;

    /// Calls the visitor once per stored object, in arbitrary order.
    /// The *only* errors this reports are errors from the visitor
    /// itself, which stop the scan immediately; internal errors while
    /// walking the store are silently skipped.
    fn scan(&self, visitor: &mut dyn FnMut(&Oid) -> Result<()>) -> Result<()>;
}
