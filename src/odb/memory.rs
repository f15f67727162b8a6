use super::Odb;
use crate::object::{object_header, ObjectType};
use crate::{Error, Oid, RawObject, Result};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::io::Read;

/// An in-memory object database, for tests and composition. Hashes the
/// same header-plus-content bytes as the loose store, so identifiers
/// are stable across backends.
#[derive(Debug, Default)]
pub struct MemoryOdb {
    objects: HashMap<Oid, (ObjectType, Bytes)>,
}

impl MemoryOdb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Odb for MemoryOdb {
    fn get(&self, oid: &Oid) -> Result<RawObject> {
        let (kind, content) = self.objects.get(oid).ok_or(Error::MissingObject)?;
        Ok(RawObject::from_bytes(*kind, content.clone()))
    }

    fn put(&mut self, mut obj: RawObject) -> Result<Oid> {
        let mut content = Vec::new();
        obj.read_to_end(&mut content)?;

        let mut hasher = Sha1::new();
        hasher.update(object_header(obj.kind(), content.len() as u64).as_bytes());
        hasher.update(&content);
        let raw: [u8; 20] = hasher.finalize().into();
        let oid = Oid::from(raw);

        self.objects.insert(oid, (obj.kind(), Bytes::from(content)));
        Ok(oid)
    }

    fn scan(&self, visitor: &mut dyn FnMut(&Oid) -> Result<()>) -> Result<()> {
        for oid in self.objects.keys() {
            visitor(oid)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_hashes_like_the_loose_store() {
        let mut odb = MemoryOdb::new();
        let oid = odb
            .put(RawObject::from_bytes(ObjectType::Blob, b"hello world".to_vec()))
            .unwrap();
        // the well-known id of `blob 11\0hello world`
        assert_eq!(oid.to_hex(), "95d09f2b10159347eece71399a7e2e907ea3df4f");
    }

    #[test]
    fn it_gets_back_what_was_put() {
        let mut odb = MemoryOdb::new();
        let oid = odb
            .put(RawObject::from_bytes(ObjectType::Tree, b"payload".to_vec()))
            .unwrap();

        let mut obj = odb.get(&oid).unwrap();
        assert_eq!(obj.kind(), ObjectType::Tree);
        assert_eq!(obj.size(), Some(7));
        let mut content = Vec::new();
        obj.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"payload");
    }

    #[test]
    fn it_reports_missing_objects() {
        let odb = MemoryOdb::new();
        assert!(matches!(
            odb.get(&Oid::from([9; 20])),
            Err(Error::MissingObject)
        ));
    }

    #[test]
    fn it_scans_and_stops_on_visitor_errors() {
        let mut odb = MemoryOdb::new();
        for content in [&b"one"[..], b"two", b"three"] {
            odb.put(RawObject::from_bytes(ObjectType::Blob, content.to_vec()))
                .unwrap();
        }

        let mut count = 0;
        odb.scan(&mut |_| {
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 3);

        let mut count = 0;
        let result = odb.scan(&mut |_| {
            count += 1;
            Err(Error::Format)
        });
        assert!(matches!(result, Err(Error::Format)));
        assert_eq!(count, 1);
    }
}
