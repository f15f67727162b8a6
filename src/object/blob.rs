use super::RawObject;
use crate::Result;
use bytes::Bytes;
use std::io::{Read, Write};

/// An opaque byte payload with no internal structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob(Bytes);

impl Blob {
    pub(crate) fn parse(mut obj: RawObject) -> Result<Self> {
        let mut content = Vec::new();
        obj.read_to_end(&mut content)?;
        Ok(Self(Bytes::from(content)))
    }

    pub fn content(&self) -> &[u8] {
        &self.0
    }

    pub fn dump(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(&self.0)?;
        Ok(())
    }
}

impl From<Bytes> for Blob {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectType;

    #[test]
    fn it_passes_content_through_unchanged() {
        let obj = RawObject::from_bytes(ObjectType::Blob, Bytes::from_static(b"hello\0world"));
        let blob = Blob::parse(obj).unwrap();
        assert_eq!(blob.content(), b"hello\0world");
    }

    #[test]
    fn it_dumps_content_verbatim() {
        let blob = Blob::from(Bytes::from_static(b"hello"));
        let mut out = Vec::new();
        blob.dump(&mut out).unwrap();
        assert_eq!(out, b"hello");
    }
}
