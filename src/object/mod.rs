mod blob;
mod commit;
mod tree;

pub use blob::Blob;
pub use commit::{Commit, Signature};
pub use tree::{Filemode, Tree, TreeEntry};

use crate::Result;
use bytes::Bytes;
use std::fmt;
use std::io::{self, Cursor, Read, Write};

/// The closed set of object kinds. `Unknown` is what an unrecognized
/// type label decodes to; it is a legal value until something tries to
/// interpret the object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ObjectType {
    #[default]
    Unknown,
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    pub fn from_label(label: &str) -> Self {
        match label {
            "blob" => Self::Blob,
            "tree" => Self::Tree,
            "commit" => Self::Commit,
            "tag" => Self::Tag,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
            Self::Unknown => "unkn",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The storage header hashed and framed in front of every object:
/// `"<type-label> <decimal-length>\0"`.
pub(crate) fn object_header(kind: ObjectType, size: u64) -> String {
    format!("{kind} {size}\0")
}

/// A byte sequence of a known-or-unknown length tagged with a type.
///
/// A consumer that needs a definite length calls [`RawObject::buffer`],
/// which materializes the stream into memory exactly once; after that
/// the object reports a definite size and reads from the in-memory
/// copy. It is never buffered twice.
pub struct RawObject {
    kind: ObjectType,
    body: Body,
}

enum Body {
    Sized { size: u64, reader: Box<dyn Read> },
    Unsized { reader: Box<dyn Read> },
}

impl RawObject {
    /// An object whose length will only be known after buffering.
    pub fn new(kind: ObjectType, reader: impl Read + 'static) -> Self {
        Self {
            kind,
            body: Body::Unsized {
                reader: Box::new(reader),
            },
        }
    }

    /// An object with a declared length. The reader is trusted to yield
    /// at least `size` bytes; stores copy exactly that many.
    pub fn with_size(kind: ObjectType, size: u64, reader: impl Read + 'static) -> Self {
        Self {
            kind,
            body: Body::Sized {
                size,
                reader: Box::new(reader),
            },
        }
    }

    /// An object backed by an in-memory payload.
    pub fn from_bytes(kind: ObjectType, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        let size = content.len() as u64;
        Self::with_size(kind, size, Cursor::new(content))
    }

    pub fn kind(&self) -> ObjectType {
        self.kind
    }

    /// The declared length in bytes, or `None` if unknown.
    pub fn size(&self) -> Option<u64> {
        match self.body {
            Body::Sized { size, .. } => Some(size),
            Body::Unsized { .. } => None,
        }
    }

    /// Fully buffers an unknown-length body to learn its size. A no-op
    /// on an already sized object. Returns the definite size.
    pub fn buffer(&mut self) -> Result<u64> {
        if let Body::Unsized { ref mut reader } = self.body {
            let mut content = Vec::new();
            reader.read_to_end(&mut content)?;
            let size = content.len() as u64;
            self.body = Body::Sized {
                size,
                reader: Box::new(Cursor::new(Bytes::from(content))),
            };
        }
        match self.body {
            Body::Sized { size, .. } => Ok(size),
            Body::Unsized { .. } => unreachable!(),
        }
    }
}

impl Read for RawObject {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.body {
            Body::Sized { ref mut reader, .. } => reader.read(buf),
            Body::Unsized { ref mut reader } => reader.read(buf),
        }
    }
}

/// A structured object, produced by [`crate::Repository::parse_object`].
pub enum Object<'r> {
    Blob(Blob),
    Tree(Tree<'r>),
    Commit(Commit),
}

impl Object<'_> {
    pub fn kind(&self) -> ObjectType {
        match self {
            Self::Blob(_) => ObjectType::Blob,
            Self::Tree(_) => ObjectType::Tree,
            Self::Commit(_) => ObjectType::Commit,
        }
    }

    /// Writes the human-readable rendering of the object.
    pub fn dump(&self, w: &mut dyn Write) -> Result<()> {
        match self {
            Self::Blob(blob) => blob.dump(w),
            Self::Tree(tree) => tree.dump(w),
            Self::Commit(commit) => commit.dump(w),
        }
    }
}
