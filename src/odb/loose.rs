use super::Odb;
use crate::object::{object_header, ObjectType};
use crate::{Error, Oid, RawObject, Result};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use sha1::{Digest, Sha1};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// An object database of loose files, e.g. a `.git/objects` directory.
/// Objects live at `root/XX/Y…Y` where `XX` is the first hash byte in
/// hex and the file name is the remaining 38 hex characters, each file
/// a zlib stream of `"<type> <length>\0"` followed by the payload.
///
/// After opening, `get` maps a missing file to a missing object and a
/// garbled header to a corrupt database, while `scan` swallows every
/// internal error it meets and only ever fails on behalf of its
/// visitor.
#[derive(Debug, Clone)]
pub struct LooseOdb {
    root: PathBuf,
}

impl LooseOdb {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, oid: &Oid) -> PathBuf {
        let hex = oid.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }
}

impl Odb for LooseOdb {
    fn get(&self, oid: &Oid) -> Result<RawObject> {
        let path = self.object_path(oid);
        let f = match File::open(&path) {
            Ok(f) => f,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::MissingObject);
            }
            Err(err) => return Err(err.into()),
        };

        let mut reader = BufReader::new(ZlibDecoder::new(f));
        let mut header = Vec::new();
        reader.read_until(0, &mut header)?;
        if header.pop() != Some(0) {
            return Err(Error::CorruptDb);
        }

        let header = std::str::from_utf8(&header).map_err(|_| Error::CorruptDb)?;
        let fields: Vec<&str> = header.split(' ').collect();
        if fields.len() != 2 {
            return Err(Error::CorruptDb);
        }
        let kind = ObjectType::from_label(fields[0]);
        let size: u64 = fields[1].parse().map_err(|_| Error::CorruptDb)?;

        trace!(oid = %oid, ?kind, size, "read loose object");
        Ok(RawObject::with_size(kind, size, reader.take(size)))
    }

    fn put(&mut self, mut obj: RawObject) -> Result<Oid> {
        let size = match obj.size() {
            Some(size) => size,
            None => obj.buffer()?,
        };

        // Everything goes through a temp file in the store root; the
        // rename below is the only point at which the object becomes
        // visible, and dropping the temp file removes it on any
        // earlier exit.
        let tmp = NamedTempFile::new_in(&self.root)?;
        let mut encoder = ZlibEncoder::new(tmp, Compression::default());
        let mut hasher = Sha1::new();

        let header = object_header(obj.kind(), size);
        hasher.update(header.as_bytes());
        encoder.write_all(header.as_bytes())?;

        let mut remaining = size;
        let mut buf = [0u8; 8192];
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let n = obj.read(&mut buf[..want])?;
            if n == 0 {
                // source ran dry before the declared length
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
            hasher.update(&buf[..n]);
            encoder.write_all(&buf[..n])?;
            remaining -= n as u64;
        }

        let tmp = encoder.finish()?;
        let raw: [u8; 20] = hasher.finalize().into();
        let oid = Oid::from(raw);

        let hex = oid.to_hex();
        let shard = self.root.join(&hex[..2]);
        fs::create_dir_all(&shard)?;
        tmp.persist(shard.join(&hex[2..]))
            .map_err(|err| Error::Io(err.error))?;

        debug!(oid = %oid, size, "stored loose object");
        Ok(oid)
    }

    fn scan(&self, visitor: &mut dyn FnMut(&Oid) -> Result<()>) -> Result<()> {
        let Ok(shards) = fs::read_dir(&self.root) else {
            return Ok(());
        };
        for shard in shards.flatten() {
            if !shard.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let shard_name = shard.file_name();
            let Some(shard_name) = shard_name.to_str() else {
                continue;
            };
            if shard_name.len() != 2 {
                continue;
            }
            let Ok(first) = hex::decode(shard_name) else {
                continue;
            };

            let Ok(files) = fs::read_dir(shard.path()) else {
                continue;
            };
            for file in files.flatten() {
                if file.file_type().is_ok_and(|t| t.is_dir()) {
                    continue;
                }
                let file_name = file.file_name();
                let Some(file_name) = file_name.to_str() else {
                    continue;
                };
                if file_name.len() != 38 {
                    continue;
                }
                let Ok(rest) = hex::decode(file_name) else {
                    continue;
                };

                let mut raw = [0u8; 20];
                raw[0] = first[0];
                raw[1..].copy_from_slice(&rest);
                visitor(&Oid::from(raw))?;
            }
        }
        Ok(())
    }
}
