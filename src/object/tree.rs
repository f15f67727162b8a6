use super::RawObject;
use crate::odb::Odb;
use crate::repo::Repository;
use crate::{Error, Oid, Result, OID_LEN};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

/// A git file mode, kept as the raw octal value so that modes outside
/// the five known constants survive a decode/encode cycle opaquely.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Filemode(u32);

impl Filemode {
    pub const DIRECTORY: Self = Self(0o040000);
    pub const NORMAL: Self = Self(0o100644);
    pub const EXECUTABLE: Self = Self(0o100755);
    pub const SYMLINK: Self = Self(0o120000);
    pub const GITLINK: Self = Self(0o160000);

    pub fn from_octal(s: &str) -> Result<Self> {
        u32::from_str_radix(s, 8).map(Self).map_err(|_| Error::Format)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_directory(self) -> bool {
        self == Self::DIRECTORY
    }
}

impl fmt::Octal for Filemode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Octal::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: Filemode,
    pub oid: Oid,
}

impl TreeEntry {
    /// The name used for canonical ordering: directories compare as if
    /// their name carried a trailing slash.
    fn sort_key(&self) -> Cow<'_, str> {
        if self.mode.is_directory() {
            Cow::Owned(format!("{}/", self.name))
        } else {
            Cow::Borrowed(self.name.as_str())
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(format!("{:o} {}", self.mode, self.name).as_bytes());
        out.push(0);
        out.extend_from_slice(self.oid.as_bytes());
    }
}

/// A name-keyed list of entries. The attached repository is only used
/// to resolve entries on demand; nothing is dereferenced eagerly.
pub struct Tree<'r> {
    repo: &'r Repository,
    entries: HashMap<String, TreeEntry>,
}

impl<'r> Tree<'r> {
    /// Decodes the binary entry stream: for each record an ASCII-octal
    /// mode ended by a space, a name ended by a NUL, then 20 raw hash
    /// bytes. A duplicate name keeps the later record.
    pub(crate) fn parse(repo: &'r Repository, mut obj: RawObject) -> Result<Self> {
        let mut content = Vec::new();
        obj.read_to_end(&mut content)?;

        let mut entries = HashMap::new();
        let mut rest = content.as_slice();
        while !rest.is_empty() {
            let sp = rest.iter().position(|&b| b == b' ').ok_or(Error::Format)?;
            let mode = std::str::from_utf8(&rest[..sp]).map_err(|_| Error::Format)?;
            let mode = Filemode::from_octal(mode)?;
            rest = &rest[sp + 1..];

            let nul = rest.iter().position(|&b| b == 0).ok_or(Error::Format)?;
            let name =
                String::from_utf8(rest[..nul].to_vec()).map_err(|_| Error::Format)?;
            rest = &rest[nul + 1..];

            if rest.len() < OID_LEN {
                return Err(Error::Format);
            }
            let oid = Oid::try_from(&rest[..OID_LEN])?;
            rest = &rest[OID_LEN..];

            entries.insert(name.clone(), TreeEntry { name, mode, oid });
        }

        Ok(Self { repo, entries })
    }

    pub fn entry(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetches the object an entry points at through the attached
    /// repository. An unknown name reads as a missing object.
    pub fn entry_object(&self, name: &str) -> Result<RawObject> {
        let entry = self.entry(name).ok_or(Error::MissingObject)?;
        self.repo.get(&entry.oid)
    }

    /// Entries in canonical order.
    pub fn sorted_entries(&self) -> Vec<&TreeEntry> {
        let mut entries: Vec<&TreeEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        entries
    }

    /// The canonical binary form; the inverse of [`Tree::parse`].
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in self.sorted_entries() {
            entry.encode_into(&mut out);
        }
        out
    }

    /// Writes one display line per entry, in canonical order.
    pub fn dump(&self, w: &mut dyn Write) -> Result<()> {
        for entry in self.sorted_entries() {
            writeln!(w, "{} {:6o} {}", entry.oid, entry.mode, entry.name)?;
        }
        Ok(())
    }
}

impl PartialEq for Tree<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for Tree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectType;
    use std::fs;
    use tempfile::TempDir;

    fn git_dir(tmp: &TempDir) -> std::path::PathBuf {
        let root = tmp.path().join(".git");
        fs::create_dir_all(root.join("refs")).unwrap();
        fs::create_dir_all(root.join("objects")).unwrap();
        fs::write(root.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        root
    }

    fn record(mode: &str, name: &str, hash_byte: u8) -> Vec<u8> {
        let mut rec = format!("{mode} {name}\0").into_bytes();
        rec.extend_from_slice(&[hash_byte; OID_LEN]);
        rec
    }

    #[test]
    fn it_parses_an_entry_stream() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::open(git_dir(&tmp)).unwrap();

        let mut payload = record("100644", "file1", b'1');
        payload.extend(record("40000", "dir1", b'9'));
        let obj = RawObject::from_bytes(ObjectType::Tree, payload);

        let tree = Tree::parse(&repo, obj).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree.entry("file1"),
            Some(&TreeEntry {
                name: "file1".into(),
                mode: Filemode::NORMAL,
                oid: Oid::from([b'1'; OID_LEN]),
            })
        );
        assert_eq!(tree.entry("dir1").unwrap().mode, Filemode::DIRECTORY);
    }

    #[test]
    fn it_keeps_the_last_record_on_duplicate_names() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::open(git_dir(&tmp)).unwrap();

        let mut payload = record("100644", "file1", b'1');
        payload.extend(record("100755", "file1", b'2'));
        let obj = RawObject::from_bytes(ObjectType::Tree, payload);

        let tree = Tree::parse(&repo, obj).unwrap();
        assert_eq!(tree.len(), 1);
        let entry = tree.entry("file1").unwrap();
        assert_eq!(entry.mode, Filemode::EXECUTABLE);
        assert_eq!(entry.oid, Oid::from([b'2'; OID_LEN]));
    }

    #[test]
    fn it_preserves_unrecognized_modes() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::open(git_dir(&tmp)).unwrap();

        let obj = RawObject::from_bytes(ObjectType::Tree, record("123456", "odd", b'3'));
        let tree = Tree::parse(&repo, obj).unwrap();
        assert_eq!(tree.entry("odd").unwrap().mode.raw(), 0o123456);

        let reparsed = Tree::parse(
            &repo,
            RawObject::from_bytes(ObjectType::Tree, tree.encode()),
        )
        .unwrap();
        assert_eq!(reparsed, tree);
    }

    #[test]
    fn it_rejects_truncated_records() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::open(git_dir(&tmp)).unwrap();

        // missing separators
        for payload in [&b"100644"[..], b"100644 file1", b"100644 file1\x00short"] {
            let obj = RawObject::from_bytes(ObjectType::Tree, payload.to_vec());
            assert!(matches!(Tree::parse(&repo, obj), Err(Error::Format)));
        }

        // non-octal mode
        let obj = RawObject::from_bytes(ObjectType::Tree, record("10064x", "f", b'1'));
        assert!(matches!(Tree::parse(&repo, obj), Err(Error::Format)));
    }

    #[test]
    fn it_sorts_directories_as_if_slash_terminated() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::open(git_dir(&tmp)).unwrap();

        let mut payload = record("100644", "b", b'1');
        payload.extend(record("40000", "a", b'2'));
        payload.extend(record("100644", "a.txt", b'3'));
        let obj = RawObject::from_bytes(ObjectType::Tree, payload);
        let tree = Tree::parse(&repo, obj).unwrap();

        // "a.txt" < "a/" < "b" byte-wise ('.' is 0x2e, '/' is 0x2f)
        let names: Vec<&str> = tree
            .sorted_entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["a.txt", "a", "b"]);
    }

    #[test]
    fn it_round_trips_through_the_binary_encoding() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::open(git_dir(&tmp)).unwrap();

        let mut payload = record("40000", "src", b'4');
        payload.extend(record("100644", "README", b'5'));
        payload.extend(record("120000", "link", b'6'));
        let obj = RawObject::from_bytes(ObjectType::Tree, payload);
        let tree = Tree::parse(&repo, obj).unwrap();

        let encoded = tree.encode();
        let reparsed =
            Tree::parse(&repo, RawObject::from_bytes(ObjectType::Tree, encoded)).unwrap();
        assert_eq!(reparsed, tree);
    }

    #[test]
    fn it_dumps_entries_with_padded_octal_modes() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::open(git_dir(&tmp)).unwrap();

        let mut payload = record("40000", "dir1", b'9');
        payload.extend(record("100644", "file1", b'1'));
        let obj = RawObject::from_bytes(ObjectType::Tree, payload);
        let tree = Tree::parse(&repo, obj).unwrap();

        let mut out = Vec::new();
        tree.dump(&mut out).unwrap();
        let oid_f = Oid::from([b'1'; OID_LEN]);
        let oid_d = Oid::from([b'9'; OID_LEN]);
        let expected = format!("{oid_d}  40000 dir1\n{oid_f} 100644 file1\n");
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }
}
