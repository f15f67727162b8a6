use crate::object::{Blob, Commit, Object, ObjectType, Tree};
use crate::odb::{LooseOdb, Odb};
use crate::{Error, Oid, RawObject, Result};
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GIT_DIR_NAME: &str = ".git";
const GIT_DIR_ENV: &str = "GIT_DIR";
const GITFILE_PREFIX: &[u8] = b"gitdir:";

/// A discovered database root together with its backing stores, in
/// priority order. The store list is fixed at open time except for
/// [`Repository::add_store`], which appends lower-priority backends.
pub struct Repository {
    root: PathBuf,
    stores: Vec<Box<dyn Odb>>,
}

impl Repository {
    /// Finds the database root that the reference implementation would
    /// use when run from `start`. With no starting path, the `GIT_DIR`
    /// environment variable names an explicit root (it must exist on
    /// disk), falling back to the current directory.
    ///
    /// Walks upward from the starting directory; at each level a
    /// `.git` child wins, otherwise a directory that is itself a valid
    /// bare layout. Candidates that turn out to be regular files must
    /// hold a `gitdir:` pointer and are followed, relative to the
    /// directory containing them, until a directory is reached.
    pub fn discover(start: Option<&Path>) -> Result<PathBuf> {
        let start = match start {
            Some(path) => std::path::absolute(path)?,
            None => match env::var_os(GIT_DIR_ENV).filter(|v| !v.is_empty()) {
                Some(dir) => {
                    let dir = PathBuf::from(dir);
                    if !dir.exists() {
                        return Err(Error::DbNotFound);
                    }
                    std::path::absolute(dir)?
                }
                None => env::current_dir()?,
            },
        };
        debug!(start = %start.display(), "discovering object database");

        let mut dir = start.as_path();
        loop {
            let dotgit = dir.join(GIT_DIR_NAME);
            if dotgit.exists() {
                return resolve_candidate(dotgit);
            }
            if is_valid_git_dir(dir) {
                return resolve_candidate(dir.to_path_buf());
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Err(Error::DbNotFound),
            }
        }
    }

    /// Opens a database rooted at `root`, mounting a loose store over
    /// its `objects` directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !is_valid_git_dir(root) {
            return Err(Error::DbNotFound);
        }
        let stores: Vec<Box<dyn Odb>> =
            vec![Box::new(LooseOdb::new(root.join("objects")))];
        Ok(Self {
            root: root.to_path_buf(),
            stores,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Appends a store consulted after every existing one. Writes keep
    /// targeting the primary store.
    pub fn add_store(&mut self, store: Box<dyn Odb>) {
        self.stores.push(store);
    }

    /// Routes a raw object to the decoder for its type tag. Tags
    /// without a structured decoder are reported as such so the caller
    /// can fall back to raw bytes.
    pub fn parse_object(&self, obj: RawObject) -> Result<Object<'_>> {
        match obj.kind() {
            ObjectType::Blob => Blob::parse(obj).map(Object::Blob),
            ObjectType::Tree => Tree::parse(self, obj).map(Object::Tree),
            ObjectType::Commit => Commit::parse(obj).map(Object::Commit),
            ObjectType::Tag | ObjectType::Unknown => Err(Error::NotImplemented),
        }
    }

    pub fn parse_blob(&self, obj: RawObject) -> Result<Blob> {
        Blob::parse(obj)
    }

    pub fn parse_tree(&self, obj: RawObject) -> Result<Tree<'_>> {
        Tree::parse(self, obj)
    }

    pub fn parse_commit(&self, obj: RawObject) -> Result<Commit> {
        Commit::parse(obj)
    }
}

// Meta-implementation over the backing stores.
impl Odb for Repository {
    fn get(&self, oid: &Oid) -> Result<RawObject> {
        for store in &self.stores {
            if let Ok(obj) = store.get(oid) {
                return Ok(obj);
            }
        }
        Err(Error::MissingObject)
    }

    fn put(&mut self, obj: RawObject) -> Result<Oid> {
        self.stores[0].put(obj)
    }

    fn scan(&self, visitor: &mut dyn FnMut(&Oid) -> Result<()>) -> Result<()> {
        for store in &self.stores {
            store.scan(visitor)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("stores", &self.stores.len())
            .finish()
    }
}

fn is_valid_git_dir(path: &Path) -> bool {
    path.is_dir()
        && path.join("refs").is_dir()
        && path.join("objects").is_dir()
        && path.join("HEAD").exists()
}

fn resolve_candidate(candidate: PathBuf) -> Result<PathBuf> {
    let mut path = candidate;
    let mut visited = HashSet::new();
    loop {
        if !visited.insert(path.clone()) {
            // an indirection cycle can never terminate
            return Err(Error::CorruptDb);
        }
        let meta = fs::metadata(&path).map_err(|_| Error::DbNotFound)?;
        if meta.is_file() {
            let content = fs::read(&path)?;
            if content.len() < GITFILE_PREFIX.len() || !content.starts_with(GITFILE_PREFIX) {
                return Err(Error::CorruptDb);
            }
            let target = std::str::from_utf8(&content[GITFILE_PREFIX.len()..])
                .map_err(|_| Error::CorruptDb)?
                .trim();
            let dir = path.parent().ok_or(Error::Format)?;
            path = normalize(&dir.join(target));
            debug!(path = %path.display(), "following gitdir indirection");
        } else if meta.is_dir() {
            return Ok(normalize(&std::path::absolute(&path)?));
        } else {
            return Err(Error::Format);
        }
    }
}

// Lexical cleanup only, no filesystem access: `.` is dropped and `..`
// consumes the accumulated prefix where one exists.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && out.as_os_str().is_empty() {
                    out.push(component.as_os_str());
                }
            }
            _ => out.push(component.as_os_str()),
        }
    }
    out
}
