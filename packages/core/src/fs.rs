//! The filesystem view.

use std::sync::Arc;

use bytes::Bytes;
use url::Url;

use crate::handle::{DirHandle, FileHandle, Handle};
use crate::listing::DirEntry;
use crate::path::base_name;
use crate::{Context, Error, FileInfo, KvStore, Location};

/// A read-only, hierarchical view over a flat key-value store.
///
/// Paths are relative to a base URL whose path is the key prefix of the
/// view's root. `KvFs` is an immutable value: `with_*` methods return a new
/// view and leave the original untouched.
///
/// # Example
///
/// ```rust
/// use kvfs_core::{KvFs, MemoryStore};
/// use url::Url;
///
/// let store = MemoryStore::new()
///     .with_entry("dir/foo", "foo")
///     .with_entry("dir/sub/bar", "bar");
/// let fsys = KvFs::new(Url::parse("mem:///dir/").unwrap(), store).unwrap();
///
/// let names: Vec<String> = fsys
///     .read_dir(".")
///     .unwrap()
///     .iter()
///     .map(|e| e.name().to_string())
///     .collect();
/// assert_eq!(names, vec!["foo", "sub"]);
/// assert!(fsys.stat("sub").unwrap().is_dir);
/// ```
#[derive(Clone)]
pub struct KvFs {
    base: Location,
    store: Arc<dyn KvStore>,
    ctx: Context,
}

impl KvFs {
    /// Create a view rooted at `base`, which must name a directory.
    pub fn new<S: KvStore + 'static>(base: Url, store: S) -> Result<Self, Error> {
        Self::with_shared_store(base, Arc::new(store))
    }

    /// Create a view over a store that is already shared.
    pub fn with_shared_store(base: Url, store: Arc<dyn KvStore>) -> Result<Self, Error> {
        let display = base.to_string();
        let base = Location::base(base).map_err(|e| Error::invalid_path("new", display, e))?;
        Ok(Self {
            base,
            store,
            ctx: Context::background(),
        })
    }

    pub fn base(&self) -> &Location {
        &self.base
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// A copy of this view that issues its requests under `ctx`.
    #[must_use]
    pub fn with_context(&self, ctx: Context) -> Self {
        Self {
            base: self.base.clone(),
            store: Arc::clone(&self.store),
            ctx,
        }
    }

    /// A copy of this view backed by a different store.
    #[must_use]
    pub fn with_store<S: KvStore + 'static>(&self, store: S) -> Self {
        Self {
            base: self.base.clone(),
            store: Arc::new(store),
            ctx: self.ctx.clone(),
        }
    }

    /// Open `path`.
    ///
    /// `"."` and paths ending in `/` open a directory; its listing is
    /// fetched by the first `read_dir`. Any other path opens a file and
    /// fetches its value now; an absent key does not fail `open` but is
    /// reported by the handle's `stat` and `read`.
    pub fn open(&self, path: &str) -> Result<Handle, Error> {
        let location = self.resolve("open", path)?;
        if location.is_dir() {
            log::debug!("open dir '{}' at {}", path, location);
            return Ok(Handle::Dir(DirHandle::new(
                Arc::clone(&self.store),
                self.ctx.clone(),
                location,
                path,
            )));
        }

        log::debug!("open file '{}' at {}", path, location);
        Ok(Handle::File(FileHandle::fetch(
            self.store.as_ref(),
            &self.ctx,
            &location,
            path,
        )))
    }

    /// Open `path` as a directory, adding the directory marker if missing.
    pub fn open_dir(&self, path: &str) -> Result<DirHandle, Error> {
        let location = self.resolve("open", path)?.as_dir();
        Ok(DirHandle::new(
            Arc::clone(&self.store),
            self.ctx.clone(),
            location,
            path,
        ))
    }

    /// Metadata for `path`.
    ///
    /// A path without a trailing `/` is first looked up directly: an
    /// existing key is a file. Otherwise, and for paths ending in `/`, the
    /// keys directly under `path/` are checked: any key there, the
    /// directory marker `path/` included, makes it a directory. Values of
    /// the subtree are never fetched.
    pub fn stat(&self, path: &str) -> Result<FileInfo, Error> {
        let location = self.resolve("stat", path)?;
        let name = base_name(path);
        if path == "." {
            return Ok(FileInfo::dir(name));
        }

        if !location.is_dir() {
            let found = self
                .store
                .get(&self.ctx, &location)
                .map_err(|e| Error::from_store("stat", path, e))?;
            if let Some(pair) = found {
                return Ok(FileInfo::file(name, pair.value.len() as u64));
            }
        }

        let keys = self
            .store
            .keys(&self.ctx, &location.as_dir())
            .map_err(|e| Error::from_store("stat", path, e))?;
        if keys.is_empty() {
            log::debug!("stat '{}': no key at or under {}", path, location);
            return Err(Error::not_exist("stat", path));
        }
        Ok(FileInfo::dir(name))
    }

    /// The whole value of the file at `path`.
    pub fn read_file(&self, path: &str) -> Result<Bytes, Error> {
        self.open(path)?.into_file()?.into_bytes()
    }

    /// Every entry of the directory at `path`, sorted by name.
    ///
    /// `path` is treated as a directory whether or not it ends in `/`.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, Error> {
        let mut dir = self.open_dir(path)?;
        let entries = dir.read_dir(-1)?.into_entries();
        dir.close()?;
        Ok(entries)
    }

    /// A view rooted at the directory `dir` of this one.
    pub fn sub(&self, dir: &str) -> Result<Self, Error> {
        let location = self.resolve("sub", dir)?.as_dir();
        Ok(Self {
            base: location,
            store: Arc::clone(&self.store),
            ctx: self.ctx.clone(),
        })
    }

    fn resolve(&self, op: &'static str, path: &str) -> Result<Location, Error> {
        self.base
            .join(path)
            .map_err(|e| Error::invalid_path(op, path, e))
    }
}

impl std::fmt::Debug for KvFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvFs")
            .field("base", &self.base)
            .field("ctx", &self.ctx)
            .finish()
    }
}
