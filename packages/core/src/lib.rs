//! kvfs core: a read-only filesystem view over flat key-value stores.
//!
//! Stores such as Consul KV address values by `/`-separated keys but have
//! no directories. This layer reconstructs them:
//! - `Location`: a base URL plus a validated relative path, naming a key
//! - `collapse`: folds deep keys into one level of children
//! - `KvFs`: `open`/`stat`/`read_file`/`read_dir` over any `KvStore`
//! - `Handle`: a `FileHandle` (buffered value, `std::io::Read`) or a
//!   `DirHandle` (paginated `read_dir` over a one-time listing)
//!
//! # Example
//!
//! ```rust
//! use kvfs_core::{KvFs, MemoryStore, ErrorKind};
//! use url::Url;
//!
//! let store = MemoryStore::new()
//!     .with_entry("app/name", "kvfs")
//!     .with_entry("app/db/host", "localhost")
//!     .with_entry("app/db/port", "5432");
//! let fsys = KvFs::new(Url::parse("mem:///app/").unwrap(), store).unwrap();
//!
//! let mut dir = fsys.open(".").unwrap().into_dir().unwrap();
//! let page = dir.read_dir(1).unwrap();
//! assert_eq!(page[0].name(), "db");
//! assert!(page[0].is_dir());
//!
//! let err = fsys.stat("missing").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::NotExist);
//! ```

pub use bytes::Bytes;
pub use url::Url;

mod collapse;
mod context;
mod error;
mod fs;
pub mod handle;
pub mod listing;
mod memory;
pub mod path;
mod stat;
mod store;

pub use collapse::collapse;
pub use context::Context;
pub use error::{Error, ErrorKind, StoreError};
pub use fs::KvFs;
pub use handle::{DirHandle, DirState, FileHandle, Handle, ReadDirPage};
pub use listing::DirEntry;
pub use memory::MemoryStore;
pub use path::{Location, PathError};
pub use stat::{FileInfo, FileMode};
pub use store::{KvPair, KvStore};
