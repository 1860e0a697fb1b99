//! # kvfs-consul
//!
//! Consul KV backend for kvfs.
//!
//! This crate maps the read-only filesystem operations of `kvfs-core` onto
//! the Consul KV HTTP API:
//! - a file read is `GET /v1/kv/<key>`
//! - a directory listing is `GET /v1/kv/<prefix>/?recurse`, collapsed to
//!   one level
//!
//! ## ConsulFs
//!
//! ```ignore
//! use kvfs_consul::ConsulFs;
//!
//! let fsys = ConsulFs::parse("consul://127.0.0.1:8500/app/")?
//!     .with_token("my-acl-token")?;
//!
//! // Read a key as a file
//! let name = fsys.read_file("name")?;
//!
//! // List a "directory" (every key below app/db/)
//! for entry in fsys.read_dir("db")? {
//!     println!("{} {}", entry.info().mode, entry.name());
//! }
//! ```
//!
//! ## ConsulClient
//!
//! The client implements [`kvfs_core::KvStore`] and can back any
//! [`kvfs_core::KvFs`] directly:
//!
//! ```ignore
//! use kvfs_consul::{ConsulClient, ConsulConfig};
//! use kvfs_core::KvFs;
//!
//! let client = ConsulClient::new(ConsulConfig::from_env())?;
//! let fsys = KvFs::new(url::Url::parse("consul:///app/")?, client)?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fs;
pub mod types;

pub use client::ConsulClient;
pub use config::{address_from_url, ConsulConfig, QueryOptions};
pub use error::Error;
pub use fs::ConsulFs;
pub use types::KvEntry;
