//! Open file and directory handles.
//!
//! Handles are owned by the caller that opened them and are not shared, so
//! they hold their state directly without locks.

use std::io;
use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;

use crate::listing::{self, DirEntry};
use crate::path::base_name;
use crate::{Context, Error, FileInfo, KvStore, Location};

/// An open handle: either a file or a directory.
pub enum Handle {
    File(FileHandle),
    Dir(DirHandle),
}

impl Handle {
    /// The path the handle was opened with.
    pub fn path(&self) -> &str {
        match self {
            Handle::File(f) => f.path(),
            Handle::Dir(d) => d.path(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Dir(_))
    }

    pub fn stat(&self) -> Result<FileInfo, Error> {
        match self {
            Handle::File(f) => f.stat(),
            Handle::Dir(d) => d.stat(),
        }
    }

    /// Close the handle. A second call fails with [`Error::AlreadyClosed`].
    pub fn close(&mut self) -> Result<(), Error> {
        match self {
            Handle::File(f) => f.close(),
            Handle::Dir(d) => d.close(),
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileHandle> {
        match self {
            Handle::File(f) => Some(f),
            Handle::Dir(_) => None,
        }
    }

    pub fn as_dir_mut(&mut self) -> Option<&mut DirHandle> {
        match self {
            Handle::Dir(d) => Some(d),
            Handle::File(_) => None,
        }
    }

    /// The file handle, or [`Error::IsADirectory`].
    pub fn into_file(self) -> Result<FileHandle, Error> {
        match self {
            Handle::File(f) => Ok(f),
            Handle::Dir(d) => Err(Error::IsADirectory {
                op: "read",
                path: d.path,
            }),
        }
    }

    /// The directory handle, or [`Error::NotADirectory`].
    pub fn into_dir(self) -> Result<DirHandle, Error> {
        match self {
            Handle::Dir(d) => Ok(d),
            Handle::File(f) => Err(Error::NotADirectory {
                op: "readdir",
                path: f.path,
            }),
        }
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::File(file) => f.debug_tuple("File").field(file).finish(),
            Handle::Dir(dir) => f.debug_tuple("Dir").field(dir).finish(),
        }
    }
}

/// A file whose value was fetched when it was opened.
///
/// If the fetch failed (typically because the key is absent) the handle is
/// still returned, and the failure is reported by `stat` and `read`.
#[derive(Debug)]
pub struct FileHandle {
    path: String,
    content: Result<Bytes, Error>,
    cursor: usize,
    closed: bool,
}

impl FileHandle {
    /// Fetch `at` and wrap the outcome in a handle.
    pub(crate) fn fetch<S: KvStore + ?Sized>(
        store: &S,
        ctx: &Context,
        at: &Location,
        path: &str,
    ) -> Self {
        let content = match store.get(ctx, at) {
            Ok(Some(pair)) => {
                log::debug!("fetched '{}' ({} bytes)", pair.key, pair.value.len());
                Ok(pair.value)
            }
            Ok(None) => {
                log::debug!("key '{}' not found", at.key());
                Err(Error::not_exist("open", path))
            }
            Err(e) => Err(Error::from_store("open", path, e)),
        };

        Self {
            path: path.to_string(),
            content,
            cursor: 0,
            closed: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stat(&self) -> Result<FileInfo, Error> {
        match &self.content {
            Ok(content) => Ok(FileInfo::file(base_name(&self.path), content.len() as u64)),
            Err(e) => Err(e.replay("stat")),
        }
    }

    /// Read from the current offset into `buf`; `Ok(0)` at the end.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.closed {
            return Err(Error::already_closed("read", &self.path));
        }
        let content = self.content.as_ref().map_err(|e| e.replay("read"))?;

        let remaining = &content[self.cursor.min(content.len())..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.cursor += count;
        Ok(count)
    }

    /// The whole buffered value, regardless of the read offset.
    pub fn into_bytes(self) -> Result<Bytes, Error> {
        if self.closed {
            return Err(Error::already_closed("read", self.path));
        }
        self.content.map_err(|e| e.replay("read"))
    }

    pub fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::already_closed("close", &self.path));
        }
        self.closed = true;
        Ok(())
    }
}

impl io::Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf).map_err(io::Error::from)
    }
}

/// Where a [`DirHandle`] is in its listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirState {
    /// The listing has not been fetched yet.
    Fresh,
    /// Entries remain after the cursor.
    Reading,
    /// The cursor is at the end of the listing.
    Exhausted,
}

/// One batch of entries returned by [`DirHandle::read_dir`].
///
/// `end` is set when the call asked for more entries than remained: the
/// listing ran out inside this page, which is the same condition that a
/// later positive `read_dir` reports as [`Error::EndOfSequence`]. A page
/// that exactly drains the listing does not set it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadDirPage {
    pub entries: Vec<DirEntry>,
    pub end: bool,
}

impl ReadDirPage {
    /// True when the listing ended inside this page.
    pub fn is_end(&self) -> bool {
        self.end
    }

    /// The end condition as an error, for callers that loop until
    /// [`Error::EndOfSequence`].
    pub fn end_of_sequence(&self) -> Option<Error> {
        self.end.then_some(Error::EndOfSequence)
    }

    pub fn into_entries(self) -> Vec<DirEntry> {
        self.entries
    }
}

impl Deref for ReadDirPage {
    type Target = [DirEntry];

    fn deref(&self) -> &[DirEntry] {
        &self.entries
    }
}

impl IntoIterator for ReadDirPage {
    type Item = DirEntry;
    type IntoIter = std::vec::IntoIter<DirEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A directory whose listing is fetched on the first `read_dir`.
///
/// The listing is a snapshot: it is fetched once and never refreshed.
pub struct DirHandle {
    path: String,
    prefix: Location,
    store: Arc<dyn KvStore>,
    ctx: Context,
    listing: Option<Vec<DirEntry>>,
    cursor: usize,
    closed: bool,
}

impl DirHandle {
    pub(crate) fn new(store: Arc<dyn KvStore>, ctx: Context, prefix: Location, path: &str) -> Self {
        Self {
            path: path.to_string(),
            prefix,
            store,
            ctx,
            listing: None,
            cursor: 0,
            closed: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stat(&self) -> Result<FileInfo, Error> {
        Ok(FileInfo::dir(base_name(&self.path)))
    }

    pub fn state(&self) -> DirState {
        match &self.listing {
            None => DirState::Fresh,
            Some(listing) if self.cursor < listing.len() => DirState::Reading,
            Some(_) => DirState::Exhausted,
        }
    }

    /// True once every entry has been returned.
    pub fn is_exhausted(&self) -> bool {
        self.state() == DirState::Exhausted
    }

    /// Read the next entries.
    ///
    /// - `n > 0`: at most `n` entries. When fewer than `n` remain, the
    ///   rest is returned with [`ReadDirPage::end`] set. A call with
    ///   nothing left fails with [`Error::EndOfSequence`].
    /// - `n <= 0`: every remaining entry, never flagged as the end. On an
    ///   exhausted handle this returns an empty page and no error.
    pub fn read_dir(&mut self, n: isize) -> Result<ReadDirPage, Error> {
        if self.closed {
            return Err(Error::already_closed("readdir", &self.path));
        }

        let cursor = self.cursor;
        let listing = self.materialize()?;
        let remaining = &listing[cursor.min(listing.len())..];

        let page = if n <= 0 {
            ReadDirPage {
                entries: remaining.to_vec(),
                end: false,
            }
        } else if remaining.is_empty() {
            return Err(Error::EndOfSequence);
        } else {
            let wanted = n.unsigned_abs();
            let count = remaining.len().min(wanted);
            ReadDirPage {
                entries: remaining[..count].to_vec(),
                end: wanted > remaining.len(),
            }
        };

        self.cursor += page.entries.len();
        Ok(page)
    }

    pub fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::already_closed("close", &self.path));
        }
        self.closed = true;
        Ok(())
    }

    fn materialize(&mut self) -> Result<&[DirEntry], Error> {
        let listing = match self.listing.take() {
            Some(listing) => listing,
            None => {
                log::debug!("materializing listing for '{}'", self.prefix);
                listing::list(self.store.as_ref(), &self.ctx, &self.prefix)
                    .map_err(|e| Error::from_store("readdir", &self.path, e))?
            }
        };
        Ok(self.listing.insert(listing))
    }
}

impl std::fmt::Debug for DirHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirHandle")
            .field("path", &self.path)
            .field("prefix", &self.prefix)
            .field("state", &self.state())
            .field("cursor", &self.cursor)
            .field("closed", &self.closed)
            .finish()
    }
}
