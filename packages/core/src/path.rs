//! Path validation and resolution onto a base URL.

use percent_encoding::percent_decode_str;
use url::Url;

/// Errors related to path parsing and validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string is empty.
    #[error("empty path")]
    Empty,

    /// The path starts with a separator.
    #[error("absolute paths are not allowed")]
    Absolute,

    /// The path contains a separator that is not `/`.
    #[error("illegal separator: backslash")]
    IllegalSeparator,

    /// A path element is empty (`a//b`).
    #[error("empty element at position {position}")]
    EmptyElement { position: usize },

    /// A path element is `.` or `..`.
    #[error("'{element}' element at position {position}")]
    DotElement { element: String, position: usize },

    /// A base location that does not name a directory.
    #[error("base '{url}' must end with '/'")]
    NotDirectory { url: String },

    /// A base URL that cannot carry a path.
    #[error("base '{url}' cannot carry a path")]
    InvalidBase { url: String },
}

/// Validate a relative filesystem path.
///
/// # Path Syntax
///
/// - Elements are separated by `/`
/// - `"."` alone names the root
/// - A single trailing `/` is allowed and marks a directory
/// - No leading `/`, no empty elements, no `.` or `..` elements
/// - No `\`
///
/// # Examples
///
/// ```rust
/// use kvfs_core::path::validate;
///
/// assert!(validate(".").is_ok());
/// assert!(validate("dir/sub/").is_ok());
/// assert!(validate("/bogus").is_err());
/// assert!(validate("a/../b").is_err());
/// ```
pub fn validate(name: &str) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::Empty);
    }
    if name.contains('\\') {
        return Err(PathError::IllegalSeparator);
    }
    if name.starts_with('/') {
        return Err(PathError::Absolute);
    }
    if name == "." {
        return Ok(());
    }

    let trimmed = name.strip_suffix('/').unwrap_or(name);
    for (position, element) in trimmed.split('/').enumerate() {
        match element {
            "" => return Err(PathError::EmptyElement { position }),
            "." | ".." => {
                return Err(PathError::DotElement {
                    element: element.to_string(),
                    position,
                })
            }
            _ => {}
        }
    }
    Ok(())
}

/// Join `rel` onto `base`.
///
/// The path part of `rel` is appended to the base path with exactly one
/// separator. Query pairs on `base` are kept and those carried by `rel`
/// (`"sub/foo?param=foo"`) are appended after them. `"."` resolves to the
/// base itself.
///
/// # Example
///
/// ```rust
/// use kvfs_core::path::resolve;
/// use url::Url;
///
/// let base = Url::parse("https://host/dir/").unwrap();
/// let url = resolve(&base, "sub/foo?param=foo").unwrap();
/// assert_eq!(url.as_str(), "https://host/dir/sub/foo?param=foo");
/// ```
pub fn resolve(base: &Url, rel: &str) -> Result<Url, PathError> {
    let (rel_path, rel_query) = match rel.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rel, None),
    };
    validate(rel_path)?;

    let mut url = base.clone();
    if rel_path != "." {
        let base_path = base.path();
        let joined = if base_path.ends_with('/') {
            format!("{}{}", base_path, rel_path)
        } else {
            format!("{}/{}", base_path, rel_path)
        };
        url.set_path(&joined);
    }

    if let Some(query) = rel_query.filter(|q| !q.is_empty()) {
        let combined = match base.query() {
            Some(existing) if !existing.is_empty() => format!("{}&{}", existing, query),
            _ => query.to_string(),
        };
        url.set_query(Some(&combined));
    }

    Ok(url)
}

/// The last element of a path, without its directory marker.
///
/// The root (`"."` or an empty key) is named `"."`. A query suffix is
/// ignored.
pub fn base_name(name: &str) -> &str {
    let name = name.split_once('?').map_or(name, |(path, _)| path);
    let trimmed = name.strip_suffix('/').unwrap_or(name);
    match trimmed.rsplit('/').next() {
        Some("") | None => ".",
        Some(last) => last,
    }
}

/// A resolved position in the store: a URL whose path is the key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    /// Wrap a base URL, which must name a directory.
    ///
    /// An empty path is normalized to `/`.
    pub fn base(mut url: Url) -> Result<Self, PathError> {
        if url.cannot_be_a_base() {
            return Err(PathError::InvalidBase {
                url: url.to_string(),
            });
        }
        if url.path().is_empty() {
            url.set_path("/");
        }
        if !url.path().ends_with('/') {
            return Err(PathError::NotDirectory {
                url: url.to_string(),
            });
        }
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The store key: the decoded URL path without its leading `/`.
    pub fn key(&self) -> String {
        let path = self.url.path();
        let path = path.strip_prefix('/').unwrap_or(path);
        percent_decode_str(path).decode_utf8_lossy().into_owned()
    }

    /// Query pairs to forward to the store.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// True for the root and for keys carrying the directory marker.
    pub fn is_dir(&self) -> bool {
        let path = self.url.path();
        path.is_empty() || path.ends_with('/')
    }

    /// This location with the directory marker appended.
    #[must_use]
    pub fn as_dir(&self) -> Location {
        if self.is_dir() {
            return self.clone();
        }
        let mut url = self.url.clone();
        let path = format!("{}/", url.path());
        url.set_path(&path);
        Location { url }
    }

    /// Resolve a relative path against this location.
    pub fn join(&self, rel: &str) -> Result<Location, PathError> {
        resolve(&self.url, rel).map(|url| Location { url })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
