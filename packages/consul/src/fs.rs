//! Filesystem view over Consul KV.

use http::HeaderMap;
use url::Url;

use kvfs_core::{Bytes, Context, DirEntry, DirHandle, FileInfo, Handle, KvFs};

use crate::client::ConsulClient;
use crate::config::{address_from_url, ConsulConfig, QueryOptions};
use crate::error::Error;

/// A read-only filesystem over the keys of a Consul agent.
///
/// The URL names both the agent and the root of the view:
/// `consul://host:8500/app/` reads keys under `app/` from
/// `http://host:8500`, `consul+https://…` talks TLS, and `consul:///`
/// takes the agent address from `CONSUL_HTTP_ADDR`. Query parameters on
/// the URL are forwarded with every request.
///
/// All `with_*` methods return a new, independently configured view.
///
/// # Example
///
/// ```ignore
/// use kvfs_consul::ConsulFs;
///
/// let fsys = ConsulFs::parse("consul://my.consulserver.local:8500/")?;
/// let secret = fsys.read_file("mykey")?;
/// ```
#[derive(Clone, Debug)]
pub struct ConsulFs {
    base: Url,
    client: ConsulClient,
    fs: KvFs,
}

impl ConsulFs {
    /// Create a view for a `consul://`, `consul+http://` or
    /// `consul+https://` URL whose path names a directory.
    pub fn new(base: &Url) -> Result<Self, Error> {
        let mut config = ConsulConfig::from_env();
        if let Some(address) = address_from_url(base)? {
            config = config.with_address(address);
        }
        let client = ConsulClient::new(config)?;
        let fs = KvFs::new(base.clone(), client.clone())?;
        Ok(Self {
            base: fs.base().url().clone(),
            client,
            fs,
        })
    }

    /// Parse `url` and create a view for it.
    pub fn parse(url: &str) -> Result<Self, Error> {
        Self::new(&Url::parse(url)?)
    }

    /// The base URL, normalized to end with `/`.
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn config(&self) -> &ConsulConfig {
        self.client.config()
    }

    /// The underlying store-independent view.
    pub fn as_kv_fs(&self) -> &KvFs {
        &self.fs
    }

    /// A view using `config` in place of the current client settings.
    pub fn with_config(&self, config: ConsulConfig) -> Result<Self, Error> {
        let client = self.client.with_config(config)?;
        Ok(Self {
            base: self.base.clone(),
            fs: self.fs.with_store(client.clone()),
            client,
        })
    }

    /// A view authenticating with `token`.
    pub fn with_token(&self, token: impl Into<String>) -> Result<Self, Error> {
        self.with_config(self.config().with_token(token))
    }

    /// A view sending one more header value on every request.
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, Error> {
        self.with_config(self.config().with_header(name, value)?)
    }

    /// A view sending every value of `headers` on every request, in
    /// addition to the headers already configured.
    pub fn with_headers(&self, headers: &HeaderMap) -> Result<Self, Error> {
        self.with_config(self.config().with_headers(headers))
    }

    pub fn with_query_options(&self, query: QueryOptions) -> Result<Self, Error> {
        self.with_config(self.config().with_query_options(query))
    }

    /// A view whose requests are bound to `ctx`.
    #[must_use]
    pub fn with_context(&self, ctx: Context) -> Self {
        Self {
            base: self.base.clone(),
            client: self.client.clone(),
            fs: self.fs.with_context(ctx),
        }
    }

    pub fn open(&self, path: &str) -> Result<Handle, kvfs_core::Error> {
        self.fs.open(path)
    }

    pub fn open_dir(&self, path: &str) -> Result<DirHandle, kvfs_core::Error> {
        self.fs.open_dir(path)
    }

    pub fn stat(&self, path: &str) -> Result<FileInfo, kvfs_core::Error> {
        self.fs.stat(path)
    }

    pub fn read_file(&self, path: &str) -> Result<Bytes, kvfs_core::Error> {
        self.fs.read_file(path)
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, kvfs_core::Error> {
        self.fs.read_dir(path)
    }

    /// A view rooted at the directory `dir` of this one.
    pub fn sub(&self, dir: &str) -> Result<Self, kvfs_core::Error> {
        let fs = self.fs.sub(dir)?;
        Ok(Self {
            base: fs.base().url().clone(),
            client: self.client.clone(),
            fs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvfs_core::ErrorKind;

    #[test]
    fn new_normalizes_base() {
        let cases = [
            ("consul:///", "consul:///"),
            ("consul+https://example.com", "consul+https://example.com/"),
            ("consul:///?param=value", "consul:///?param=value"),
            ("consul:///secret/?param=value", "consul:///secret/?param=value"),
        ];

        for (input, expected) in cases {
            let fsys = ConsulFs::parse(input).unwrap();
            assert_eq!(fsys.base().as_str(), expected);
        }
    }

    #[test]
    fn new_rejects_file_base() {
        let err = ConsulFs::parse("consul:///secret/foo").unwrap_err();
        assert!(matches!(err, Error::Fs(ref e) if e.kind() == ErrorKind::InvalidPath));
    }

    #[test]
    fn new_rejects_foreign_scheme() {
        assert!(matches!(
            ConsulFs::parse("https://example.com/").unwrap_err(),
            Error::InvalidUrl { .. }
        ));
    }

    #[test]
    fn url_host_sets_address() {
        let fsys = ConsulFs::parse("consul+https://consul.example.com:8501/kv/").unwrap();
        assert_eq!(fsys.config().address(), "https://consul.example.com:8501");
    }

    #[test]
    fn open_rejects_invalid_paths() {
        let fsys = ConsulFs::parse("consul+https://127.0.0.1:8500/foo/").unwrap();
        assert_eq!(
            fsys.open("/bogus").unwrap_err().kind(),
            ErrorKind::InvalidPath
        );
        assert_eq!(
            fsys.open("bo\\gus").unwrap_err().kind(),
            ErrorKind::InvalidPath
        );
    }

    #[test]
    fn with_token_returns_new_view() {
        let fsys = ConsulFs::parse("consul://127.0.0.1:8500/")
            .unwrap()
            .with_config(ConsulConfig::new("http://127.0.0.1:8500"))
            .unwrap();
        let with_token = fsys.with_token("foo").unwrap();

        assert_eq!(with_token.config().token(), Some("foo"));
        assert_eq!(fsys.config().token(), None);
        assert_eq!(with_token.base(), fsys.base());
    }

    #[test]
    fn with_query_options_keeps_other_settings() {
        let fsys = ConsulFs::parse("consul://127.0.0.1:8500/")
            .unwrap()
            .with_token("foo")
            .unwrap();
        let opts = QueryOptions::default().with_datacenter("east");
        let derived = fsys.with_query_options(opts.clone()).unwrap();

        assert_eq!(derived.config().query_options(), &opts);
        assert_eq!(derived.config().token(), Some("foo"));
    }

    #[test]
    fn with_context_is_used_for_requests() {
        let ctx = Context::background();
        let fsys = ConsulFs::parse("consul://127.0.0.1:9/")
            .unwrap()
            .with_context(ctx.clone());
        ctx.cancel();

        assert_eq!(fsys.stat("foo").unwrap_err().kind(), ErrorKind::Canceled);
    }
}
