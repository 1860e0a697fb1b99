//! Blocking Consul KV client.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::{Client, Request};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use kvfs_core::{Context, KvPair, KvStore, Location, StoreError};

use crate::config::{ConsulConfig, TOKEN_HEADER};
use crate::error::Error;
use crate::types::KvEntry;

/// How often an in-flight request checks its context for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Which form of `GET /v1/kv/<key>` to issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lookup {
    /// The single key.
    Key,
    /// Every pair under the prefix (`?recurse`).
    Recurse,
    /// Key names only, cut at the next `/` (`?keys&separator=/`).
    Keys,
}

impl Lookup {
    fn params(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Lookup::Key => &[],
            Lookup::Recurse => &[("recurse", "")],
            Lookup::Keys => &[("keys", ""), ("separator", "/")],
        }
    }
}

/// A read-only client for the Consul KV HTTP API.
///
/// Every call is one `GET /v1/kv/<key>` request. Requests run on a worker
/// thread so that canceling the [`Context`] returns immediately instead of
/// waiting for the transport.
///
/// # Example
///
/// ```ignore
/// use kvfs_consul::{ConsulClient, ConsulConfig};
/// use kvfs_core::Context;
///
/// let client = ConsulClient::new(ConsulConfig::new("http://127.0.0.1:8500"))?;
/// let entries = client.list_entries(&Context::background(), "app/", &[])?;
/// ```
#[derive(Clone, Debug)]
pub struct ConsulClient {
    http: Client,
    config: ConsulConfig,
}

impl ConsulClient {
    /// Create a client for `config`.
    pub fn new(config: ConsulConfig) -> Result<Self, Error> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { http, config })
    }

    /// A client using `config`, reusing this client's connection pool when
    /// the timeout is unchanged.
    pub fn with_config(&self, config: ConsulConfig) -> Result<Self, Error> {
        if config.timeout() == self.config.timeout() {
            Ok(Self {
                http: self.http.clone(),
                config,
            })
        } else {
            Self::new(config)
        }
    }

    pub fn config(&self) -> &ConsulConfig {
        &self.config
    }

    /// Fetch a single key. `Ok(None)` when the key does not exist.
    pub fn get_entry(
        &self,
        ctx: &Context,
        key: &str,
        params: &[(String, String)],
    ) -> Result<Option<KvEntry>, Error> {
        let entries: Option<Vec<KvEntry>> = self.query(ctx, key, params, Lookup::Key)?;
        Ok(entries.and_then(|entries| entries.into_iter().find(|e| e.key == key)))
    }

    /// Fetch every entry under `prefix`, at any depth.
    pub fn list_entries(
        &self,
        ctx: &Context,
        prefix: &str,
        params: &[(String, String)],
    ) -> Result<Vec<KvEntry>, Error> {
        Ok(self
            .query(ctx, prefix, params, Lookup::Recurse)?
            .unwrap_or_default())
    }

    /// Key names at or directly below `prefix`, without values. Deeper
    /// keys are folded into their first-level directory (`prefix + name/`).
    pub fn list_keys(
        &self,
        ctx: &Context,
        prefix: &str,
        params: &[(String, String)],
    ) -> Result<Vec<String>, Error> {
        Ok(self
            .query(ctx, prefix, params, Lookup::Keys)?
            .unwrap_or_default())
    }

    /// Build the URL for `key` under the agent's KV endpoint.
    pub fn kv_url(&self, key: &str) -> Result<Url, Error> {
        let mut url = Url::parse(self.config.address())?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| Error::InvalidUrl {
                message: format!("address '{}' cannot carry a path", self.config.address()),
            })?;
            segments.pop_if_empty().extend(["v1", "kv"]).extend(key.split('/'));
        }
        Ok(url)
    }

    fn query<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        key: &str,
        params: &[(String, String)],
        lookup: Lookup,
    ) -> Result<Option<T>, Error> {
        let url = self.kv_url(key)?;

        let mut query: Vec<(String, String)> = params.to_vec();
        query.extend(self.config.query_options().pairs());
        query.extend(
            lookup
                .params()
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );

        let mut req_builder = self
            .http
            .get(url)
            .headers(self.config.headers().clone());

        if !query.is_empty() {
            req_builder = req_builder.query(&query);
        }

        if let Some(token) = self.config.token() {
            req_builder = req_builder.header(TOKEN_HEADER, token);
        }

        if let Some(remaining) = ctx.remaining() {
            req_builder = req_builder.timeout(remaining);
        }

        let request = req_builder.build()?;
        log::debug!("GET {}", request.url());

        let (status, body) = self.execute(ctx, request)?;
        log::trace!("{} returned {} ({} bytes)", key, status, body.len());

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        Ok(Some(serde_json::from_slice(&body)?))
    }

    /// Send `request` on a worker thread and wait for it, watching `ctx`.
    ///
    /// On cancellation the caller returns at once but the worker thread is
    /// detached, not killed: it finishes when the transport does, bounded
    /// by the request timeout. That timeout is the context's remaining time
    /// when it has a deadline, and the configured client timeout otherwise.
    fn execute(&self, ctx: &Context, request: Request) -> Result<(StatusCode, Bytes), Error> {
        if ctx.is_canceled() {
            return Err(Error::Canceled);
        }

        let client = self.http.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = client.execute(request).and_then(|response| {
                let status = response.status();
                response.bytes().map(|body| (status, body))
            });
            // The receiver is gone if the caller was canceled.
            let _ = tx.send(result);
        });

        loop {
            match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(Err(_)) if ctx.is_canceled() => return Err(Error::Canceled),
                Ok(result) => return result.map_err(Error::from),
                Err(RecvTimeoutError::Timeout) => {
                    if ctx.is_canceled() {
                        log::debug!("request canceled while in flight");
                        return Err(Error::Canceled);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Err(Error::WorkerGone),
            }
        }
    }
}

impl KvStore for ConsulClient {
    fn get(&self, ctx: &Context, at: &Location) -> Result<Option<KvPair>, StoreError> {
        let entry = self.get_entry(ctx, &at.key(), &at.query_pairs())?;
        Ok(entry.map(KvPair::from))
    }

    fn list(&self, ctx: &Context, prefix: &Location) -> Result<Vec<KvPair>, StoreError> {
        let entries = self.list_entries(ctx, &prefix.key(), &prefix.query_pairs())?;
        Ok(entries.into_iter().map(KvPair::from).collect())
    }

    fn keys(&self, ctx: &Context, prefix: &Location) -> Result<Vec<String>, StoreError> {
        let mut keys = self.list_keys(ctx, &prefix.key(), &prefix.query_pairs())?;
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
