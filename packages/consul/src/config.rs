//! Client configuration.
//!
//! [`ConsulConfig`] is an immutable value: every `with_*` method returns a
//! new configuration derived from the receiver.

use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::Error;

/// Address used when neither the URL nor the environment names one.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8500";

/// Environment variable holding the agent address.
pub const ADDRESS_ENV: &str = "CONSUL_HTTP_ADDR";

/// Environment variable holding the ACL token.
pub const TOKEN_ENV: &str = "CONSUL_HTTP_TOKEN";

/// Header carrying the ACL token.
pub const TOKEN_HEADER: &str = "X-Consul-Token";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Query parameters sent with every KV request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Datacenter to query (`dc`).
    pub datacenter: Option<String>,
    /// Enterprise namespace (`ns`).
    pub namespace: Option<String>,
    /// Enterprise admin partition (`partition`).
    pub partition: Option<String>,
}

impl QueryOptions {
    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub(crate) fn pairs(&self) -> Vec<(String, String)> {
        [
            ("dc", &self.datacenter),
            ("ns", &self.namespace),
            ("partition", &self.partition),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.clone())))
        .collect()
    }
}

/// Settings for talking to a Consul agent.
#[derive(Clone, Debug)]
pub struct ConsulConfig {
    address: String,
    token: Option<String>,
    headers: HeaderMap,
    query: QueryOptions,
    timeout: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            token: None,
            headers: HeaderMap::new(),
            query: QueryOptions::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ConsulConfig {
    /// Create a configuration for the agent at `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `CONSUL_HTTP_ADDR` and `CONSUL_HTTP_TOKEN`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(address) = non_empty_env(ADDRESS_ENV) {
            config.address = normalize_address(&address);
        }
        config.token = non_empty_env(TOKEN_ENV);
        config
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query_options(&self) -> &QueryOptions {
        &self.query
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn with_address(&self, address: impl Into<String>) -> Self {
        Self {
            address: normalize_address(&address.into()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    /// Add one header value. Existing values for `name` are kept.
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, Error> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        let mut headers = self.headers.clone();
        headers.append(name, value);
        Ok(Self {
            headers,
            ..self.clone()
        })
    }

    /// Add every value of `extra`. Existing values are kept.
    #[must_use]
    pub fn with_headers(&self, extra: &HeaderMap) -> Self {
        let mut headers = self.headers.clone();
        for (name, value) in extra {
            headers.append(name.clone(), value.clone());
        }
        Self {
            headers,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_query_options(&self, query: QueryOptions) -> Self {
        Self {
            query,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }
}

/// The HTTP address encoded in a `consul://` URL.
///
/// `consul://host:port` and `consul+http://…` map to `http://host:port`,
/// `consul+https://…` to `https://…`. A URL without a host yields `None`,
/// leaving the address to the environment or the default.
pub fn address_from_url(url: &Url) -> Result<Option<String>, Error> {
    let scheme = match url.scheme() {
        "consul" | "consul+http" => "http",
        "consul+https" => "https",
        other => {
            return Err(Error::InvalidUrl {
                message: format!("unsupported scheme '{}'", other),
            })
        }
    };

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return Ok(None),
    };

    let address = match url.port() {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    };
    Ok(Some(address))
}

/// Add a scheme to bare `host:port` addresses, as the Consul CLI does.
fn normalize_address(address: &str) -> String {
    if address.contains("://") {
        address.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", address.trim_end_matches('/'))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
