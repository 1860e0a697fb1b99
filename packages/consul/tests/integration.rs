use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::time::{Duration, Instant};

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use kvfs_consul::{ConsulConfig, ConsulFs, KvEntry, QueryOptions};
use kvfs_core::{Context, DirEntry, ErrorKind, FileInfo, StoreError};

const KV_PREFIX: &str = "/v1/kv/";

/// Answers KV reads the way a Consul agent does, from a fixed key set.
struct FakeConsul {
    keys: BTreeMap<String, String>,
}

impl FakeConsul {
    fn new() -> Self {
        let keys = [
            ("dir/foo", "foo"),
            ("dir/bar", "foo"),
            ("dir/sub/", ""),
            ("dir/sub/foo", "foo"),
            ("dir/sub/bar", "foo"),
            ("dir/sub/bazDir/", ""),
            ("dir/sub/bazDir/qux", "qux"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { keys }
    }
}

impl Respond for FakeConsul {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Some(key) = request.url.path().strip_prefix(KV_PREFIX) else {
            return ResponseTemplate::new(404);
        };
        let has = |name: &str| request.url.query_pairs().any(|(k, _)| k == name);

        if has("keys") {
            let separator = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "separator")
                .map(|(_, v)| v.into_owned());
            let keys: BTreeSet<String> = self
                .keys
                .keys()
                .filter_map(|k| {
                    let remainder = k.strip_prefix(key)?;
                    let cut = separator
                        .as_deref()
                        .and_then(|sep| remainder.find(sep).map(|i| key.len() + i + sep.len()));
                    Some(cut.map_or(k.clone(), |end| k[..end].to_string()))
                })
                .collect();
            if keys.is_empty() {
                return ResponseTemplate::new(404);
            }
            return ResponseTemplate::new(200).set_body_json(keys);
        }

        let recurse = has("recurse");
        let entries: Vec<KvEntry> = if recurse {
            self.keys
                .iter()
                .filter(|(k, _)| k.starts_with(key))
                .map(|(k, v)| KvEntry::new(k.clone(), v.clone()))
                .collect()
        } else {
            self.keys
                .get(key)
                .map(|v| KvEntry::new(key, v.clone()))
                .into_iter()
                .collect()
        };

        if entries.is_empty() {
            return ResponseTemplate::new(404);
        }
        ResponseTemplate::new(200).set_body_json(entries)
    }
}

async fn fake_consul() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(FakeConsul::new())
        .mount(&server)
        .await;
    server
}

fn consul_fs(uri: &str, base: &str) -> ConsulFs {
    ConsulFs::parse(base)
        .unwrap()
        .with_config(ConsulConfig::new(uri))
        .unwrap()
}

fn names(entries: &[DirEntry]) -> Vec<String> {
    entries.iter().map(|e| e.name().to_string()).collect()
}

#[tokio::test]
async fn test_read_file() {
    let server = fake_consul().await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");

        let mut f = fsys.open("foo").unwrap().into_file().unwrap();
        let mut buf = Vec::new();
        f.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"foo");

        assert_eq!(fsys.read_file("bar").unwrap(), "foo");

        assert!(f.close().is_ok());
        // should error on second call
        assert_eq!(f.close().unwrap_err().kind(), ErrorKind::AlreadyClosed);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_read_dir() {
    let server = fake_consul().await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let expected = vec![
            FileInfo::file("bar", 3),
            FileInfo::dir("bazDir"),
            FileInfo::file("foo", 3),
        ];

        let fsys = consul_fs(&uri, "consul:///dir/sub/");
        let entries = fsys.read_dir(".").unwrap();
        assert_eq!(entries.iter().map(|e| e.info()).collect::<Vec<_>>(), expected);

        let fsys = consul_fs(&uri, "consul:///dir/");
        let entries = fsys.read_dir("sub").unwrap();
        assert_eq!(entries.iter().map(|e| e.info()).collect::<Vec<_>>(), expected);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_read_dir_n() {
    let server = fake_consul().await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");

        // open and read a few entries at a time
        let mut dir = fsys.open("sub/").unwrap().into_dir().unwrap();
        assert_eq!(names(&dir.read_dir(1).unwrap()), vec!["bar"]);
        let page = dir.read_dir(2).unwrap();
        assert_eq!(names(&page), vec!["bazDir", "foo"]);
        assert!(!page.is_end());
        assert_eq!(dir.read_dir(1).unwrap_err().kind(), ErrorKind::EndOfSequence);
        dir.close().unwrap();

        // open and read everything
        let mut dir = fsys.open("sub/").unwrap().into_dir().unwrap();
        assert_eq!(dir.read_dir(0).unwrap().len(), 3);

        // open and read everything a few times
        let mut dir = fsys.open("sub/").unwrap().into_dir().unwrap();
        assert_eq!(dir.read_dir(-1).unwrap().len(), 3);
        assert_eq!(dir.read_dir(-1).unwrap().len(), 0);

        // open and read too many entries
        let mut dir = fsys.open(".").unwrap().into_dir().unwrap();
        let page = dir.read_dir(8).unwrap();
        assert_eq!(names(&page), vec!["bar", "foo", "sub"]);
        assert!(page.is_end());
        assert_eq!(dir.read_dir(8).unwrap_err().kind(), ErrorKind::EndOfSequence);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_listing_is_fetched_once_per_handle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/dir/sub/"))
        .and(query_param("recurse", ""))
        .respond_with(FakeConsul::new())
        .expect(1)
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");
        let mut dir = fsys.open("sub/").unwrap().into_dir().unwrap();
        dir.read_dir(1).unwrap();
        dir.read_dir(1).unwrap();
        dir.read_dir(1).unwrap();
        assert!(dir.read_dir(1).is_err());
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_stat() {
    let server = fake_consul().await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");

        let mut f = fsys.open("foo").unwrap();
        let fi = f.stat().unwrap();
        assert_eq!(fi, FileInfo::file("foo", 3));
        assert_eq!(fi.content_type, None);
        assert!(f.close().is_ok());

        let mut f = fsys.open("bogus").unwrap();
        assert!(f.stat().unwrap_err().is_not_exist());
        assert!(f.close().is_ok());

        assert_eq!(fsys.stat("sub").unwrap(), FileInfo::dir("sub"));
        assert_eq!(fsys.stat("foo").unwrap(), FileInfo::file("foo", 3));
        assert!(fsys.stat("bogus").unwrap_err().is_not_exist());
    })
    .await
    .unwrap();
}

fn without_param(name: &'static str) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |request: &Request| !request.url.query_pairs().any(|(k, _)| k == name)
}

#[tokio::test]
async fn test_stat_file_is_a_single_key_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/dir/foo"))
        .and(without_param("recurse"))
        .and(without_param("keys"))
        .respond_with(FakeConsul::new())
        .expect(1)
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");
        assert_eq!(fsys.stat("foo").unwrap(), FileInfo::file("foo", 3));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_stat_directory_checks_keys_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/dir/sub"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/dir/sub/"))
        .and(query_param("keys", ""))
        .and(query_param("separator", "/"))
        .and(without_param("recurse"))
        .respond_with(FakeConsul::new())
        .expect(2)
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");
        assert_eq!(fsys.stat("sub").unwrap(), FileInfo::dir("sub"));
        assert_eq!(fsys.stat("sub/").unwrap(), FileInfo::dir("sub"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_stat_marker_only_directory() {
    let server = MockServer::start().await;
    let fake = FakeConsul {
        keys: [("dir/empty/".to_string(), String::new())].into_iter().collect(),
    };
    Mock::given(method("GET"))
        .respond_with(fake)
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");
        assert_eq!(fsys.stat("empty").unwrap(), FileInfo::dir("empty"));
        assert_eq!(fsys.stat("empty/").unwrap(), FileInfo::dir("empty"));
        assert!(fsys.read_dir("empty").unwrap().is_empty());
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_deferred_status_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("ACL not found"))
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");
        let handle = fsys.open("foo").unwrap();
        let err = handle.stat().unwrap_err();
        assert!(matches!(
            err.store_error(),
            Some(StoreError::Status { code: 403, .. })
        ));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_token_and_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/dir/foo"))
        .and(header("X-Consul-Token", "secret"))
        .and(header("foo", "bar"))
        .respond_with(FakeConsul::new())
        .expect(1)
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/")
            .with_token("secret")
            .unwrap()
            .with_header("foo", "bar")
            .unwrap();
        assert_eq!(fsys.read_file("foo").unwrap(), "foo");
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_query_parameters_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/kv/dir/foo"))
        .and(query_param("dc", "east"))
        .and(query_param("param", "foo"))
        .respond_with(FakeConsul::new())
        .expect(1)
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/")
            .with_query_options(QueryOptions::default().with_datacenter("east"))
            .unwrap();
        assert_eq!(fsys.read_file("foo?param=foo").unwrap(), "foo");
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_server_error_is_store_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("rpc error"))
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/");

        let err = fsys.stat("foo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(err.to_string().contains("rpc error"));

        let mut dir = fsys.open(".").unwrap().into_dir().unwrap();
        assert_eq!(dir.read_dir(0).unwrap_err().kind(), ErrorKind::Store);

        let handle = fsys.open("foo").unwrap();
        assert_eq!(handle.stat().unwrap_err().kind(), ErrorKind::Store);
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_cancellation_aborts_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let ctx = Context::background().with_timeout(Duration::from_millis(100));
        let fsys = consul_fs(&uri, "consul:///dir/").with_context(ctx);

        let started = Instant::now();
        let err = fsys.stat("foo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Canceled);
        assert!(started.elapsed() < Duration::from_secs(4));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_sub_view() {
    let server = fake_consul().await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let fsys = consul_fs(&uri, "consul:///dir/").sub("sub").unwrap();
        assert_eq!(fsys.base().as_str(), "consul:///dir/sub/");
        assert_eq!(fsys.read_file("bazDir/qux").unwrap(), "qux");
        assert_eq!(names(&fsys.read_dir("bazDir").unwrap()), vec!["qux"]);
    })
    .await
    .unwrap();
}
