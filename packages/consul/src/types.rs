use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A key/value pair as returned by `GET /v1/kv/<key>`.
///
/// The value travels base64-encoded; `null` means an empty value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct KvEntry {
    pub key: String,

    #[serde(default, with = "base64_value")]
    pub value: Bytes,

    #[serde(default)]
    pub flags: u64,

    #[serde(default)]
    pub create_index: u64,

    #[serde(default)]
    pub modify_index: u64,

    #[serde(default)]
    pub lock_index: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl KvEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

impl From<KvEntry> for kvfs_core::KvPair {
    fn from(entry: KvEntry) -> Self {
        kvfs_core::KvPair::new(entry.key, entry.value)
    }
}

mod base64_value {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_empty() {
            serializer.serialize_none()
        } else {
            serializer.serialize_str(&STANDARD.encode(value))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Bytes::new()),
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Bytes::from)
                .map_err(serde::de::Error::custom),
        }
    }
}
