//! Data model for records stored in the key-value store.
//!
//! # Design
//! `BinValue` is the closed set of value kinds a bin can hold. Its serde impls
//! are written by hand so one type serves both wire encodings: in
//! human-readable formats (JSON) byte values become standard-base64 strings,
//! matching how the server renders blob bins in JSON; in binary formats
//! (MessagePack) they use the native bin type and round-trip losslessly. The
//! `Record` envelope itself is a plain derive.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The user-chosen part of a record key. Rendered as the final path segment
/// of a record URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Str(String),
    Int(i64),
}

impl UserKey {
    /// Encode a raw byte key as a URL-safe base64 string key, suitable for
    /// use in a record URI path segment.
    pub fn from_bytes(key: &[u8]) -> UserKey {
        UserKey::Str(URL_SAFE.encode(key))
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Str(s) => f.write_str(s),
            UserKey::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for UserKey {
    fn from(s: &str) -> Self {
        UserKey::Str(s.to_string())
    }
}

impl From<String> for UserKey {
    fn from(s: String) -> Self {
        UserKey::Str(s)
    }
}

impl From<i64> for UserKey {
    fn from(n: i64) -> Self {
        UserKey::Int(n)
    }
}

/// A bin map: bin name to dynamically-typed value.
pub type Bins = BTreeMap<String, BinValue>;

/// A single bin value. One variant per kind the store can represent.
#[derive(Debug, Clone, PartialEq)]
pub enum BinValue {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<BinValue>),
    Map(BTreeMap<String, BinValue>),
}

impl From<i64> for BinValue {
    fn from(n: i64) -> Self {
        BinValue::Int(n)
    }
}

impl From<&str> for BinValue {
    fn from(s: &str) -> Self {
        BinValue::Str(s.to_string())
    }
}

impl From<String> for BinValue {
    fn from(s: String) -> Self {
        BinValue::Str(s)
    }
}

impl From<Vec<u8>> for BinValue {
    fn from(b: Vec<u8>) -> Self {
        BinValue::Bytes(b)
    }
}

impl From<Vec<BinValue>> for BinValue {
    fn from(items: Vec<BinValue>) -> Self {
        BinValue::List(items)
    }
}

impl From<BTreeMap<String, BinValue>> for BinValue {
    fn from(entries: BTreeMap<String, BinValue>) -> Self {
        BinValue::Map(entries)
    }
}

impl Serialize for BinValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BinValue::Int(n) => serializer.serialize_i64(*n),
            BinValue::Str(s) => serializer.serialize_str(s),
            BinValue::Bytes(b) => {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&STANDARD.encode(b))
                } else {
                    serializer.serialize_bytes(b)
                }
            }
            BinValue::List(items) => serializer.collect_seq(items),
            BinValue::Map(entries) => serializer.collect_map(entries),
        }
    }
}

impl<'de> Deserialize<'de> for BinValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BinValueVisitor;

        impl<'de> Visitor<'de> for BinValueVisitor {
            type Value = BinValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer, string, byte sequence, list, or map")
            }

            fn visit_i64<E>(self, v: i64) -> Result<BinValue, E> {
                Ok(BinValue::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BinValue, E> {
                i64::try_from(v)
                    .map(BinValue::Int)
                    .map_err(|_| E::custom("integer bin value out of i64 range"))
            }

            fn visit_str<E>(self, v: &str) -> Result<BinValue, E> {
                Ok(BinValue::Str(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<BinValue, E> {
                Ok(BinValue::Str(v))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<BinValue, E> {
                Ok(BinValue::Bytes(v.to_vec()))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<BinValue, E> {
                Ok(BinValue::Bytes(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<BinValue, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(BinValue::List(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<BinValue, A::Error> {
                let mut entries = BTreeMap::new();
                while let Some((key, value)) = map.next_entry::<String, BinValue>()? {
                    entries.insert(key, value);
                }
                Ok(BinValue::Map(entries))
            }
        }

        deserializer.deserialize_any(BinValueVisitor)
    }
}

/// A record as returned by the server: the bin map plus its metadata.
///
/// `generation` is the server-side version counter, incremented on each
/// successful write. `ttl` is the seconds remaining before expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub bins: Bins,
    pub generation: u32,
    pub ttl: i64,
}
