//! Wire encoding selection for record payloads.
//!
//! # Design
//! JSON is the default body encoding. It cannot carry raw bytes losslessly
//! (byte bins come back as base64 strings), so any bin map containing a
//! `Bytes` value — at any nesting depth — must travel as MessagePack instead.
//! `Encoding::for_bins` applies that rule; `Encoding::from_headers` picks the
//! decode format from a response's `content-type`. Operation lists always
//! travel as JSON: byte payloads inside operation values are base64 strings
//! by convention.

use crate::error::ApiError;
use crate::ops::Operation;
use crate::types::{BinValue, Bins, Record};

const JSON_MIME: &str = "application/json";
const MSGPACK_MIME: &str = "application/msgpack";

/// Body encoding for record payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MsgPack,
}

impl Encoding {
    /// The MIME type used in `content-type` / `accept` headers.
    pub fn mime(&self) -> &'static str {
        match self {
            Encoding::Json => JSON_MIME,
            Encoding::MsgPack => MSGPACK_MIME,
        }
    }

    /// Pick the encoding a bin map requires: MessagePack if any value contains
    /// raw bytes, JSON otherwise.
    pub fn for_bins(bins: &Bins) -> Encoding {
        if bins.values().any(contains_bytes) {
            Encoding::MsgPack
        } else {
            Encoding::Json
        }
    }

    /// Pick the decode format from a response header list. Absent or
    /// unrecognized `content-type` defaults to JSON.
    pub fn from_headers(headers: &[(String, String)]) -> Encoding {
        let packed = headers.iter().any(|(name, value)| {
            name.eq_ignore_ascii_case("content-type") && value.starts_with(MSGPACK_MIME)
        });
        if packed {
            Encoding::MsgPack
        } else {
            Encoding::Json
        }
    }

    /// Encode a bin map as a request body.
    pub fn encode_bins(&self, bins: &Bins) -> Result<Vec<u8>, ApiError> {
        match self {
            Encoding::Json => {
                serde_json::to_vec(bins).map_err(|e| ApiError::SerializationError(e.to_string()))
            }
            Encoding::MsgPack => {
                rmp_serde::to_vec(bins).map_err(|e| ApiError::SerializationError(e.to_string()))
            }
        }
    }

    /// Decode a record response body.
    pub fn decode_record(&self, body: &[u8]) -> Result<Record, ApiError> {
        match self {
            Encoding::Json => serde_json::from_slice(body)
                .map_err(|e| ApiError::DeserializationError(e.to_string())),
            Encoding::MsgPack => rmp_serde::from_slice(body)
                .map_err(|e| ApiError::DeserializationError(e.to_string())),
        }
    }
}

/// Encode an ordered operation list as a JSON request body.
pub fn encode_operations(operations: &[Operation]) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(operations).map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn contains_bytes(value: &BinValue) -> bool {
    match value {
        BinValue::Bytes(_) => true,
        BinValue::List(items) => items.iter().any(contains_bytes),
        BinValue::Map(entries) => entries.values().any(contains_bytes),
        BinValue::Int(_) | BinValue::Str(_) => false,
    }
}
