//! Stateless HTTP request builder and response parser for the record store
//! REST API.
//!
//! # Design
//! `RestClient` holds only a `base_url` and carries no mutable state between
//! calls. Each record operation is split into a `build_*` method that produces
//! an `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller executes the actual HTTP round-trip, keeping the core
//! deterministic and free of I/O dependencies.
//!
//! Record URIs have the form `{base}/v1/{resource}/{namespace}/{set}/{key}`
//! where the resource is `kvs` for direct access and `operate` for atomic
//! operation batches.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::codec::{encode_operations, Encoding};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::ops::Operation;
use crate::types::{Bins, Record, UserKey};

const KVS_RESOURCE: &str = "kvs";
const OPERATE_RESOURCE: &str = "operate";

/// How a write behaves when the record does or does not already exist.
/// Passed through as the `recordExistsAction` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordExistsAction {
    Update,
    UpdateOnly,
    Replace,
    ReplaceOnly,
    CreateOnly,
}

impl RecordExistsAction {
    fn as_str(&self) -> &'static str {
        match self {
            RecordExistsAction::Update => "UPDATE",
            RecordExistsAction::UpdateOnly => "UPDATE_ONLY",
            RecordExistsAction::Replace => "REPLACE",
            RecordExistsAction::ReplaceOnly => "REPLACE_ONLY",
            RecordExistsAction::CreateOnly => "CREATE_ONLY",
        }
    }
}

/// Record-scope options passed through as query parameters.
///
/// The predicate expression travels as the `predexp` param carrying the
/// standard-base64 expression text; `+`, `/` and the `=` padding are not
/// query-safe, so the encoded value is additionally percent-encoded.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub record_exists_action: Option<RecordExistsAction>,
    /// TTL in seconds to apply to the write.
    pub expiration: Option<u32>,
    /// Predicate expression source text; records not matching it are treated
    /// as absent by the server.
    pub filter_exp: Option<String>,
}

impl QueryParams {
    pub fn none() -> QueryParams {
        QueryParams::default()
    }

    /// Params for a write that must not create a new record.
    pub fn update_only() -> QueryParams {
        QueryParams {
            record_exists_action: Some(RecordExistsAction::UpdateOnly),
            ..QueryParams::default()
        }
    }

    fn to_query_string(&self) -> Option<String> {
        let mut pairs = Vec::new();
        if let Some(action) = self.record_exists_action {
            pairs.push(format!("recordExistsAction={}", action.as_str()));
        }
        if let Some(ttl) = self.expiration {
            pairs.push(format!("expiration={ttl}"));
        }
        if let Some(exp) = &self.filter_exp {
            pairs.push(format!(
                "predexp={}",
                percent_encode(&STANDARD.encode(exp))
            ));
        }
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("&"))
        }
    }
}

/// Percent-encode the three base64 characters that are reserved in a query
/// string; everything else in the standard alphabet passes through.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '+' => encoded.push_str("%2B"),
            '/' => encoded.push_str("%2F"),
            '=' => encoded.push_str("%3D"),
            _ => encoded.push(c),
        }
    }
    encoded
}

/// Synchronous, stateless client for the record store REST API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. The caller is responsible for executing the HTTP
/// round-trip between `build_*` and `parse_*`.
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn record_uri(
        &self,
        resource: &str,
        namespace: &str,
        set_name: &str,
        key: &UserKey,
        params: &QueryParams,
    ) -> String {
        let mut uri = format!(
            "{}/v1/{resource}/{namespace}/{set_name}/{key}",
            self.base_url
        );
        if let Some(query) = params.to_query_string() {
            uri.push('?');
            uri.push_str(&query);
        }
        uri
    }

    /// GET the record. `accept` selects the response encoding; byte bins only
    /// round-trip losslessly with `Encoding::MsgPack`.
    pub fn build_get_record(
        &self,
        namespace: &str,
        set_name: &str,
        key: &UserKey,
        params: &QueryParams,
        accept: Encoding,
    ) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.record_uri(KVS_RESOURCE, namespace, set_name, key, params),
            headers: vec![("accept".to_string(), accept.mime().to_string())],
            body: None,
        }
    }

    /// POST a new record. The body encoding is chosen from the bin values:
    /// MessagePack when any value contains raw bytes, JSON otherwise.
    pub fn build_create_record(
        &self,
        namespace: &str,
        set_name: &str,
        key: &UserKey,
        bins: &Bins,
        params: &QueryParams,
    ) -> Result<HttpRequest, ApiError> {
        self.build_write(HttpMethod::Post, namespace, set_name, key, bins, params)
    }

    /// PATCH an existing record: bins named here are written, bins not named
    /// are preserved.
    pub fn build_update_record(
        &self,
        namespace: &str,
        set_name: &str,
        key: &UserKey,
        bins: &Bins,
        params: &QueryParams,
    ) -> Result<HttpRequest, ApiError> {
        self.build_write(HttpMethod::Patch, namespace, set_name, key, bins, params)
    }

    /// PUT a full replacement: the record's bin map becomes exactly `bins`.
    pub fn build_replace_record(
        &self,
        namespace: &str,
        set_name: &str,
        key: &UserKey,
        bins: &Bins,
        params: &QueryParams,
    ) -> Result<HttpRequest, ApiError> {
        self.build_write(HttpMethod::Put, namespace, set_name, key, bins, params)
    }

    pub fn build_delete_record(
        &self,
        namespace: &str,
        set_name: &str,
        key: &UserKey,
        params: &QueryParams,
    ) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.record_uri(KVS_RESOURCE, namespace, set_name, key, params),
            headers: Vec::new(),
            body: None,
        }
    }

    /// POST an ordered operation batch to the `operate` resource. The batch
    /// is applied atomically in submission order; the response is a record
    /// view with per-operation results folded into its bins.
    pub fn build_operate_record(
        &self,
        namespace: &str,
        set_name: &str,
        key: &UserKey,
        operations: &[Operation],
        params: &QueryParams,
        accept: Encoding,
    ) -> Result<HttpRequest, ApiError> {
        let body = encode_operations(operations)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.record_uri(OPERATE_RESOURCE, namespace, set_name, key, params),
            headers: vec![
                ("content-type".to_string(), Encoding::Json.mime().to_string()),
                ("accept".to_string(), accept.mime().to_string()),
            ],
            body: Some(body),
        })
    }

    fn build_write(
        &self,
        method: HttpMethod,
        namespace: &str,
        set_name: &str,
        key: &UserKey,
        bins: &Bins,
        params: &QueryParams,
    ) -> Result<HttpRequest, ApiError> {
        let encoding = Encoding::for_bins(bins);
        let body = encoding.encode_bins(bins)?;
        Ok(HttpRequest {
            method,
            path: self.record_uri(KVS_RESOURCE, namespace, set_name, key, params),
            headers: vec![("content-type".to_string(), encoding.mime().to_string())],
            body: Some(body),
        })
    }

    pub fn parse_get_record(&self, response: HttpResponse) -> Result<Record, ApiError> {
        check_status(&response)?;
        Encoding::from_headers(&response.headers).decode_record(&response.body)
    }

    pub fn parse_create_record(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_update_record(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_replace_record(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_delete_record(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_operate_record(&self, response: HttpResponse) -> Result<Record, ApiError> {
        check_status(&response)?;
        Encoding::from_headers(&response.headers).decode_record(&response.body)
    }
}

/// Map non-2xx statuses to the error taxonomy: 404 means the record is
/// absent, 409 means a conflicting record exists, anything else carries the
/// server's error text.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    match response.status {
        404 => Err(ApiError::RecordNotFound),
        409 => Err(ApiError::RecordExists),
        status => Err(ApiError::HttpError {
            status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }),
    }
}
