//! Synchronous API client core for a key-value record store's REST interface.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, making the core fully deterministic and testable.
//!
//! # Design
//! - `RestClient` is stateless — it holds only `base_url`.
//! - Each record operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - Bin values are a closed tagged union; byte values force the MessagePack
//!   body encoding since JSON cannot carry raw bytes losslessly.
//! - Status codes map onto a small error taxonomy: 404 is `RecordNotFound`,
//!   409 is `RecordExists`, any other non-2xx is `HttpError`.

pub mod client;
pub mod codec;
pub mod error;
pub mod http;
pub mod ops;
pub mod types;

pub use client::{QueryParams, RecordExistsAction, RestClient};
pub use codec::Encoding;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use ops::{Operation, OperationKind};
pub use types::{BinValue, Bins, Record, UserKey};
