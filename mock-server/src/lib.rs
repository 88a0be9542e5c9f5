//! In-memory implementation of the record store REST surface.
//!
//! Serves `/v1/kvs/{namespace}/{set}/{key}` for direct record access and
//! `/v1/operate/{namespace}/{set}/{key}` for atomic operation batches,
//! with JSON/MessagePack content negotiation. Backs the integration tests
//! and runs standalone for manual poking.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use asrest_core::{BinValue, Bins, Operation, OperationKind, Record};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

const MSGPACK_MIME: &str = "application/msgpack";

/// Default TTL applied to writes that carry no `expiration` param, roughly
/// 30 days, matching the server this mock stands in for.
pub const DEFAULT_TTL: i64 = 2_592_000;

/// A stored record: bins plus the metadata the server maintains.
#[derive(Clone, Debug)]
pub struct StoredRecord {
    pub bins: Bins,
    pub generation: u32,
    pub ttl: i64,
}

impl StoredRecord {
    fn to_record(&self) -> Record {
        Record {
            bins: self.bins.clone(),
            generation: self.generation,
            ttl: self.ttl,
        }
    }
}

type RecordKey = (String, String, String);

pub type Db = Arc<RwLock<HashMap<RecordKey, StoredRecord>>>;

/// JSON error body accompanying non-2xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Query params recognized on write and operate calls. Other params
/// (e.g. `predexp`) are accepted and ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteParams {
    pub record_exists_action: Option<String>,
    pub expiration: Option<u32>,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route(
            "/v1/kvs/{namespace}/{set}/{key}",
            get(get_record)
                .post(create_record)
                .patch(update_record)
                .put(replace_record)
                .delete(delete_record),
        )
        .route("/v1/operate/{namespace}/{set}/{key}", post(operate_record))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn get_record(
    State(db): State<Db>,
    Path(key): Path<RecordKey>,
    headers: HeaderMap,
) -> Response {
    let records = db.read().await;
    match records.get(&key) {
        Some(stored) => record_response(&headers, &stored.to_record()),
        None => error_response(StatusCode::NOT_FOUND, "record does not exist"),
    }
}

async fn create_record(
    State(db): State<Db>,
    Path(key): Path<RecordKey>,
    Query(params): Query<WriteParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let bins = match decode_bins(&headers, &body) {
        Ok(bins) => bins,
        Err(response) => return response,
    };
    let mut records = db.write().await;
    if records.contains_key(&key) {
        return error_response(StatusCode::CONFLICT, "record already exists");
    }
    records.insert(
        key,
        StoredRecord {
            bins,
            generation: 1,
            ttl: ttl_for(&params),
        },
    );
    StatusCode::CREATED.into_response()
}

async fn update_record(
    State(db): State<Db>,
    Path(key): Path<RecordKey>,
    Query(params): Query<WriteParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let bins = match decode_bins(&headers, &body) {
        Ok(bins) => bins,
        Err(response) => return response,
    };
    let mut records = db.write().await;
    let Some(stored) = records.get_mut(&key) else {
        return error_response(StatusCode::NOT_FOUND, "record does not exist");
    };
    // Merge at bin granularity: named bins are overwritten, others survive.
    stored.bins.extend(bins);
    stored.generation += 1;
    if let Some(ttl) = params.expiration {
        stored.ttl = i64::from(ttl);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn replace_record(
    State(db): State<Db>,
    Path(key): Path<RecordKey>,
    Query(params): Query<WriteParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let bins = match decode_bins(&headers, &body) {
        Ok(bins) => bins,
        Err(response) => return response,
    };
    let mut records = db.write().await;
    let Some(stored) = records.get_mut(&key) else {
        return error_response(StatusCode::NOT_FOUND, "record does not exist");
    };
    stored.bins = bins;
    stored.generation += 1;
    if let Some(ttl) = params.expiration {
        stored.ttl = i64::from(ttl);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_record(State(db): State<Db>, Path(key): Path<RecordKey>) -> Response {
    let mut records = db.write().await;
    match records.remove(&key) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error_response(StatusCode::NOT_FOUND, "record does not exist"),
    }
}

async fn operate_record(
    State(db): State<Db>,
    Path(key): Path<RecordKey>,
    Query(params): Query<WriteParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let operations: Vec<Operation> = match serde_json::from_slice(&body) {
        Ok(operations) => operations,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("malformed operation list: {e}"),
            )
        }
    };

    let mut records = db.write().await;
    let exists = records.contains_key(&key);
    match params.record_exists_action.as_deref() {
        Some("UPDATE_ONLY") | Some("REPLACE_ONLY") if !exists => {
            return error_response(StatusCode::NOT_FOUND, "record does not exist");
        }
        Some("CREATE_ONLY") if exists => {
            return error_response(StatusCode::CONFLICT, "record already exists");
        }
        _ => {}
    }

    // Apply against a working copy and commit only if the whole batch
    // succeeds, so a failing batch leaves the record untouched (and a
    // missing record uncreated).
    let mut working = records
        .get(&key)
        .map(|stored| stored.bins.clone())
        .unwrap_or_default();
    let mut results: BTreeMap<String, Vec<BinValue>> = BTreeMap::new();
    let mut mutated = false;
    for operation in &operations {
        match apply_operation(&mut working, operation) {
            Ok(outcome) => {
                if let Some((bin, value)) = outcome.result {
                    results.entry(bin).or_default().push(value);
                }
                mutated |= outcome.mutated;
            }
            Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
        }
    }
    if !exists && !mutated {
        return error_response(StatusCode::NOT_FOUND, "record does not exist");
    }
    let stored = records.entry(key).or_insert_with(|| StoredRecord {
        bins: Bins::new(),
        generation: 0,
        ttl: ttl_for(&params),
    });
    stored.bins = working;
    if mutated {
        stored.generation += 1;
    }

    // One folded entry per bin; several results for the same bin become a
    // list in submission order.
    let bins = results
        .into_iter()
        .map(|(bin, mut values)| {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                BinValue::List(values)
            };
            (bin, value)
        })
        .collect();
    let view = Record {
        bins,
        generation: stored.generation,
        ttl: stored.ttl,
    };
    record_response(&headers, &view)
}

#[derive(Debug)]
struct OpOutcome {
    result: Option<(String, BinValue)>,
    mutated: bool,
}

fn apply_operation(bins: &mut Bins, operation: &Operation) -> Result<OpOutcome, String> {
    let bin = operand_str(operation, "bin")?;
    match operation.operation {
        OperationKind::Read => Ok(OpOutcome {
            result: bins.get(&bin).cloned().map(|value| (bin, value)),
            mutated: false,
        }),
        OperationKind::Put => {
            let value = operand(operation, "value")?;
            bins.insert(bin, value);
            Ok(OpOutcome {
                result: None,
                mutated: true,
            })
        }
        OperationKind::Append => {
            let suffix = match operand(operation, "value")? {
                BinValue::Str(s) => s,
                _ => return Err("APPEND requires a string 'value' operand".to_string()),
            };
            match bins.get_mut(&bin) {
                Some(BinValue::Str(s)) => s.push_str(&suffix),
                None => {
                    bins.insert(bin, BinValue::Str(suffix));
                }
                Some(_) => return Err(format!("APPEND requires bin '{bin}' to hold a string")),
            }
            Ok(OpOutcome {
                result: None,
                mutated: true,
            })
        }
        OperationKind::Add => {
            let incr = match operand(operation, "incr")? {
                BinValue::Int(n) => n,
                _ => return Err("ADD requires an integer 'incr' operand".to_string()),
            };
            match bins.get_mut(&bin) {
                Some(BinValue::Int(n)) => {
                    *n = n
                        .checked_add(incr)
                        .ok_or_else(|| format!("ADD overflows bin '{bin}'"))?;
                }
                None => {
                    bins.insert(bin, BinValue::Int(incr));
                }
                Some(_) => return Err(format!("ADD requires bin '{bin}' to hold an integer")),
            }
            Ok(OpOutcome {
                result: None,
                mutated: true,
            })
        }
        OperationKind::ListAppend => {
            let value = operand(operation, "value")?;
            let length = match bins.get_mut(&bin) {
                Some(BinValue::List(items)) => {
                    items.push(value);
                    items.len()
                }
                None => {
                    bins.insert(bin.clone(), BinValue::List(vec![value]));
                    1
                }
                Some(_) => {
                    return Err(format!("LIST_APPEND requires bin '{bin}' to hold a list"))
                }
            };
            Ok(OpOutcome {
                result: Some((bin, BinValue::Int(length as i64))),
                mutated: true,
            })
        }
        other => Err(format!("unsupported operation: {other:?}")),
    }
}

fn operand(operation: &Operation, name: &str) -> Result<BinValue, String> {
    operation
        .op_values
        .get(name)
        .cloned()
        .ok_or_else(|| format!("operation is missing the '{name}' operand"))
}

fn operand_str(operation: &Operation, name: &str) -> Result<String, String> {
    match operand(operation, name)? {
        BinValue::Str(s) => Ok(s),
        _ => Err(format!("operand '{name}' must be a string")),
    }
}

fn ttl_for(params: &WriteParams) -> i64 {
    params.expiration.map(i64::from).unwrap_or(DEFAULT_TTL)
}

fn decode_bins(headers: &HeaderMap, body: &Bytes) -> Result<Bins, Response> {
    let packed = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(MSGPACK_MIME));
    let decoded = if packed {
        rmp_serde::from_slice(body).map_err(|e| e.to_string())
    } else {
        serde_json::from_slice(body).map_err(|e| e.to_string())
    };
    decoded.map_err(|message| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("malformed bin map: {message}"),
        )
    })
}

fn record_response(headers: &HeaderMap, record: &Record) -> Response {
    let wants_msgpack = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(MSGPACK_MIME));
    if wants_msgpack {
        match rmp_serde::to_vec_named(record) {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, MSGPACK_MIME)],
                body,
            )
                .into_response(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        }
    } else {
        Json(record).into_response()
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bins(entries: Vec<(&str, BinValue)>) -> Bins {
        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    #[test]
    fn read_returns_current_value() {
        let mut b = bins(vec![("b1", BinValue::Int(12345))]);
        let outcome = apply_operation(&mut b, &Operation::read("b1")).unwrap();
        assert_eq!(
            outcome.result,
            Some(("b1".to_string(), BinValue::Int(12345)))
        );
        assert!(!outcome.mutated);
    }

    #[test]
    fn read_of_missing_bin_yields_no_result() {
        let mut b = Bins::new();
        let outcome = apply_operation(&mut b, &Operation::read("nope")).unwrap();
        assert!(outcome.result.is_none());
    }

    #[test]
    fn append_extends_string_bin() {
        let mut b = bins(vec![("name", "Bob".into())]);
        apply_operation(&mut b, &Operation::append("name", " Roberts")).unwrap();
        assert_eq!(b["name"], BinValue::Str("Bob Roberts".to_string()));
    }

    #[test]
    fn add_increments_integer_bin() {
        let mut b = bins(vec![("name_length", 3.into())]);
        apply_operation(&mut b, &Operation::add("name_length", 8)).unwrap();
        assert_eq!(b["name_length"], BinValue::Int(11));
    }

    #[test]
    fn add_overflow_is_an_error() {
        let mut b = bins(vec![("counter", i64::MAX.into())]);
        let err = apply_operation(&mut b, &Operation::add("counter", 1)).unwrap_err();
        assert!(err.contains("overflows"));
        assert_eq!(b["counter"], BinValue::Int(i64::MAX));
    }

    #[test]
    fn add_to_string_bin_is_an_error() {
        let mut b = bins(vec![("name", "Bob".into())]);
        let err = apply_operation(&mut b, &Operation::add("name", 1)).unwrap_err();
        assert!(err.contains("integer"));
    }

    #[test]
    fn list_append_reports_new_length() {
        let mut b = bins(vec![(
            "interests",
            BinValue::List(vec!["cooking".into(), "gardening".into()]),
        )]);
        let outcome =
            apply_operation(&mut b, &Operation::list_append("interests", "sewing")).unwrap();
        assert_eq!(
            outcome.result,
            Some(("interests".to_string(), BinValue::Int(3)))
        );
        assert!(outcome.mutated);
    }

    #[test]
    fn list_append_creates_missing_list() {
        let mut b = Bins::new();
        let outcome = apply_operation(&mut b, &Operation::list_append("tags", "new")).unwrap();
        assert_eq!(outcome.result, Some(("tags".to_string(), BinValue::Int(1))));
        assert_eq!(b["tags"], BinValue::List(vec!["new".into()]));
    }

    #[test]
    fn unsupported_operation_is_rejected() {
        let mut b = Bins::new();
        let err = apply_operation(&mut b, &Operation::hll_set_count("hllBin")).unwrap_err();
        assert!(err.contains("unsupported"));
    }
}
