//! Record lifecycle tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every core client
//! operation over real HTTP using ureq. Validates that the core's request
//! building and response parsing work end-to-end with the actual server.

use asrest_core::{
    ApiError, BinValue, Bins, Encoding, HttpMethod, HttpRequest, HttpResponse, Operation,
    QueryParams, RestClient, UserKey,
};

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn with_headers<B>(
    builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |b, (name, value)| {
            b.header(name.as_str(), value.as_str())
        })
}

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the core
/// client handle status interpretation.
fn execute(req: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = match (req.method, req.body) {
        (HttpMethod::Get, _) => with_headers(agent.get(&req.path), &req.headers).call(),
        (HttpMethod::Delete, _) => with_headers(agent.delete(&req.path), &req.headers).call(),
        (HttpMethod::Post, Some(body)) => {
            with_headers(agent.post(&req.path), &req.headers).send(&body[..])
        }
        (HttpMethod::Post, None) => with_headers(agent.post(&req.path), &req.headers).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            with_headers(agent.put(&req.path), &req.headers).send(&body[..])
        }
        (HttpMethod::Put, None) => with_headers(agent.put(&req.path), &req.headers).send_empty(),
        (HttpMethod::Patch, Some(body)) => {
            with_headers(agent.patch(&req.path), &req.headers).send(&body[..])
        }
        (HttpMethod::Patch, None) => {
            with_headers(agent.patch(&req.path), &req.headers).send_empty()
        }
    }
    .expect("HTTP transport error");

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = response.body_mut().read_to_vec().unwrap_or_default();

    HttpResponse {
        status,
        headers,
        body,
    }
}

fn bins(entries: Vec<(&str, BinValue)>) -> Bins {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

#[test]
fn record_lifecycle() {
    let client = RestClient::new(&start_server());
    let key = UserKey::from("bob");
    let none = QueryParams::none();

    // Get before create — RecordNotFound.
    let req = client.build_get_record("test", "users", &key, &none, Encoding::Json);
    let err = client.parse_get_record(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::RecordNotFound));

    // Create, then read back the stored bins.
    let stored = bins(vec![
        ("name", "Bob".into()),
        ("id", 123.into()),
        ("color", "Purple".into()),
        (
            "languages",
            BinValue::List(vec!["Python".into(), "Java".into(), "C".into()]),
        ),
    ]);
    let req = client
        .build_create_record("test", "users", &key, &stored, &none)
        .unwrap();
    client.parse_create_record(execute(req)).unwrap();

    let req = client.build_get_record("test", "users", &key, &none, Encoding::Json);
    let record = client.parse_get_record(execute(req)).unwrap();
    assert_eq!(record.bins, stored);
    assert_eq!(record.generation, 1);

    // Create again — RecordExists, and the original bins are untouched.
    let req = client
        .build_create_record("test", "users", &key, &bins(vec![("name", "Eve".into())]), &none)
        .unwrap();
    let err = client.parse_create_record(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::RecordExists));

    let req = client.build_get_record("test", "users", &key, &none, Encoding::Json);
    let record = client.parse_get_record(execute(req)).unwrap();
    assert_eq!(record.bins, stored);

    // Partial update preserves unnamed bins.
    let req = client
        .build_update_record(
            "test",
            "users",
            &key,
            &bins(vec![("color", "Orange".into())]),
            &none,
        )
        .unwrap();
    client.parse_update_record(execute(req)).unwrap();

    let req = client.build_get_record("test", "users", &key, &none, Encoding::Json);
    let record = client.parse_get_record(execute(req)).unwrap();
    assert_eq!(record.bins["color"], BinValue::Str("Orange".to_string()));
    assert_eq!(record.bins["name"], BinValue::Str("Bob".to_string()));
    assert_eq!(record.generation, 2);

    // Replace with the same partial map drops every other bin.
    let req = client
        .build_replace_record(
            "test",
            "users",
            &key,
            &bins(vec![("color", "Orange".into())]),
            &none,
        )
        .unwrap();
    client.parse_replace_record(execute(req)).unwrap();

    let req = client.build_get_record("test", "users", &key, &none, Encoding::Json);
    let record = client.parse_get_record(execute(req)).unwrap();
    assert_eq!(record.bins, bins(vec![("color", "Orange".into())]));

    // Delete, then get — RecordNotFound.
    let req = client.build_delete_record("test", "users", &key, &none);
    client.parse_delete_record(execute(req)).unwrap();

    let req = client.build_get_record("test", "users", &key, &none, Encoding::Json);
    let err = client.parse_get_record(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::RecordNotFound));

    // Second delete also fails — delete is not idempotent.
    let req = client.build_delete_record("test", "users", &key, &none);
    let err = client.parse_delete_record(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::RecordNotFound));
}

#[test]
fn operate_batch_appends_and_reads_back() {
    let client = RestClient::new(&start_server());
    let key = UserKey::from("bob");
    let none = QueryParams::none();

    let req = client
        .build_create_record(
            "test",
            "users",
            &key,
            &bins(vec![("name", "Bob".into()), ("name_length", 3.into())]),
            &none,
        )
        .unwrap();
    client.parse_create_record(execute(req)).unwrap();

    let ops = vec![
        Operation::append("name", " Roberts"),
        Operation::add("name_length", 8),
        Operation::put("company", "Aerospike"),
        Operation::read("name"),
    ];
    let req = client
        .build_operate_record("test", "users", &key, &ops, &none, Encoding::Json)
        .unwrap();
    let view = client.parse_operate_record(execute(req)).unwrap();
    assert_eq!(view.bins["name"], BinValue::Str("Bob Roberts".to_string()));

    let req = client.build_get_record("test", "users", &key, &none, Encoding::Json);
    let record = client.parse_get_record(execute(req)).unwrap();
    assert_eq!(record.bins["name_length"], BinValue::Int(11));
    assert_eq!(record.bins["company"], BinValue::Str("Aerospike".to_string()));
    assert_eq!(record.generation, 2);
}

#[test]
fn update_only_operate_does_not_create() {
    let client = RestClient::new(&start_server());
    let key = UserKey::from("ghost");

    let ops = vec![Operation::list_append("interests", "sewing")];
    let req = client
        .build_operate_record(
            "test",
            "users",
            &key,
            &ops,
            &QueryParams::update_only(),
            Encoding::Json,
        )
        .unwrap();
    let err = client.parse_operate_record(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::RecordNotFound));

    // The failed precondition must not have created the record.
    let req = client.build_get_record("test", "users", &key, &QueryParams::none(), Encoding::Json);
    let err = client.parse_get_record(execute(req)).unwrap_err();
    assert!(matches!(err, ApiError::RecordNotFound));
}

#[test]
fn byte_bins_roundtrip_through_msgpack() {
    let client = RestClient::new(&start_server());
    let key = UserKey::from("mp");
    let none = QueryParams::none();

    let raw = vec![0u8, 1, 2, 3, 255];
    let stored = bins(vec![("ba", BinValue::Bytes(raw.clone()))]);

    // The builder must have switched the body to MessagePack on its own.
    let req = client
        .build_create_record("test", "demo", &key, &stored, &none)
        .unwrap();
    assert_eq!(
        req.headers,
        vec![("content-type".to_string(), "application/msgpack".to_string())]
    );
    client.parse_create_record(execute(req)).unwrap();

    // Packed read returns the exact original bytes.
    let req = client.build_get_record("test", "demo", &key, &none, Encoding::MsgPack);
    let record = client.parse_get_record(execute(req)).unwrap();
    assert_eq!(record.bins["ba"], BinValue::Bytes(raw));

    // A JSON read of the same record renders the bytes as base64 text.
    let req = client.build_get_record("test", "demo", &key, &none, Encoding::Json);
    let record = client.parse_get_record(execute(req)).unwrap();
    assert_eq!(record.bins["ba"], BinValue::Str("AAECA/8=".to_string()));
}
