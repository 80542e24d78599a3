use async_trait::async_trait;
use bytes::Bytes;
use graphql_http::{BoxError, Client, ClientConfig, Error, PathSegment, Request, Transport};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::CancellationToken;

const URL: &str = "http://graphql.test/graphql";

/// answers every request with a fixed status and body, recording what was sent
struct Recording {
    status: u16,
    body: &'static str,
    sent: Mutex<Vec<reqwest::Request>>,
}

impl Recording {
    fn new(status: u16, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sends(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn last_body(&self) -> Bytes {
        let sent = self.sent.lock().unwrap();
        let request = sent.last().expect("no request sent");
        Bytes::copy_from_slice(request.body().unwrap().as_bytes().unwrap())
    }

    fn last_header(&self, name: &str) -> Vec<String> {
        let sent = self.sent.lock().unwrap();
        let request = sent.last().expect("no request sent");
        request
            .headers()
            .get_all(name)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }
}

#[async_trait]
impl Transport for Recording {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        self.sent.lock().unwrap().push(request);
        let response = http::Response::builder()
            .status(self.status)
            .body(self.body)?;
        Ok(reqwest::Response::from(response))
    }
}

/// never answers
struct Hanging {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for Hanging {
    async fn send(&self, _request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// fails every send
struct Refusing;

#[async_trait]
impl Transport for Refusing {
    async fn send(&self, _request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

/// answers with the `id` variable echoed back as `data.x`
struct Echo;

#[async_trait]
impl Transport for Echo {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, BoxError> {
        let body: serde_json::Value =
            serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap_or_default())?;
        let reply = serde_json::json!({"data": {"x": body["variables"]["id"]}}).to_string();
        let response = http::Response::builder().status(200).body(reply)?;
        Ok(reqwest::Response::from(response))
    }
}

struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::other("read failed")))
    }
}

#[derive(Debug, Deserialize)]
struct X {
    x: i64,
}

fn client_with<T: Transport + 'static>(transport: T, multipart: bool) -> Client {
    Client::new(
        ClientConfig::new(URL)
            .with_transport(transport)
            .with_multipart_form(multipart),
    )
    .unwrap()
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn json_body_reflects_every_var() {
    let transport = Recording::new(200, r#"{"data": {"x": 1}}"#);
    let client = client_with(transport.clone(), false);

    let mut request = Request::new("query ($a: Int, $b: String) { x }");
    request.var("a", 1);
    request.var("b", "first");
    request.var("b", "second");
    client
        .run::<X>(&CancellationToken::new(), &mut request)
        .await
        .unwrap();

    let body: serde_json::Value = serde_json::from_slice(&transport.last_body()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "query": "query ($a: Int, $b: String) { x }",
            "variables": {"a": 1, "b": "second"},
        })
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn files_without_multipart_never_send() {
    let transport = Recording::new(200, r#"{"data": {"x": 1}}"#);
    let client = client_with(transport.clone(), false);

    let mut request = Request::new("mutation { upload }");
    request.file_bytes("file", "a.txt", "content");
    let err = client
        .run::<X>(&CancellationToken::new(), &mut request)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MultipartRequired));
    assert_eq!(transport.sends(), 0);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn cancelled_before_run_never_sends() {
    let transport = Recording::new(200, r#"{"data": {"x": 1}}"#);
    let client = client_with(transport.clone(), false);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client
        .run::<X>(&cancel, &mut Request::new("{ x }"))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(transport.sends(), 0);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn cancel_during_send() {
    let transport = Arc::new(Hanging {
        calls: AtomicUsize::new(0),
    });
    let client = client_with(transport.clone(), false);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = client
        .run::<X>(&cancel, &mut Request::new("{ x }"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn success_with_empty_error_list() {
    let transport = Recording::new(200, r#"{"data":{"x":1},"errors":[]}"#);
    let client = client_with(transport, false);

    let response = client
        .run::<X>(&CancellationToken::new(), &mut Request::new("{ x }"))
        .await
        .unwrap();
    assert_eq!(response.data.unwrap().x, 1);
    assert!(response.errors.is_empty());
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn graphql_error_surfaces_first() {
    let transport = Recording::new(
        200,
        r#"{"data":null,"errors":[{"message":"not found","path":["item"]}]}"#,
    );
    let client = client_with(transport, false);

    let err = client
        .run::<X>(&CancellationToken::new(), &mut Request::new("{ item { x } }"))
        .await
        .unwrap_err();

    let first = err.first_graphql_error().expect("graphql error");
    assert_eq!(first.message.as_str(), Some("not found"));
    assert_eq!(err.to_string(), "graphql: not found");
    assert_eq!(err.graphql_errors().len(), 1);
    assert_eq!(
        err.graphql_errors()[0].path,
        vec![PathSegment::Field("item".to_string())]
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn status_500_with_non_json_body() {
    for multipart in [false, true] {
        let transport = Recording::new(500, "<html>internal server error</html>");
        let client = client_with(transport, multipart);

        let err = client
            .run::<X>(&CancellationToken::new(), &mut Request::new("{ x }"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, Error::Status { .. }));
    }
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn malformed_ok_body_is_decode_error() {
    let transport = Recording::new(200, "not json");
    let client = client_with(transport, false);

    let err = client
        .run::<X>(&CancellationToken::new(), &mut Request::new("{ x }"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn transport_error_is_returned_verbatim() {
    let client = client_with(Refusing, false);

    let err = client
        .run::<X>(&CancellationToken::new(), &mut Request::new("{ x }"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "connection refused");
    match err {
        Error::Transport(source) => {
            let io = source.downcast_ref::<std::io::Error>().unwrap();
            assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn request_headers_are_additive() {
    let transport = Recording::new(200, r#"{"data": {"x": 1}}"#);
    let client = client_with(transport.clone(), false);

    let mut request = Request::new("{ x }");
    request
        .headers_mut()
        .append("x-test", HeaderValue::from_static("a"));
    request
        .headers_mut()
        .append("x-test", HeaderValue::from_static("b"));
    client
        .run::<X>(&CancellationToken::new(), &mut request)
        .await
        .unwrap();

    assert_eq!(transport.last_header("x-test"), vec!["a", "b"]);
    assert_eq!(
        transport.last_header(CONTENT_TYPE.as_str()),
        vec!["application/json; charset=utf-8"]
    );
    assert_eq!(
        transport.last_header(ACCEPT.as_str()),
        vec!["application/json; charset=utf-8"]
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn multipart_round_trip() {
    let transport = Recording::new(200, r#"{"data": {"x": 1}}"#);
    let client = client_with(transport.clone(), true);

    let query = "mutation ($file: Upload!, $key: String) { upload(file: $file, key: $key) }";
    let content: &[u8] = b"\x00\x01binary\r\n--payload";
    let mut request = Request::new(query);
    request.var("key", "value");
    request.file_bytes("file", "blob.bin", content);
    client
        .run::<X>(&CancellationToken::new(), &mut request)
        .await
        .unwrap();

    let content_type = transport.last_header(CONTENT_TYPE.as_str()).remove(0);
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let boundary = multer::parse_boundary(&content_type).unwrap();

    let body = transport.last_body();
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut form = multer::Multipart::new(stream, boundary);

    let mut fields = Vec::new();
    while let Some(field) = form.next_field().await.unwrap() {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap();
        fields.push((name, file_name, data));
    }

    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0].0.as_deref(), Some("query"));
    assert_eq!(fields[0].2, query.as_bytes());

    assert_eq!(fields[1].0.as_deref(), Some("variables"));
    let vars: serde_json::Value = serde_json::from_slice(&fields[1].2).unwrap();
    assert_eq!(vars, serde_json::json!({"key": "value"}));

    assert_eq!(fields[2].0.as_deref(), Some("file"));
    assert_eq!(fields[2].1.as_deref(), Some("blob.bin"));
    assert_eq!(fields[2].2, content);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn broken_attachment_fails_before_send() {
    let transport = Recording::new(200, r#"{"data": {"x": 1}}"#);
    let client = client_with(transport.clone(), true);

    let mut request = Request::new("mutation { upload }");
    request.file("file", "broken.bin", BrokenReader);
    let err = client
        .run::<X>(&CancellationToken::new(), &mut request)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Encode { .. }));
    assert_eq!(transport.sends(), 0);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn quoted_file_name_round_trips() {
    let transport = Recording::new(200, r#"{"data": {"x": 1}}"#);
    let client = client_with(transport.clone(), true);

    let mut request = Request::new("mutation ($file: Upload!) { upload(file: $file) }");
    request.file_bytes("file", r#"report "final"; v2.csv"#, "a,b");
    client
        .run::<X>(&CancellationToken::new(), &mut request)
        .await
        .unwrap();

    let content_type = transport.last_header(CONTENT_TYPE.as_str()).remove(0);
    let boundary = multer::parse_boundary(&content_type).unwrap();
    let body = transport.last_body();
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut form = multer::Multipart::new(stream, boundary);

    let mut files = Vec::new();
    while let Some(field) = form.next_field().await.unwrap() {
        if let Some(file_name) = field.file_name() {
            files.push((field.name().map(str::to_string), file_name.to_string()));
        }
    }
    assert_eq!(
        files,
        vec![(Some("file".to_string()), r#"report "final"; v2.csv"#.to_string())]
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn header_breaking_names_never_send() {
    let transport = Recording::new(200, r#"{"data": {"x": 1}}"#);
    let client = client_with(transport.clone(), true);

    let mut request = Request::new("mutation { upload }");
    request.file_bytes(
        "file",
        "a.txt\r\nContent-Type: text/html\r\n\r\n<script>",
        "content",
    );
    let err = client
        .run::<X>(&CancellationToken::new(), &mut request)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Encode { .. }));

    let mut request = Request::new("mutation { upload }");
    request.file_bytes("file\r\nX-Injected: yes", "a.txt", "content");
    let err = client
        .run::<X>(&CancellationToken::new(), &mut request)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Encode { .. }));

    assert_eq!(transport.sends(), 0);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn concurrent_runs_share_one_client() {
    let client = client_with(Echo, false);

    let mut handles = Vec::new();
    for id in 0..16i64 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let mut request = Request::new("query ($id: Int) { x }");
            request.var("id", id);
            let response = client
                .run::<X>(&CancellationToken::new(), &mut request)
                .await
                .unwrap();
            (id, response.data.unwrap().x)
        }));
    }

    for handle in handles {
        let (sent, received) = handle.await.unwrap();
        assert_eq!(sent, received);
    }
}
