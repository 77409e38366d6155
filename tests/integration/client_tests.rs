//! OMEIS client tests over real HTTP.
//!
//! A small axum app stands in for the OMEIS CGI so that query encoding,
//! line splitting and HTTP error mapping are exercised end to end.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use omeis_import::error::{ErrorKind, ImportError, OmeisError};
use omeis_import::{HttpTransport, OmeisClient, OmeisTransport, PixelsLayout};

use super::test_utils::sha1_hex;

const PIXELS_CONTENT: &[u8] = b"pixels";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmeisQuery {
    method: String,
    #[serde(rename = "FileID")]
    file_id: Option<u64>,
    #[serde(rename = "PixelsID")]
    pixels_id: Option<u64>,
    dims: Option<String>,
    is_signed: Option<u8>,
    is_float: Option<u8>,
}

type Requests = Arc<Mutex<Vec<String>>>;

async fn omeis_handler(
    State(requests): State<Requests>,
    Query(query): Query<OmeisQuery>,
) -> (StatusCode, String) {
    requests.lock().unwrap().push(query.method.clone());

    let ok = |body: &str| (StatusCode::OK, body.to_string());
    match (query.method.as_str(), query.file_id, query.pixels_id) {
        ("GetNativeEndian", _, _) => ok("Little\n"),
        ("FileInfo", Some(5), _) => ok("Name=f5.tif\nLength=10\nnot a pair\n"),
        ("FileInfo", Some(_), _) => ok(""),
        ("GetLocalPath", Some(5), _) => ok("/omeis/Files/5\n"),
        ("GetLocalPath", _, Some(42)) => ok("/omeis/Pixels/42\nextra\n"),
        ("GetLocalPath", _, _) => ok(""),
        ("NewPixels", _, _) => match (query.dims.as_deref(), query.is_signed, query.is_float) {
            (Some("4,3,2,1,1,2"), Some(0), Some(0)) => ok("42\n"),
            (Some("4,3,2,1,1,2"), Some(1), Some(0)) => ok("-1\n"),
            _ => (StatusCode::BAD_REQUEST, "bad dims".to_string()),
        },
        ("FinishPixels", _, Some(42)) => ok("43\n"),
        ("PixelsSHA1", _, Some(43)) => ok(&sha1_hex(PIXELS_CONTENT)),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "unknown method".to_string(),
        ),
    }
}

/// Start the mock OMEIS and return its CGI URL.
async fn spawn_omeis() -> (String, Requests) {
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/cgi-bin/omeis", get(omeis_handler))
        .with_state(requests.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/cgi-bin/omeis", addr), requests)
}

async fn client() -> (OmeisClient<HttpTransport>, Requests) {
    let (url, requests) = spawn_omeis().await;
    let transport = HttpTransport::new(&url, Duration::from_secs(5)).unwrap();
    (OmeisClient::new(transport), requests)
}

fn layout(is_signed: bool) -> PixelsLayout {
    PixelsLayout {
        size_x: 4,
        size_y: 3,
        size_z: 2,
        size_c: 1,
        size_t: 1,
        bytes_per_pixel: 2,
        is_signed,
        is_float: false,
    }
}

#[tokio::test]
async fn test_native_byte_order_case_insensitive() {
    let (client, _) = client().await;
    assert!(client.native_byte_order().await.unwrap());
}

#[tokio::test]
async fn test_file_info_and_local_path() {
    let (client, requests) = client().await;

    let info = client.file_info(5).await.unwrap();
    assert_eq!(info.get("Name").map(String::as_str), Some("f5.tif"));
    assert_eq!(info.get("Length").map(String::as_str), Some("10"));
    assert_eq!(info.len(), 2);

    assert_eq!(client.local_file_path(5).await.unwrap(), "/omeis/Files/5");
    assert_eq!(*requests.lock().unwrap(), ["FileInfo", "GetLocalPath"]);
}

#[tokio::test]
async fn test_missing_file() {
    let (client, _) = client().await;

    assert!(client.file_info(9).await.unwrap().is_empty());
    let err = client.local_file_path(9).await.unwrap_err();
    assert!(matches!(err, OmeisError::NotFound(_)));
}

#[tokio::test]
async fn test_pixels_lifecycle() {
    let (client, requests) = client().await;

    let pixels_id = client.new_pixels(&layout(false)).await.unwrap();
    assert_eq!(pixels_id, 42);

    // Extra lines are ignored
    assert_eq!(
        client.local_pixels_path(pixels_id).await.unwrap(),
        "/omeis/Pixels/42"
    );

    let finished = client.finish_pixels(pixels_id).await.unwrap();
    assert_eq!(finished, 43);
    assert_eq!(
        client.pixels_sha1(finished).await.unwrap(),
        sha1_hex(PIXELS_CONTENT)
    );

    assert_eq!(
        *requests.lock().unwrap(),
        ["NewPixels", "GetLocalPath", "FinishPixels", "PixelsSHA1"]
    );
}

#[tokio::test]
async fn test_non_positive_pixels_id_rejected() {
    let (client, _) = client().await;

    let err = client.new_pixels(&layout(true)).await.unwrap_err();
    match err {
        OmeisError::Protocol { method, message } => {
            assert_eq!(method, "NewPixels");
            assert!(message.contains("-1"));
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_is_transport_error() {
    let (client, _) = client().await;

    let err = client.pixels_sha1(7).await.unwrap_err();
    match &err {
        OmeisError::Transport { method, message } => {
            assert_eq!(method, "PixelsSHA1");
            assert!(message.contains("500"));
        }
        other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(ImportError::from(err).kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_unreachable_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport =
        HttpTransport::new(&format!("http://{}/omeis", addr), Duration::from_secs(2)).unwrap();
    let err = transport.call("GetNativeEndian", "").await.unwrap_err();
    assert!(matches!(err, OmeisError::Transport { .. }));
}

#[test]
fn test_invalid_base_url() {
    let result = HttpTransport::new("not a url", Duration::from_secs(1));
    assert!(matches!(result, Err(OmeisError::Transport { .. })));
}
