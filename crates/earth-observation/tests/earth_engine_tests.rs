//! Earth Engine REST client tests against an in-process mock of the API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use earth_observation::{EarthEngineClient, EarthEngineConfig, LayerFetcher, PipelineConfig, StaticToken};
use heat_common::HeatError;
use renderer::decode_data_uri;
use renderer::png::{create_png_auto, validate_png};

const PROJECT: &str = "demo-project";
const TOKEN: &str = "test-token";

#[derive(Default)]
struct MockEarthEngine {
    /// `result` of every `value:compute` call.
    boundary_matches: u64,
    /// Status returned by `value:compute`.
    compute_status: Option<StatusCode>,
    /// Thumbnail index whose pixels fail with 500.
    failing_thumbnail: Option<usize>,
    /// Respond to thumbnail creation without a name.
    omit_thumbnail_name: bool,
    thumbnails: AtomicUsize,
    requests: Mutex<Vec<Recorded>>,
}

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    authorization: Option<String>,
    body: Option<Value>,
}

impl MockEarthEngine {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn count(&self, suffix: &str) -> usize {
        self.requests().iter().filter(|r| r.path.ends_with(suffix)).count()
    }
}

fn tiny_png() -> Vec<u8> {
    let pixels = [
        0, 128, 0, 255, 255, 255, 255, 255, //
        0, 0, 0, 0, 0, 0, 255, 255,
    ];
    create_png_auto(&pixels, 2, 2).unwrap()
}

async fn handle(
    State(mock): State<Arc<MockEarthEngine>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    mock.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    });

    let project_prefix = format!("/v1/projects/{PROJECT}/");
    match (method, path.as_str()) {
        (Method::POST, p) if p == format!("{project_prefix}value:compute") => match mock.compute_status {
            Some(status) => (status, Json(json!({ "error": { "message": "caller lacks permission" } }))).into_response(),
            None => Json(json!({ "result": mock.boundary_matches })).into_response(),
        },
        (Method::POST, p) if p == format!("{project_prefix}thumbnails") => {
            let idx = mock.thumbnails.fetch_add(1, Ordering::SeqCst);
            if mock.omit_thumbnail_name {
                Json(json!({})).into_response()
            } else {
                Json(json!({ "name": format!("projects/{PROJECT}/thumbnails/t{idx}") })).into_response()
            }
        }
        (Method::GET, p) if p.ends_with(":getPixels") => {
            let idx: usize = p
                .trim_end_matches(":getPixels")
                .rsplit("/t")
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(usize::MAX);
            if mock.failing_thumbnail == Some(idx) {
                (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response()
            } else {
                ([("content-type", "image/png")], tiny_png()).into_response()
            }
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve(mock: MockEarthEngine) -> (Arc<MockEarthEngine>, LayerFetcher<EarthEngineClient>) {
    let mock = Arc::new(mock);
    let app = Router::new().fallback(handle).with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = EarthEngineConfig::new(PROJECT);
    config.base_url = format!("http://{addr}");
    let client = EarthEngineClient::new(config, Arc::new(StaticToken::new(TOKEN))).unwrap();
    (mock, LayerFetcher::new(client, PipelineConfig::default()))
}

#[tokio::test]
async fn test_bundle_over_rest_api() {
    let (mock, fetcher) = serve(MockEarthEngine {
        boundary_matches: 1,
        ..Default::default()
    })
    .await;

    let bundle = fetcher.fetch("Campinas").await.unwrap();
    for (kind, uri) in bundle.iter() {
        let (_, bytes) = decode_data_uri(uri).unwrap();
        assert_eq!(validate_png(&bytes).unwrap(), (2, 2), "{kind}");
    }

    assert_eq!(mock.count("value:compute"), 1);
    assert_eq!(mock.count("/thumbnails"), 4);
    assert_eq!(mock.count(":getPixels"), 4);

    let requests = mock.requests();
    let bearer = format!("Bearer {TOKEN}");
    assert!(requests.iter().all(|r| r.authorization.as_deref() == Some(bearer.as_str())));

    let compute = requests.iter().find(|r| r.path.ends_with("value:compute")).unwrap();
    let body = compute.body.as_ref().unwrap().to_string();
    assert!(body.contains("Collection.size"));
    assert!(body.contains("NM_MUN"));
    assert!(body.contains("Campinas"));

    let thumbs: Vec<&Recorded> = requests.iter().filter(|r| r.path.ends_with("/thumbnails")).collect();
    for thumb in &thumbs {
        assert_eq!(thumb.method, Method::POST);
        let body = thumb.body.as_ref().unwrap();
        assert_eq!(body["fileFormat"], "PNG");
        assert_eq!(
            body["expression"]["values"]["0"]["functionInvocationValue"]["functionName"],
            "Image.visualize"
        );
    }
    // Requested in layer order: NDVI first, infrastructure last.
    let first = thumbs[0].body.as_ref().unwrap().to_string();
    assert!(first.contains("Image.normalizedDifference"));
    let last = thumbs[3].body.as_ref().unwrap().to_string();
    assert!(last.contains("Image.paint") && last.contains("purple"));
}

#[tokio::test]
async fn test_zero_matches_is_boundary_not_found() {
    let (mock, fetcher) = serve(MockEarthEngine::default()).await;

    let err = fetcher.fetch("Atlantis").await.unwrap_err();
    assert!(matches!(err, HeatError::BoundaryNotFound(_)));
    assert_eq!(mock.count("/thumbnails"), 0);
}

#[tokio::test]
async fn test_failed_pixels_download_fails_bundle() {
    let (_mock, fetcher) = serve(MockEarthEngine {
        boundary_matches: 1,
        failing_thumbnail: Some(1),
        ..Default::default()
    })
    .await;

    let err = fetcher.fetch("Campinas").await.unwrap_err();
    match err {
        HeatError::ThumbnailFetch { layer, status } => {
            assert_eq!(layer, "LST");
            assert_eq!(status, 500);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_thumbnail_name() {
    let (_mock, fetcher) = serve(MockEarthEngine {
        boundary_matches: 1,
        omit_thumbnail_name: true,
        ..Default::default()
    })
    .await;

    let err = fetcher.fetch("Campinas").await.unwrap_err();
    assert!(matches!(err, HeatError::ThumbnailUnavailable { ref layer } if layer == "NDVI"));
}

#[tokio::test]
async fn test_forbidden_is_authentication_error() {
    let (_mock, fetcher) = serve(MockEarthEngine {
        compute_status: Some(StatusCode::FORBIDDEN),
        ..Default::default()
    })
    .await;

    let err = fetcher.fetch("Campinas").await.unwrap_err();
    assert!(matches!(err, HeatError::Authentication(ref m) if m == "caller lacks permission"));
}

#[tokio::test]
async fn test_city_map_over_rest_api() {
    let (mock, fetcher) = serve(MockEarthEngine {
        boundary_matches: 1,
        ..Default::default()
    })
    .await;

    let map = fetcher.city_map("Campinas").await.unwrap();
    assert!(map.map_data_uri.starts_with("data:image/png;base64,"));

    let thumb = mock
        .requests()
        .into_iter()
        .find(|r| r.path.ends_with("/thumbnails"))
        .unwrap();
    let body = thumb.body.unwrap().to_string();
    assert!(body.contains("COPERNICUS/S2_SR_HARMONIZED"));
    assert!(body.contains("CLOUDY_PIXEL_PERCENTAGE"));
}
