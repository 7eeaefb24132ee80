//! IBGE and ViaCEP clients against in-process mocks of both APIs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use gazetteer::{Gazetteer, GazetteerConfig, IbgeClient, PostalCodeClient, PublicGazetteer};
use heat_common::{HeatError, UNAVAILABLE};
use test_utils::fixtures::{ibge_aggregate_json, ibge_municipality_json, municipality, viacep_json};

#[derive(Default)]
struct MockIbge {
    /// Answer direct name lookups with `[]`, as the live API does.
    names_unsupported: bool,
    /// Fail the aggregates endpoint with 500.
    aggregates_down: bool,
    paths: Mutex<Vec<String>>,
}

async fn municipality_by_key(State(mock): State<Arc<MockIbge>>, Path(key): Path<String>) -> Response {
    mock.paths.lock().unwrap().push(format!("municipios/{key}"));
    if key == municipality::IBGE_ID.to_string() {
        return Json(ibge_municipality_json(municipality::IBGE_ID, municipality::NAME)).into_response();
    }
    if key == municipality::NAME && !mock.names_unsupported {
        return Json(ibge_municipality_json(municipality::IBGE_ID, municipality::NAME)).into_response();
    }
    Json(json!([])).into_response()
}

async fn municipality_list(State(mock): State<Arc<MockIbge>>) -> Response {
    mock.paths.lock().unwrap().push("municipios".into());
    Json(json!([
        { "id": 3509502, "nome": "Campinas" },
        { "id": municipality::IBGE_ID, "nome": municipality::NAME },
    ]))
    .into_response()
}

async fn aggregate(
    State(mock): State<Arc<MockIbge>>,
    Path((aggregate, period, variable)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    mock.paths
        .lock()
        .unwrap()
        .push(format!("agregados/{aggregate}/{period}/{variable}"));
    if mock.aggregates_down {
        return (StatusCode::INTERNAL_SERVER_ERROR, "unavailable").into_response();
    }
    assert_eq!(query.get("localidades").map(String::as_str), Some("N6[3599999]"));
    match (aggregate.as_str(), variable.as_str()) {
        ("6579", "9324") => Json(ibge_aggregate_json("123456")).into_response(),
        ("1301", "615") => Json(ibge_aggregate_json("412.5")).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn viacep(Path(cep): Path<String>) -> Response {
    match cep.as_str() {
        "13015904" => Json(viacep_json("13015-904", "Campinas", "SP")).into_response(),
        "99999999" => Json(json!({ "erro": true })).into_response(),
        "88888888" => Json(json!({ "erro": "true" })).into_response(),
        _ => (StatusCode::BAD_REQUEST, "bad request").into_response(),
    }
}

async fn serve(mock: MockIbge) -> (Arc<MockIbge>, String) {
    let mock = Arc::new(mock);
    let app = Router::new()
        .route("/api/v1/localidades/municipios", get(municipality_list))
        .route("/api/v1/localidades/municipios/:key", get(municipality_by_key))
        .route(
            "/api/v3/agregados/:aggregate/periodos/:period/variaveis/:variable",
            get(aggregate),
        )
        .route("/ws/:cep/json/", get(viacep))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (mock, format!("http://{addr}"))
}

#[tokio::test]
async fn test_direct_lookup_strips_state_suffix() {
    let (mock, url) = serve(MockIbge::default()).await;
    let ibge = IbgeClient::new(&url).unwrap();

    let found = ibge.find_municipality("Quadrópolis - SP").await.unwrap();
    assert_eq!(found.id, municipality::IBGE_ID);
    assert_eq!(*mock.paths.lock().unwrap(), vec![format!("municipios/{}", municipality::NAME)]);
}

#[tokio::test]
async fn test_fallback_scan_is_case_insensitive() {
    let (mock, url) = serve(MockIbge {
        names_unsupported: true,
        ..Default::default()
    })
    .await;
    let ibge = IbgeClient::new(&url).unwrap();

    let found = ibge.find_municipality("quadrÓpolis").await.unwrap();
    assert_eq!(found.id, municipality::IBGE_ID);
    assert_eq!(found.nome, municipality::NAME);

    let paths = mock.paths.lock().unwrap().clone();
    assert_eq!(
        paths,
        vec![
            "municipios/quadrÓpolis".to_string(),
            "municipios".to_string(),
            format!("municipios/{}", municipality::IBGE_ID),
        ]
    );
}

#[tokio::test]
async fn test_unknown_municipality() {
    let (_mock, url) = serve(MockIbge {
        names_unsupported: true,
        ..Default::default()
    })
    .await;
    let ibge = IbgeClient::new(&url).unwrap();

    let err = ibge.find_municipality("Atlantis").await.unwrap_err();
    assert!(matches!(err, HeatError::MunicipalityNotFound(ref n) if n == "Atlantis"));
    assert_eq!(err.http_status_code(), 404);
}

#[tokio::test]
async fn test_city_profile() {
    let (_mock, url) = serve(MockIbge::default()).await;
    let ibge = IbgeClient::new(&url).unwrap();

    let profile = ibge.city_profile(municipality::NAME).await.unwrap();
    assert_eq!(profile.ibge_id, municipality::IBGE_ID);
    assert_eq!(profile.micro_region, "Campinas");
    assert_eq!(profile.meso_region, "Campinas");
    assert_eq!(profile.state, "SP");
    assert_eq!(profile.region, "Sudeste");
    assert_eq!(profile.population, "123456");
    assert_eq!(profile.area, "412.5");
    assert!(profile.has_statistics());
}

#[tokio::test]
async fn test_statistics_failures_use_sentinel() {
    let (_mock, url) = serve(MockIbge {
        aggregates_down: true,
        ..Default::default()
    })
    .await;
    let ibge = IbgeClient::new(&url).unwrap();

    let profile = ibge.city_profile(municipality::NAME).await.unwrap();
    assert_eq!(profile.population, UNAVAILABLE);
    assert_eq!(profile.area, UNAVAILABLE);
}

#[tokio::test]
async fn test_postal_code_lookup() {
    let (_mock, url) = serve(MockIbge::default()).await;
    let postal = PostalCodeClient::new(&url).unwrap();

    let address = postal.lookup("13015-904").await.unwrap();
    assert_eq!(address.locality, "Campinas");
    assert_eq!(address.state, "SP");
    assert_eq!(address.ibge_id.as_deref(), Some("3509502"));
    assert_eq!(address.municipality_label(), "Campinas - SP");
}

#[tokio::test]
async fn test_postal_code_not_found() {
    let (_mock, url) = serve(MockIbge::default()).await;
    let postal = PostalCodeClient::new(&url).unwrap();

    for cep in ["99999-999", "88888888"] {
        let err = postal.lookup(cep).await.unwrap_err();
        assert!(matches!(err, HeatError::PostalCodeNotFound(_)), "{cep}");
    }

    let err = postal.lookup("12345678").await.unwrap_err();
    assert!(matches!(err, HeatError::Upstream { status: Some(400), .. }));
}

#[tokio::test]
async fn test_public_gazetteer_shares_client() {
    let (_mock, url) = serve(MockIbge::default()).await;
    let config = GazetteerConfig {
        ibge_url: url.clone(),
        viacep_url: url,
        ..Default::default()
    };
    let gazetteer: Arc<dyn Gazetteer> = Arc::new(PublicGazetteer::new(&config).unwrap());

    assert_eq!(gazetteer.city_profile(municipality::NAME).await.unwrap().state, "SP");
    assert_eq!(gazetteer.postal_code("13015904").await.unwrap().locality, "Campinas");
}
