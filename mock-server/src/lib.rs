use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const JURISDICTION_ID: &str = "toronto.ca";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub service_code: String,
    pub service_name: String,
    pub description: String,
    pub metadata: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub keywords: String,
    pub group: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoredRequest {
    pub service_request_id: String,
    #[serde(skip)]
    pub token: String,
    pub status: String,
    pub service_code: String,
    pub service_name: String,
    pub address: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Default)]
pub struct Store {
    pub services: Vec<Service>,
    pub requests: Vec<StoredRequest>,
    next_id: u64,
}

pub type Db = Arc<RwLock<Store>>;

/// Services every fresh server offers.
pub fn default_services() -> Vec<Service> {
    [
        ("CSROWR-12", "Pothole", "Road - Pot hole"),
        ("CSROWC-05", "Graffiti - Road", "Road - Graffiti Complaint"),
        ("CSROSC-14", "Graffiti - Sidewalk", "Sidewalk - Graffiti Complaint"),
    ]
    .into_iter()
    .map(|(code, name, description)| Service {
        service_code: code.to_string(),
        service_name: name.to_string(),
        description: description.to_string(),
        metadata: false,
        kind: "realtime".to_string(),
        keywords: "road, graffiti".to_string(),
        group: "Transportation".to_string(),
    })
    .collect()
}

pub fn app() -> Router {
    app_with_services(default_services())
}

pub fn app_with_services(services: Vec<Service>) -> Router {
    let db: Db = Arc::new(RwLock::new(Store {
        services,
        requests: Vec::new(),
        next_id: 1000,
    }));
    Router::new()
        .route("/services.json", get(list_services))
        .route("/services/{file}", get(get_service))
        .route("/service_requests.json", get(list_requests).post(create_request))
        .route("/service_requests/{file}", get(get_request))
        .route("/tokens/{file}", get(get_token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type ApiError = (StatusCode, Json<Value>);

fn error(status: StatusCode, description: &str) -> ApiError {
    (
        status,
        Json(json!([{ "code": status.as_u16(), "description": description }])),
    )
}

fn strip_json(file: &str) -> Result<&str, ApiError> {
    file.strip_suffix(".json")
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "only the json format is supported"))
}

fn check_jurisdiction(params: &HashMap<String, String>) -> Result<(), ApiError> {
    match params.get("jurisdiction_id") {
        Some(id) if id == JURISDICTION_ID => Ok(()),
        _ => Err(error(StatusCode::BAD_REQUEST, "jurisdiction_id not provided or unknown")),
    }
}

async fn list_services(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Service>>, ApiError> {
    check_jurisdiction(&params)?;
    Ok(Json(db.read().await.services.clone()))
}

async fn get_service(
    State(db): State<Db>,
    Path(file): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    check_jurisdiction(&params)?;
    let code = strip_json(&file)?;
    let store = db.read().await;
    let service = store
        .services
        .iter()
        .find(|s| s.service_code == code)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "service_code not found"))?;
    Ok(Json(json!({ "service_code": service.service_code, "attributes": [] })))
}

async fn list_requests(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    check_jurisdiction(&params)?;
    let store = db.read().await;
    let matching: Vec<&StoredRequest> = store
        .requests
        .iter()
        .filter(|r| params.get("service_request_id").map_or(true, |id| *id == r.service_request_id))
        .filter(|r| params.get("service_code").map_or(true, |code| *code == r.service_code))
        .filter(|r| params.get("status").map_or(true, |status| *status == r.status))
        .collect();
    Ok(Json(json!({ "service_requests": matching })))
}

async fn create_request(
    State(db): State<Db>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    check_jurisdiction(&form)?;
    let field = |name: &str| form.get(name).filter(|v| !v.is_empty()).cloned();

    let mut store = db.write().await;
    let service_code = field("service_code").ok_or_else(|| error(StatusCode::BAD_REQUEST, "service_code missing"))?;
    let service_name = store
        .services
        .iter()
        .find(|s| s.service_code == service_code)
        .map(|s| s.service_name.clone())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "service_code not found"))?;
    let address = field("address").ok_or_else(|| error(StatusCode::BAD_REQUEST, "address missing"))?;

    let service_request_id = store.next_id.to_string();
    store.next_id += 1;

    let request = StoredRequest {
        service_request_id,
        token: Uuid::new_v4().simple().to_string(),
        status: "open".to_string(),
        service_code,
        service_name,
        address,
        lat: field("lat").and_then(|v| v.parse().ok()),
        long: field("long").and_then(|v| v.parse().ok()),
        description: field("description"),
        email: field("email"),
    };
    let body = json!([{
        "service_request_id": request.service_request_id,
        "token": request.token,
        "service_notice": "",
        "account_id": null
    }]);
    store.requests.push(request);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn get_request(
    State(db): State<Db>,
    Path(file): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    check_jurisdiction(&params)?;
    let id = strip_json(&file)?;
    let store = db.read().await;
    let request = store
        .requests
        .iter()
        .find(|r| r.service_request_id == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "service_request_id not found"))?;
    Ok(Json(json!({ "service_requests": [request] })))
}

async fn get_token(
    State(db): State<Db>,
    Path(file): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    check_jurisdiction(&params)?;
    let token = strip_json(&file)?;
    let store = db.read().await;
    let request = store
        .requests
        .iter()
        .find(|r| r.token == token)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "token not found"))?;
    Ok(Json(json!([{
        "service_request_id": request.service_request_id,
        "token": request.token
    }])))
}
