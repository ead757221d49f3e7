use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_services, Service};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

// --- services ---

#[tokio::test]
async fn list_services_returns_defaults() {
    let resp = app()
        .oneshot(get_request("/services.json?jurisdiction_id=toronto.ca"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let services: Vec<Service> = body_json(resp).await;
    assert_eq!(services.len(), 3);
    assert_eq!(services[0].service_code, "CSROWR-12");
}

#[tokio::test]
async fn list_services_requires_jurisdiction() {
    let resp = app().oneshot(get_request("/services.json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: Value = body_json(resp).await;
    assert_eq!(errors[0]["code"], 400);
}

#[tokio::test]
async fn list_services_can_be_empty() {
    let resp = app_with_services(Vec::new())
        .oneshot(get_request("/services.json?jurisdiction_id=toronto.ca"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let services: Vec<Service> = body_json(resp).await;
    assert!(services.is_empty());
}

#[tokio::test]
async fn service_definition_found() {
    let resp = app()
        .oneshot(get_request("/services/CSROWR-12.json?jurisdiction_id=toronto.ca"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let definition: Value = body_json(resp).await;
    assert_eq!(definition["service_code"], "CSROWR-12");
}

#[tokio::test]
async fn service_definition_not_found() {
    let resp = app()
        .oneshot(get_request("/services/NOPE.json?jurisdiction_id=toronto.ca"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn xml_format_is_not_served() {
    let resp = app()
        .oneshot(get_request("/services/CSROWR-12.xml?jurisdiction_id=toronto.ca"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- service requests ---

#[tokio::test]
async fn create_request_returns_id_and_token() {
    let resp = app()
        .oneshot(form_request(
            "/service_requests.json",
            "jurisdiction_id=toronto.ca&service_code=CSROWR-12&address=1+King+St+W&lat=43.64&long=-79.38",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    assert_eq!(body[0]["service_request_id"], "1000");
    assert!(body[0]["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn create_request_rejects_unknown_service_code() {
    let resp = app()
        .oneshot(form_request(
            "/service_requests.json",
            "jurisdiction_id=toronto.ca&service_code=BOGUS&address=1+King+St+W",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_request_rejects_blank_address() {
    let resp = app()
        .oneshot(form_request(
            "/service_requests.json",
            "jurisdiction_id=toronto.ca&service_code=CSROWR-12&address=",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_request_not_found() {
    let resp = app()
        .oneshot(get_request("/service_requests/999.json?jurisdiction_id=toronto.ca"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn token_not_found() {
    let resp = app()
        .oneshot(get_request("/tokens/unknown.json?jurisdiction_id=toronto.ca"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_bytes(resp).await;
    assert!(!body.is_empty());
}

// --- full lifecycle ---

#[tokio::test]
async fn request_lifecycle() {
    use tower::Service as _;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "/service_requests.json",
            "jurisdiction_id=toronto.ca&service_code=CSROWC-05&address=1+King+St&description=Graffiti",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = body_json(resp).await;
    let id = created[0]["service_request_id"].as_str().unwrap().to_string();
    let token = created[0]["token"].as_str().unwrap().to_string();

    // resolve token
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/tokens/{token}.json?jurisdiction_id=toronto.ca")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resolved: Value = body_json(resp).await;
    assert_eq!(resolved[0]["service_request_id"], id.as_str());

    // get by id
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/service_requests/{id}.json?jurisdiction_id=toronto.ca")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = body_json(resp).await;
    let record = &fetched["service_requests"][0];
    assert_eq!(record["service_code"], "CSROWC-05");
    assert_eq!(record["service_name"], "Graffiti - Road");
    assert_eq!(record["description"], "Graffiti");
    assert_eq!(record["status"], "open");
    assert!(record.get("token").is_none());

    // list filtered by status
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/service_requests.json?jurisdiction_id=toronto.ca&status=open"))
        .await
        .unwrap();
    let listed: Value = body_json(resp).await;
    assert_eq!(listed["service_requests"].as_array().unwrap().len(), 1);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/service_requests.json?jurisdiction_id=toronto.ca&status=closed"))
        .await
        .unwrap();
    let listed: Value = body_json(resp).await;
    assert!(listed["service_requests"].as_array().unwrap().is_empty());

    // list filtered by service code
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(
            "/service_requests.json?jurisdiction_id=toronto.ca&service_code=CSROWR-12",
        ))
        .await
        .unwrap();
    let listed: Value = body_json(resp).await;
    assert!(listed["service_requests"].as_array().unwrap().is_empty());
}
