//! Full request lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP through the default `ureq` transport.

use open311_core::{
    Field, Format, Jurisdiction, NewServiceRequest, Open311Client, ProtocolClient, ServiceRequest,
    ServiceRequestFilter,
};

fn start_server() -> std::net::SocketAddr {
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

    addr
}

fn local_toronto(addr: std::net::SocketAddr) -> Jurisdiction {
    Jurisdiction {
        endpoint: format!("http://{addr}/"),
        ..Jurisdiction::toronto(Some("testing".to_string()))
    }
}

#[test]
fn request_lifecycle() {
    let addr = start_server();
    let client = ProtocolClient::new(local_toronto(addr)).unwrap();

    // Step 1: services come from the live list, not the fallback.
    let codes = client.get_valid_service_codes();
    assert_eq!(codes, vec!["CSROWR-12", "CSROWC-05", "CSROSC-14"]);

    let definition = client.get_service_definition("CSROWR-12", Format::Json).unwrap();
    assert_eq!(definition["service_code"], "CSROWR-12");
    assert!(client.get_service_definition("NOPE", Format::Json).is_none());

    // Step 2: no requests yet. An empty array is not a valid response.
    assert!(client
        .get_all_service_requests(&ServiceRequestFilter::new(), Format::Json)
        .is_none());

    // Step 3: create a pothole report.
    let input = NewServiceRequest {
        description: "Deep pothole in the curb lane".to_string(),
        email: "resident@example.com".to_string(),
        ..NewServiceRequest::new("CSROWR-12", 43.6487, "-79.3817", "100 Queen St W")
    };
    let created = client.create_service_request(&input, Format::Json).unwrap().unwrap();
    let id = created.service_request_id().unwrap().as_str().unwrap().to_string();
    let token = created.token().unwrap().as_str().unwrap().to_string();

    // Step 4: resolve the token.
    let resolved = client.get_service_request_id_from_token(Some(&token), Format::Json);
    assert_eq!(resolved.as_ref().and_then(|v| v.as_str()), Some(id.as_str()));

    // Step 5: fetch by id.
    let fetched = client.get_service_request(Some(&id), Format::Json).unwrap();
    assert_eq!(fetched.get_str(Field::ServiceCode), Some("CSROWR-12"));
    assert_eq!(fetched.get_str(Field::Address), Some("100 Queen St W"));
    assert_eq!(fetched.get_str(Field::ServiceName), Some("Pothole"));
    assert_eq!(fetched.get_str(Field::Status), Some("open"));
    assert_eq!(fetched.get(Field::Latitude).and_then(|v| v.as_f64()), Some(43.6487));

    // Step 6: post a plain record as well.
    let record = ServiceRequest::from_value(
        serde_json::json!({
            "service_code": "CSROSC-14",
            "address": "1 King St W",
            "lat": 43.6489,
            "long": -79.3778
        }),
        None,
    )
    .unwrap();
    let second = client.post_service_request(&record, Format::Json).unwrap().unwrap();
    assert!(second.service_request_id().is_some());

    // Step 7: list with and without filters.
    let all = client
        .get_all_service_requests(&ServiceRequestFilter::new(), Format::Json)
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].get_str(Field::ServiceRequestId), Some(id.as_str()));

    let potholes = client
        .get_all_service_requests(
            &ServiceRequestFilter::new().service_code("CSROWR-12").status("open"),
            Format::Json,
        )
        .unwrap();
    assert_eq!(potholes.len(), 1);

    // An unsupported status is dropped, so this lists everything.
    let pending = client
        .get_all_service_requests(&ServiceRequestFilter::new().status("pending"), Format::Json)
        .unwrap();
    assert_eq!(pending.len(), 2);

    assert!(client
        .get_all_service_requests(&ServiceRequestFilter::new().status("closed"), Format::Json)
        .is_none());

    // Step 8: server-side rejection degrades to None.
    let rejected = client
        .create_service_request(
            &NewServiceRequest::new("BOGUS-1", 43.0, -79.0, "1 King St W"),
            Format::Json,
        )
        .unwrap();
    assert!(rejected.is_none());

    // Step 9: unknown ids and tokens degrade to None.
    assert!(client.get_service_request(Some("999999"), Format::Json).is_none());
    assert!(client
        .get_service_request_id_from_token(Some("unknown"), Format::Json)
        .is_none());
}

#[test]
fn wrong_jurisdiction_reads_nothing() {
    let addr = start_server();
    let jurisdiction = Jurisdiction::new(format!("http://{addr}"), "elsewhere.ca")
        .with_service_codes(vec!["FALLBACK-1".to_string()]);
    let client = ProtocolClient::new(jurisdiction).unwrap();

    assert!(client.list_services(Format::Json).is_none());
    assert_eq!(client.get_valid_service_codes(), vec!["FALLBACK-1"]);
}

#[test]
fn unreachable_server_falls_back() {
    // Bind then drop to get a port nothing is listening on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = ProtocolClient::new(local_toronto(addr)).unwrap();

    assert!(client.list_services(Format::Json).is_none());
    assert_eq!(
        client.get_valid_service_codes(),
        Jurisdiction::toronto(None).service_codes
    );

    let record = ServiceRequest::from_value(
        serde_json::json!({"service_code": "CSROWR-12", "address": "x", "lat": 1.0, "long": 2.0}),
        None,
    )
    .unwrap();
    assert!(client.post_service_request(&record, Format::Json).unwrap().is_none());
}
