//! Open311 protocol client.
//!
//! # Design
//! `ProtocolClient` is jurisdiction-agnostic: a `Jurisdiction` supplies the
//! endpoint, id, key and record policy, and a `Transport` performs the I/O.
//! Each operation builds a relative path, sends it, checks the status, and
//! decodes the body into records.
//!
//! Read operations never return errors. Any transport failure, non-2xx
//! status, undecodable body or unexpected shape is logged and collapses into
//! `None` via `degrade`. Only caller mistakes are reported: bad configuration
//! at construction, and bad records in `post_service_request` /
//! `create_service_request`.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::Open311Config;
use crate::error::{Open311Error, TransportError};
use crate::http::{HttpResponse, Transport, UreqTransport};
use crate::jurisdiction::Jurisdiction;
use crate::record::{is_blank, Field, ServiceRequest, ServiceRequestResponse};

pub const COMMAND_SERVICE_REQUESTS: &str = "service_requests";
pub const COMMAND_SERVICES: &str = "services";
pub const COMMAND_TOKENS: &str = "tokens";

pub const PARAM_API_KEY: &str = "api_key";
pub const PARAM_END_DATE: &str = "end_date";
pub const PARAM_JURISDICTION_ID: &str = "jurisdiction_id";
pub const PARAM_SERVICE_CODE: &str = "service_code";
pub const PARAM_SERVICE_REQUEST_ID: &str = "service_request_id";
pub const PARAM_START_DATE: &str = "start_date";
pub const PARAM_STATUS: &str = "status";

pub const LABEL_SERVICE_REQUESTS: &str = "service_requests";
pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";

/// W3C date-time profile, e.g. `2024-01-01T00:00:00+00:00`.
const W3C_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Response format suffix appended to every command.
///
/// Only JSON bodies are decoded; an XML call reaches the server but its
/// response reads back as no result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    pub const fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

/// A date filter, either a timestamp or text sent as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateParam {
    DateTime(DateTime<FixedOffset>),
    Raw(String),
}

impl DateParam {
    pub fn to_wire(&self) -> String {
        match self {
            DateParam::DateTime(dt) => dt.format(W3C_DATETIME).to_string(),
            DateParam::Raw(text) => text.clone(),
        }
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DateParam {
    fn from(dt: DateTime<Tz>) -> Self {
        DateParam::DateTime(dt.fixed_offset())
    }
}

impl From<&str> for DateParam {
    fn from(text: &str) -> Self {
        DateParam::Raw(text.to_string())
    }
}

impl From<String> for DateParam {
    fn from(text: String) -> Self {
        DateParam::Raw(text)
    }
}

/// Filters for `get_all_service_requests`. Unset and blank filters are not
/// sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRequestFilter {
    pub service_request_id: Option<String>,
    pub service_code: Option<String>,
    pub start_date: Option<DateParam>,
    pub end_date: Option<DateParam>,
    /// Sent only when exactly `open` or `closed`.
    pub status: Option<String>,
}

impl ServiceRequestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_request_id(mut self, id: impl Into<String>) -> Self {
        self.service_request_id = Some(id.into());
        self
    }

    pub fn service_code(mut self, code: impl Into<String>) -> Self {
        self.service_code = Some(code.into());
        self
    }

    pub fn start_date(mut self, date: impl Into<DateParam>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn end_date(mut self, date: impl Into<DateParam>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Query parameters in wire order, without blanks.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let status = self
            .status
            .clone()
            .filter(|s| s == STATUS_OPEN || s == STATUS_CLOSED);

        [
            (PARAM_SERVICE_REQUEST_ID, self.service_request_id.clone()),
            (PARAM_SERVICE_CODE, self.service_code.clone()),
            (PARAM_START_DATE, self.start_date.as_ref().map(DateParam::to_wire)),
            (PARAM_END_DATE, self.end_date.as_ref().map(DateParam::to_wire)),
            (PARAM_STATUS, status),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v)))
        .collect()
    }
}

/// Input for `create_service_request`.
///
/// `lat` and `long` accept numbers or numeric text; anything else is sent
/// as null and then fails the jurisdiction's required-field check if
/// coordinates are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewServiceRequest {
    pub service_code: String,
    pub lat: Value,
    pub long: Value,
    pub address: String,
    pub address_id: String,
    pub email: String,
    pub device_id: String,
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub description: String,
    pub media_url: String,
}

impl NewServiceRequest {
    pub fn new(
        service_code: impl Into<String>,
        lat: impl Into<Value>,
        long: impl Into<Value>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            service_code: service_code.into(),
            lat: lat.into(),
            long: long.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    /// The full field mapping, blanks included.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(Field::ServiceCode.to_string(), Value::from(self.service_code.clone()));
        map.insert(Field::Latitude.to_string(), coerce_coordinate(&self.lat));
        map.insert(Field::Longitude.to_string(), coerce_coordinate(&self.long));
        map.insert(Field::Address.to_string(), Value::from(self.address.clone()));
        for (field, value) in [
            (Field::AddressId, &self.address_id),
            (Field::Email, &self.email),
            (Field::DeviceId, &self.device_id),
            (Field::AccountId, &self.account_id),
            (Field::FirstName, &self.first_name),
            (Field::LastName, &self.last_name),
            (Field::Phone, &self.phone),
            (Field::Description, &self.description),
            (Field::MediaUrl, &self.media_url),
        ] {
            map.insert(field.to_string(), Value::from(value.clone()));
        }
        map
    }
}

/// Numbers pass through; numeric text becomes an integer when it is one and a
/// float otherwise.
fn coerce_coordinate(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(n.clone()),
        Value::String(s) => {
            let text = s.trim();
            match text.parse::<i64>() {
                Ok(int) => Value::from(int),
                Err(_) => text
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number),
            }
        }
        _ => Value::Null,
    }
}

/// The operations every Open311 client offers.
pub trait Open311Client {
    /// Raw service list, or `None` on any failure.
    fn list_services(&self, format: Format) -> Option<Value>;

    /// Raw definition of one service, or `None` on any failure.
    fn get_service_definition(&self, service_code: &str, format: Format) -> Option<Value>;

    /// Resolve a creation token into a service request id. A blank token
    /// returns `None` without a call.
    fn get_service_request_id_from_token(&self, token: Option<&str>, format: Format) -> Option<Value>;

    /// Fetch one request by id. A blank id returns `None` without a call.
    fn get_service_request(&self, service_request_id: Option<&str>, format: Format) -> Option<ServiceRequest>;

    /// Fetch every request matching `filter`. One invalid record discards the
    /// whole result.
    fn get_all_service_requests(
        &self,
        filter: &ServiceRequestFilter,
        format: Format,
    ) -> Option<Vec<ServiceRequest>>;

    /// Submit a record.
    ///
    /// # Errors
    /// `InvalidServiceRequest` if the record no longer satisfies its required
    /// fields. Server-side failures are `Ok(None)`.
    fn post_service_request(
        &self,
        request: &ServiceRequest,
        format: Format,
    ) -> Result<Option<ServiceRequestResponse>, Open311Error>;

    /// Build a record with the jurisdiction's required fields and submit it.
    ///
    /// # Errors
    /// `MissingRequiredField` if the assembled record is incomplete.
    fn create_service_request(
        &self,
        input: &NewServiceRequest,
        format: Format,
    ) -> Result<Option<ServiceRequestResponse>, Open311Error>;

    /// Service codes from the live list, or the jurisdiction's fallback list
    /// when the live list is unavailable or has none.
    fn get_valid_service_codes(&self) -> Vec<String>;
}

/// Generic Open311 engine, parameterized by transport.
pub struct ProtocolClient<T = UreqTransport> {
    jurisdiction: Jurisdiction,
    transport: T,
}

impl ProtocolClient<UreqTransport> {
    /// Create a client with the default `ureq` transport bound to the
    /// jurisdiction's endpoint.
    ///
    /// # Errors
    /// `InvalidConfiguration` for a blank endpoint or jurisdiction id;
    /// `Transport` if the endpoint is not a usable URL.
    pub fn new(jurisdiction: Jurisdiction) -> Result<Self, Open311Error> {
        check_configuration(&jurisdiction)?;
        let transport = UreqTransport::new(&jurisdiction.endpoint, jurisdiction.timeout)?;
        Ok(Self::assemble(jurisdiction, transport))
    }

    /// # Errors
    /// As [`Self::new`], plus config validation errors.
    pub fn from_config(config: Open311Config) -> Result<Self, Open311Error> {
        Self::new(config.into_jurisdiction()?)
    }
}

impl<T: Transport> ProtocolClient<T> {
    /// Create a client around an existing transport.
    ///
    /// # Errors
    /// `InvalidConfiguration` for a blank endpoint or jurisdiction id.
    pub fn with_transport(jurisdiction: Jurisdiction, transport: T) -> Result<Self, Open311Error> {
        check_configuration(&jurisdiction)?;
        Ok(Self::assemble(jurisdiction, transport))
    }

    fn assemble(jurisdiction: Jurisdiction, transport: T) -> Self {
        info!(
            endpoint = %jurisdiction.endpoint,
            jurisdiction_id = %jurisdiction.jurisdiction_id,
            "Open311 client ready"
        );
        Self { jurisdiction, transport }
    }

    pub fn jurisdiction(&self) -> &Jurisdiction {
        &self.jurisdiction
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn required_fields(&self) -> Option<&[Field]> {
        self.jurisdiction.required_fields.as_deref()
    }

    /// `<command>.<format>?<jurisdiction_id and params>`.
    pub fn build_get_path(
        &self,
        command: &str,
        format: Format,
        params: &[(&str, String)],
    ) -> Result<String, Open311Error> {
        let path = command_path(command, format)?;
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        query.push((PARAM_JURISDICTION_ID, self.jurisdiction.jurisdiction_id.as_str()));
        query.extend(
            params
                .iter()
                .filter(|(name, _)| *name != PARAM_JURISDICTION_ID)
                .map(|(name, value)| (*name, value.as_str())),
        );
        let query = serde_urlencoded::to_string(query).map_err(|e| TransportError::Encode(e.to_string()))?;
        Ok(format!("{path}?{query}"))
    }

    /// Standard POST parameters overlaid by `fields`; `fields` wins on
    /// collision.
    pub fn build_post_form(&self, fields: &Map<String, Value>) -> Map<String, Value> {
        let mut form = Map::new();
        form.insert(
            PARAM_JURISDICTION_ID.to_string(),
            Value::from(self.jurisdiction.jurisdiction_id.clone()),
        );
        if let Some(api_key) = self.jurisdiction.api_key.as_deref().filter(|k| !k.is_empty()) {
            form.insert(PARAM_API_KEY.to_string(), Value::from(api_key));
        }
        for (key, value) in fields {
            form.insert(key.clone(), value.clone());
        }
        form
    }

    fn get_json(&self, command: &str, format: Format, params: &[(&str, String)]) -> Result<Value, Open311Error> {
        let path = self.build_get_path(command, format, params)?;
        debug!(%path, "GET");
        let response = self.transport.get(&path)?;
        Ok(decode(&response)?)
    }

    fn post_json(&self, path: &str, form: &Map<String, Value>) -> Result<Value, Open311Error> {
        debug!(%path, "POST");
        let response = self.transport.post(path, form)?;
        Ok(decode(&response)?)
    }
}

impl<T: Transport> Open311Client for ProtocolClient<T> {
    fn list_services(&self, format: Format) -> Option<Value> {
        degrade("list_services", self.get_json(COMMAND_SERVICES, format, &[]))
    }

    fn get_service_definition(&self, service_code: &str, format: Format) -> Option<Value> {
        let command = format!("{COMMAND_SERVICES}/{}", urlencoding::encode(service_code));
        degrade("get_service_definition", self.get_json(&command, format, &[]))
    }

    fn get_service_request_id_from_token(&self, token: Option<&str>, format: Format) -> Option<Value> {
        let token = token.filter(|t| !t.is_empty())?;
        let command = format!("{COMMAND_TOKENS}/{}", urlencoding::encode(token));
        let result = self
            .get_json(&command, format, &[])
            .and_then(|body| Ok(response_array(body)?))
            .and_then(|items| {
                items
                    .into_iter()
                    .next()
                    .and_then(|first| first.get(PARAM_SERVICE_REQUEST_ID).filter(|v| !is_blank(v)).cloned())
                    .ok_or_else(|| malformed("token entry has no service_request_id"))
            });
        degrade("get_service_request_id_from_token", result)
    }

    fn get_service_request(&self, service_request_id: Option<&str>, format: Format) -> Option<ServiceRequest> {
        let id = service_request_id.filter(|id| !id.is_empty())?;
        let command = format!("{COMMAND_SERVICE_REQUESTS}/{}", urlencoding::encode(id));
        let result = self
            .get_json(&command, format, &[])
            .and_then(service_requests_array)
            .and_then(|items| {
                let first = items
                    .into_iter()
                    .next()
                    .ok_or_else(|| malformed("empty service_requests"))?;
                ServiceRequest::from_value(first, self.required_fields())
            });
        degrade("get_service_request", result)
    }

    fn get_all_service_requests(
        &self,
        filter: &ServiceRequestFilter,
        format: Format,
    ) -> Option<Vec<ServiceRequest>> {
        let params = filter.params();
        let result = self
            .get_json(COMMAND_SERVICE_REQUESTS, format, &params)
            .and_then(service_requests_array)
            .and_then(|items| {
                items
                    .into_iter()
                    .map(|item| ServiceRequest::from_value(item, self.required_fields()))
                    .collect::<Result<Vec<_>, _>>()
            });
        degrade("get_all_service_requests", result)
    }

    fn post_service_request(
        &self,
        request: &ServiceRequest,
        format: Format,
    ) -> Result<Option<ServiceRequestResponse>, Open311Error> {
        if let Err(err) = request.validate() {
            debug!(error = %err, "refusing to post invalid service request");
            return Err(Open311Error::InvalidServiceRequest);
        }

        let path = command_path(COMMAND_SERVICE_REQUESTS, format)?;
        let form = self.build_post_form(request.to_map());
        let result = self.post_json(&path, &form).and_then(|body| match body {
            Value::Array(items) => items
                .into_iter()
                .next()
                .filter(|first| !first.is_null())
                .map(ServiceRequestResponse::from_value)
                .ok_or_else(|| malformed("empty post response")),
            _ => Err(malformed("post response is not an array")),
        });
        Ok(degrade("post_service_request", result))
    }

    fn create_service_request(
        &self,
        input: &NewServiceRequest,
        format: Format,
    ) -> Result<Option<ServiceRequestResponse>, Open311Error> {
        let record = ServiceRequest::from_map(input.to_map(), self.required_fields())?;
        self.post_service_request(&record, format)
    }

    fn get_valid_service_codes(&self) -> Vec<String> {
        if let Some(Value::Array(services)) = self.list_services(Format::Json) {
            let codes: Vec<String> = services
                .iter()
                .filter_map(|service| service.get(PARAM_SERVICE_CODE))
                .filter(|code| !is_blank(code))
                .filter_map(|code| match code {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            if !codes.is_empty() {
                return codes;
            }
        }
        debug!("using fallback service codes");
        self.jurisdiction.service_codes.clone()
    }
}

fn check_configuration(jurisdiction: &Jurisdiction) -> Result<(), Open311Error> {
    if jurisdiction.endpoint.trim().is_empty() {
        return Err(Open311Error::InvalidConfiguration("endpoint".into()));
    }
    if jurisdiction.jurisdiction_id.trim().is_empty() {
        return Err(Open311Error::InvalidConfiguration("jurisdiction_id".into()));
    }
    Ok(())
}

fn command_path(command: &str, format: Format) -> Result<String, Open311Error> {
    if command.is_empty() || format.as_str().is_empty() {
        return Err(Open311Error::InvalidCommand);
    }
    Ok(format!("{command}.{}", format.as_str()))
}

/// Reject non-2xx responses, then decode the body.
fn decode(response: &HttpResponse) -> Result<Value, TransportError> {
    if !response.is_success() {
        return Err(TransportError::Status {
            status: response.status,
            body: response.body.clone(),
        });
    }
    response.json()
}

fn malformed(reason: &str) -> Open311Error {
    Open311Error::Transport(TransportError::Malformed(reason.to_string()))
}

/// A body is usable when it is an array whose first element is a non-empty
/// object. An empty array is rejected.
fn response_array(body: Value) -> Result<Vec<Value>, TransportError> {
    match body {
        Value::Array(items) if matches!(items.first(), Some(Value::Object(first)) if !first.is_empty()) => Ok(items),
        _ => Err(TransportError::Malformed(
            "expected a non-empty array of objects".to_string(),
        )),
    }
}

fn service_requests_array(body: Value) -> Result<Vec<Value>, Open311Error> {
    let list = match body {
        Value::Object(mut map) => map.remove(LABEL_SERVICE_REQUESTS),
        _ => None,
    }
    .ok_or_else(|| malformed("missing service_requests"))?;
    Ok(response_array(list)?)
}

/// Collapse a failed call into "no result", logging why.
fn degrade<R>(operation: &'static str, result: Result<R, Open311Error>) -> Option<R> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(operation, error = %err, "Open311 call returned no result");
            None
        }
    }
}
