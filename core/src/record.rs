//! Open311 payload records.
//!
//! # Design
//! Open311 deployments add their own keys to service requests, so records are
//! open JSON objects rather than fixed structs. `Field` names the keys the
//! protocol defines; every accessor takes `impl AsRef<str>`, so callers can
//! use either a `Field` or a raw key for server extensions.
//!
//! A stored value that is blank (`null`, `""`, `[]`, `{}`) reads back as
//! `None`, exactly like an absent key.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Open311Error;

/// Keys defined by the Open311 GeoReport v2 service request schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    AccountId,
    AddressId,
    Address,
    AgencyResponsible,
    Description,
    DeviceId,
    Email,
    ExpectedDatetime,
    FirstName,
    LastName,
    Latitude,
    Longitude,
    MediaUrl,
    Phone,
    RequestedDatetime,
    ServiceCode,
    ServiceName,
    ServiceNotice,
    ServiceRequestId,
    Status,
    StatusNotes,
    UpdatedDatetime,
    Zipcode,
}

impl Field {
    pub const ALL: [Field; 23] = [
        Field::AccountId,
        Field::AddressId,
        Field::Address,
        Field::AgencyResponsible,
        Field::Description,
        Field::DeviceId,
        Field::Email,
        Field::ExpectedDatetime,
        Field::FirstName,
        Field::LastName,
        Field::Latitude,
        Field::Longitude,
        Field::MediaUrl,
        Field::Phone,
        Field::RequestedDatetime,
        Field::ServiceCode,
        Field::ServiceName,
        Field::ServiceNotice,
        Field::ServiceRequestId,
        Field::Status,
        Field::StatusNotes,
        Field::UpdatedDatetime,
        Field::Zipcode,
    ];

    /// The wire name of the field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Field::AccountId => "account_id",
            Field::AddressId => "address_id",
            Field::Address => "address",
            Field::AgencyResponsible => "agency_responsible",
            Field::Description => "description",
            Field::DeviceId => "device_id",
            Field::Email => "email",
            Field::ExpectedDatetime => "expected_datetime",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Latitude => "lat",
            Field::Longitude => "long",
            Field::MediaUrl => "media_url",
            Field::Phone => "phone",
            Field::RequestedDatetime => "requested_datetime",
            Field::ServiceCode => "service_code",
            Field::ServiceName => "service_name",
            Field::ServiceNotice => "service_notice",
            Field::ServiceRequestId => "service_request_id",
            Field::Status => "status",
            Field::StatusNotes => "status_notes",
            Field::UpdatedDatetime => "updated_datetime",
            Field::Zipcode => "zipcode",
        }
    }

    /// Look up a field by its wire name.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl AsRef<str> for Field {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a value counts as missing for reads and validation.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn non_blank<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !is_blank(v))
}

/// One civic issue report, either received from or bound for the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    fields: Map<String, Value>,
    required: Vec<Field>,
}

impl ServiceRequest {
    /// Required fields when the jurisdiction does not override them.
    pub const DEFAULT_REQUIRED_FIELDS: &'static [Field] = &[Field::ServiceCode, Field::Address];

    /// Build a record from a decoded JSON value.
    ///
    /// `required` falls back to [`Self::DEFAULT_REQUIRED_FIELDS`] when `None`.
    pub fn from_value(value: Value, required: Option<&[Field]>) -> Result<Self, Open311Error> {
        match value {
            Value::Object(map) => Self::from_map(map, required),
            _ => Err(Open311Error::InvalidInput),
        }
    }

    pub fn from_map(fields: Map<String, Value>, required: Option<&[Field]>) -> Result<Self, Open311Error> {
        if fields.is_empty() {
            return Err(Open311Error::InvalidInput);
        }
        let record = Self {
            fields,
            required: required.unwrap_or(Self::DEFAULT_REQUIRED_FIELDS).to_vec(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the current fields against the required list this record was
    /// built with, naming the first missing field in list order.
    pub fn validate(&self) -> Result<(), Open311Error> {
        match self
            .required
            .iter()
            .find(|field| non_blank(&self.fields, field.as_str()).is_none())
        {
            Some(missing) => Err(Open311Error::MissingRequiredField(missing.to_string())),
            None => Ok(()),
        }
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        non_blank(&self.fields, key.as_ref())
    }

    /// String value of `key`; numbers and other non-string values yield `None`.
    pub fn get_str(&self, key: impl AsRef<str>) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Store `value` under `key` verbatim. No validation runs here.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<Value>) {
        self.fields.insert(key.as_ref().to_string(), value.into());
    }

    pub fn required_fields(&self) -> &[Field] {
        &self.required
    }

    pub fn to_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl Serialize for ServiceRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// The server's acknowledgment of a newly created service request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceRequestResponse {
    params: Map<String, Value>,
}

impl ServiceRequestResponse {
    pub const ACCOUNT_ID: &'static str = "account_id";
    pub const SERVICE_NOTICE: &'static str = "service_notice";
    pub const SERVICE_REQUEST_ID: &'static str = "service_request_id";
    pub const TOKEN: &'static str = "token";

    /// Wrap a decoded JSON value. Anything other than an object yields an
    /// empty response.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(params) => Self { params },
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        non_blank(&self.params, key.as_ref())
    }

    pub fn service_request_id(&self) -> Option<&Value> {
        self.get(Self::SERVICE_REQUEST_ID)
    }

    pub fn token(&self) -> Option<&Value> {
        self.get(Self::TOKEN)
    }

    pub fn service_notice(&self) -> Option<&Value> {
        self.get(Self::SERVICE_NOTICE)
    }

    pub fn account_id(&self) -> Option<&Value> {
        self.get(Self::ACCOUNT_ID)
    }

    pub fn to_map(&self) -> &Map<String, Value> {
        &self.params
    }
}

impl Serialize for ServiceRequestResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.params.serialize(serializer)
    }
}
