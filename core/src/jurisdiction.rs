//! Per-jurisdiction settings.
//!
//! A jurisdiction is data, not a subtype: the protocol client reads its
//! endpoint, id, key, required fields and fallback service codes from a
//! `Jurisdiction` value.

use std::time::Duration;

use crate::record::Field;

/// Graffiti on a city bridge.
pub const TORONTO_GRAFFITI_CITY_BRIDGE: &str = "CSROWBM-03";
/// Graffiti on a city litter bin.
pub const TORONTO_GRAFFITI_CITY_LITTER_BIN: &str = "SWLMALB-02";
/// Graffiti on a city road.
pub const TORONTO_GRAFFITI_CITY_ROAD: &str = "CSROWC-05";
/// Graffiti on a city sidewalk.
pub const TORONTO_GRAFFITI_CITY_SIDEWALK: &str = "CSROSC-14";
/// Pothole.
pub const TORONTO_POTHOLE: &str = "CSROWR-12";

pub const TORONTO_ENDPOINT: &str = "https://secure.toronto.ca/webwizard/ws";
pub const TORONTO_TEST_ENDPOINT: &str = "https://secure.toronto.ca/open311test/ws";
pub const TORONTO_JURISDICTION_ID: &str = "toronto.ca";

/// Connection and policy settings for one Open311 deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jurisdiction {
    pub endpoint: String,
    pub jurisdiction_id: String,
    pub api_key: Option<String>,
    /// `None` uses `ServiceRequest::DEFAULT_REQUIRED_FIELDS`.
    pub required_fields: Option<Vec<Field>>,
    /// Returned by `get_valid_service_codes` when the live list is unavailable.
    pub service_codes: Vec<String>,
    /// Passed to the default transport; ignored by injected ones.
    pub timeout: Option<Duration>,
}

impl Jurisdiction {
    pub fn new(endpoint: impl Into<String>, jurisdiction_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            jurisdiction_id: jurisdiction_id.into(),
            api_key: None,
            required_fields: None,
            service_codes: Vec::new(),
            timeout: None,
        }
    }

    /// The production toronto.ca deployment.
    pub fn toronto(api_key: Option<String>) -> Self {
        Self {
            endpoint: TORONTO_ENDPOINT.to_string(),
            jurisdiction_id: TORONTO_JURISDICTION_ID.to_string(),
            api_key,
            required_fields: Some(vec![
                Field::ServiceCode,
                Field::Address,
                Field::Latitude,
                Field::Longitude,
            ]),
            service_codes: [
                TORONTO_GRAFFITI_CITY_BRIDGE,
                TORONTO_GRAFFITI_CITY_LITTER_BIN,
                TORONTO_GRAFFITI_CITY_ROAD,
                TORONTO_GRAFFITI_CITY_SIDEWALK,
                TORONTO_POTHOLE,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            timeout: None,
        }
    }

    /// The toronto.ca test deployment; same policy as production.
    pub fn toronto_test(api_key: Option<String>) -> Self {
        Self {
            endpoint: TORONTO_TEST_ENDPOINT.to_string(),
            ..Self::toronto(api_key)
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_required_fields(mut self, fields: Vec<Field>) -> Self {
        self.required_fields = Some(fields);
        self
    }

    pub fn with_service_codes(mut self, codes: Vec<String>) -> Self {
        self.service_codes = codes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
