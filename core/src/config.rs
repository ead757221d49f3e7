//! File and environment configuration for a jurisdiction.
//!
//! Sources are merged in priority order (lowest to highest):
//! 1. Struct defaults
//! 2. A YAML file (if it exists)
//! 3. Environment variables with the `OPEN311_` prefix
//!
//! ```yaml
//! endpoint: https://secure.toronto.ca/open311test/ws
//! jurisdiction_id: toronto.ca
//! api_key: testing
//! required_fields: [service_code, address, lat, long]
//! timeout_secs: 30
//! ```

use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Open311Error;
use crate::jurisdiction::Jurisdiction;
use crate::record::Field;

pub const ENV_PREFIX: &str = "OPEN311_";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Open311Config {
    /// Base URL of the deployment (required).
    #[serde(default)]
    pub endpoint: String,

    /// Jurisdiction id sent with every call (required).
    #[serde(default)]
    pub jurisdiction_id: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Wire names of required service request fields. Empty keeps the
    /// record defaults.
    #[serde(default)]
    pub required_fields: Vec<String>,

    /// Fallback service codes.
    #[serde(default)]
    pub service_codes: Vec<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Open311Config {
    /// Load from `open311.yaml` in the working directory and the environment.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self, Open311Error> {
        Self::load_from("open311.yaml")
    }

    /// Load from a custom YAML path and the environment.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load_from(yaml_path: &str) -> Result<Self, Open311Error> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(yaml_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `InvalidConfiguration` naming the first bad value.
    pub fn validate(&self) -> Result<(), Open311Error> {
        if self.endpoint.trim().is_empty() {
            return Err(Open311Error::InvalidConfiguration("endpoint".into()));
        }
        if self.jurisdiction_id.trim().is_empty() {
            return Err(Open311Error::InvalidConfiguration("jurisdiction_id".into()));
        }
        if let Some(unknown) = self.required_fields.iter().find(|name| Field::from_name(name).is_none()) {
            return Err(Open311Error::InvalidConfiguration(format!(
                "required_fields contains unknown field '{unknown}'"
            )));
        }
        Ok(())
    }

    /// # Errors
    /// Returns `InvalidConfiguration` if the config does not validate.
    pub fn into_jurisdiction(self) -> Result<Jurisdiction, Open311Error> {
        self.validate()?;

        let required_fields = if self.required_fields.is_empty() {
            None
        } else {
            Some(self.required_fields.iter().filter_map(|name| Field::from_name(name)).collect())
        };

        Ok(Jurisdiction {
            endpoint: self.endpoint,
            jurisdiction_id: self.jurisdiction_id,
            api_key: self.api_key.filter(|key| !key.is_empty()),
            required_fields,
            service_codes: self.service_codes,
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}
