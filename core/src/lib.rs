//! Blocking client for the Open311 (GeoReport v2) civic issue API.
//!
//! # Overview
//! Lists service categories, submits service requests, looks requests up by
//! id or filter, and resolves creation tokens into request ids.
//!
//! # Design
//! - `ProtocolClient` holds a `Jurisdiction` (endpoint, id, key, record
//!   policy) and a `Transport`; there is one engine for every deployment.
//! - Records are open JSON objects validated against a required-field list
//!   at construction.
//! - Read operations return `Option`: every wire-level failure becomes
//!   `None`. Only configuration and record errors are returned as
//!   `Open311Error`.
//! - `mock::StubTransport` (behind `test-utils`) replaces the network in
//!   tests.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod jurisdiction;
pub mod record;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use client::{
    DateParam, Format, NewServiceRequest, Open311Client, ProtocolClient, ServiceRequestFilter,
};
pub use config::Open311Config;
pub use error::{Open311Error, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use jurisdiction::Jurisdiction;
pub use record::{Field, ServiceRequest, ServiceRequestResponse};
