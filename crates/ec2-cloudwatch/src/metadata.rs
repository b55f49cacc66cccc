// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Instance identity document from the EC2 metadata service.
//!
//! The document is fetched once per run and handed to every later step as a plain value:
//!
//! ```json
//! {
//!   "instanceId": "i-0123456789abcdef0",
//!   "imageId": "ami-0abcdef1234567890",
//!   "instanceType": "t3.micro",
//!   "region": "eu-west-1",
//!   "availabilityZone": "eu-west-1a",
//!   "devpayProductCodes": null
//! }
//! ```
//!
//! Only string values are kept. A body that is not a JSON object is rejected with
//! [`MetadataError::Parse`].

use crate::error::MetadataError;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Identity document endpoint of the instance metadata service.
pub const DEFAULT_METADATA_URL: &str =
    "http://169.254.169.254/latest/dynamic/instance-identity/document";

pub const INSTANCE_ID_KEY: &str = "instanceId";
pub const IMAGE_ID_KEY: &str = "imageId";
pub const INSTANCE_TYPE_KEY: &str = "instanceType";
pub const REGION_KEY: &str = "region";
/// Not part of the identity document; set by the caller when reporting per-filesystem metrics.
pub const FILE_SYSTEM_KEY: &str = "fileSystem";

/// String fields describing the current instance. Absent keys are normal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceMetadata {
    fields: BTreeMap<String, String>,
}

impl InstanceMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a metadata document, keeping string-valued fields.
    pub fn from_json(body: &[u8]) -> Result<Self, MetadataError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| MetadataError::Parse(e.to_string()))?;

        let Value::Object(object) = value else {
            return Err(MetadataError::Parse(format!(
                "expected a JSON object, got {}",
                kind_of(&value)
            )));
        };

        let fields = object
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                other => {
                    debug!("Ignoring non-string metadata field {key}: {}", kind_of(&other));
                    None
                }
            })
            .collect();

        Ok(InstanceMetadata { fields })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Returns a copy carrying `fileSystem = label`.
    #[must_use]
    pub fn with_file_system(&self, label: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.insert(FILE_SYSTEM_KEY, label);
        copy
    }

    #[must_use]
    pub fn instance_id(&self) -> Option<&str> {
        self.get(INSTANCE_ID_KEY)
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.get(REGION_KEY)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InstanceMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        InstanceMetadata {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Client for the metadata service.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    endpoint: String,
    http: reqwest::Client,
}

impl MetadataClient {
    /// Creates a client for `endpoint`.
    ///
    /// The link-local metadata address is never reachable through a proxy, so proxy
    /// environment variables are ignored. No timeout is set beyond reqwest's defaults.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = match reqwest::Client::builder().no_proxy().build() {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to build metadata HTTP client: {e}, using reqwest defaults");
                reqwest::Client::new()
            }
        };
        MetadataClient {
            endpoint: endpoint.into(),
            http,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issues one GET to the endpoint and decodes the document.
    ///
    /// Connection failures, non-2xx statuses and body read failures are
    /// [`MetadataError::Network`]; undecodable bodies are [`MetadataError::Parse`].
    pub async fn fetch(&self) -> Result<InstanceMetadata, MetadataError> {
        debug!("Fetching instance metadata from {}", self.endpoint);
        let body = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(MetadataError::Network)?
            .bytes()
            .await
            .map_err(MetadataError::Network)?;

        let metadata = InstanceMetadata::from_json(&body)?;
        debug!("Fetched {} metadata fields", metadata.len());
        Ok(metadata)
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_URL)
    }
}

/// Fetches the identity document of the current instance.
pub async fn fetch_instance_metadata() -> Result<InstanceMetadata, MetadataError> {
    MetadataClient::default().fetch().await
}
