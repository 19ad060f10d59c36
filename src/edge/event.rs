//! CloudFront Lambda@Edge wire types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `{key, value}` header entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

impl CfHeader {
    /// Header entry with an explicit key.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }
}

/// Lower-case header name -> ordered values.
pub type CfHeaders = BTreeMap<String, Vec<CfHeader>>;

/// Inbound event delivered to the function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFrontEvent {
    #[serde(rename = "Records")]
    pub records: Vec<CloudFrontRecord>,
}

impl CloudFrontEvent {
    /// Event wrapping a single request.
    pub fn from_request(request: CfRequest) -> Self {
        Self {
            records: vec![CloudFrontRecord {
                cf: CfPayload {
                    config: None,
                    request,
                },
            }],
        }
    }

    /// The request of the first record.
    pub fn request(&self) -> Option<&CfRequest> {
        self.records.first().map(|r| &r.cf.request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFrontRecord {
    pub cf: CfPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CfConfig>,
    pub request: CfRequest,
}

/// Distribution metadata attached to the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfConfig {
    #[serde(default)]
    pub distribution_domain_name: String,
    #[serde(default)]
    pub distribution_id: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub request_id: String,
}

/// The viewer or origin request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    pub uri: String,
    pub method: String,
    #[serde(default)]
    pub querystring: String,
    #[serde(default)]
    pub headers: CfHeaders,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<CfBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<CfOrigin>,
}

impl CfRequest {
    /// First value of a header by lower-case name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(|h| h.value.as_str())
    }

    /// Replace a header with a single value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        self.headers
            .insert(name.clone(), vec![CfHeader::new(name, value)]);
    }
}

/// Encoding flag of an inbound body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    #[default]
    Base64,
    Text,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfBody {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub encoding: BodyEncoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub input_truncated: bool,
}

/// Backend the request is forwarded to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CfOrigin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<OriginTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<OriginTarget>,
}

impl CfOrigin {
    /// Custom headers of whichever origin is present.
    pub fn custom_headers(&self) -> Option<&CfHeaders> {
        self.s3
            .as_ref()
            .or(self.custom.as_ref())
            .map(|o| &o.custom_headers)
    }
}

/// Fields shared by S3 and custom origins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginTarget {
    pub domain_name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub custom_headers: CfHeaders,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
}

/// Generated response returned to CloudFront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfResponse {
    pub status: u16,
    pub status_description: String,
    pub headers: CfHeaders,
    pub body: String,
    pub body_encoding: String,
}

impl Default for CfResponse {
    fn default() -> Self {
        Self {
            status: 200,
            status_description: "OK".to_string(),
            headers: CfHeaders::new(),
            body: String::new(),
            body_encoding: "base64".to_string(),
        }
    }
}

/// What an entry point hands back to CloudFront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeOutcome {
    /// Forward the (possibly rewritten) request to the origin.
    Request(CfRequest),
    /// Reply directly with a generated response.
    Response(CfResponse),
}
