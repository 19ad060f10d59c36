//! Synthetic HTTP request handed to render functions.

use crate::edge::event::{BodyEncoding, CfRequest};
use crate::error::{EdgeError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::buf::Reader;
use bytes::{Buf, Bytes};
use hyper::Method;
use std::collections::HashMap;

/// Incoming request as seen by a render function.
#[derive(Debug, Clone)]
pub struct EdgeRequest {
    method: Method,
    url: String,
    headers: HashMap<String, String>,
    raw_headers: Vec<(String, String)>,
    body: Bytes,
}

impl EdgeRequest {
    /// Build from a CloudFront request.
    ///
    /// Only the first value of a multi-value header is surfaced in
    /// [`headers`](Self::headers); every value is kept in
    /// [`raw_headers`](Self::raw_headers).
    pub fn from_cloudfront(request: &CfRequest) -> Result<Self> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| EdgeError::InvalidEvent(format!("bad method `{}`", request.method)))?;

        let url = if request.querystring.is_empty() {
            request.uri.clone()
        } else {
            format!("{}?{}", request.uri, request.querystring)
        };

        let mut headers = HashMap::with_capacity(request.headers.len());
        let mut raw_headers = Vec::new();
        for (name, values) in &request.headers {
            for entry in values {
                let key = entry.key.clone().unwrap_or_else(|| name.clone());
                raw_headers.push((key, entry.value.clone()));
            }
            if let Some(first) = values.first() {
                headers.insert(name.to_ascii_lowercase(), first.value.clone());
            }
        }

        let body = match &request.body {
            Some(body) if !body.data.is_empty() => match body.encoding {
                BodyEncoding::Base64 => STANDARD
                    .decode(&body.data)
                    .map(Bytes::from)
                    .map_err(|e| EdgeError::InvalidEvent(format!("body is not base64: {e}")))?,
                BodyEncoding::Text => Bytes::from(body.data.clone()),
            },
            _ => Bytes::new(),
        };

        Ok(Self {
            method,
            url,
            headers,
            raw_headers,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path plus query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path without the query string.
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(p, _)| p)
    }

    /// Lower-case header name -> first value.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Every header entry in arrival order.
    pub fn raw_headers(&self) -> &[(String, String)] {
        &self.raw_headers
    }

    /// Case-insensitive header lookup.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Raw body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Readable byte stream over the body.
    pub fn reader(&self) -> Reader<Bytes> {
        self.body.clone().reader()
    }

    /// Body as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::event::{CfBody, CfHeader};
    use std::io::Read;

    fn cf_request() -> CfRequest {
        let mut request = CfRequest {
            uri: "/search".to_string(),
            method: "POST".to_string(),
            querystring: "q=rust".to_string(),
            ..Default::default()
        };
        request.headers.insert(
            "accept-language".to_string(),
            vec![CfHeader::new("Accept-Language", "en"), CfHeader::new("Accept-Language", "fr")],
        );
        request
    }

    #[test]
    fn test_url_includes_query_string() {
        let req = EdgeRequest::from_cloudfront(&cf_request()).unwrap();
        assert_eq!(req.url(), "/search?q=rust");
        assert_eq!(req.path(), "/search");
        assert_eq!(*req.method(), Method::POST);
    }

    #[test]
    fn test_first_header_value_is_surfaced() {
        let req = EdgeRequest::from_cloudfront(&cf_request()).unwrap();
        assert_eq!(req.get_header("Accept-Language"), Some("en"));
        assert_eq!(req.raw_headers().len(), 2);
        assert_eq!(req.raw_headers()[1], ("Accept-Language".to_string(), "fr".to_string()));
    }

    #[test]
    fn test_base64_body_is_decoded() {
        let mut request = cf_request();
        request.body = Some(CfBody {
            data: STANDARD.encode(r#"{"n":1}"#),
            ..Default::default()
        });
        let req = EdgeRequest::from_cloudfront(&request).unwrap();

        let mut buf = String::new();
        req.reader().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, r#"{"n":1}"#);
        let value: serde_json::Value = req.json().unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_text_body_is_kept() {
        let mut request = cf_request();
        request.body = Some(CfBody {
            data: "plain".to_string(),
            encoding: BodyEncoding::Text,
            ..Default::default()
        });
        let req = EdgeRequest::from_cloudfront(&request).unwrap();
        assert_eq!(req.text(), "plain");
    }

    #[test]
    fn test_invalid_base64_body() {
        let mut request = cf_request();
        request.body = Some(CfBody {
            data: "***".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            EdgeRequest::from_cloudfront(&request),
            Err(EdgeError::InvalidEvent(_))
        ));
    }
}
