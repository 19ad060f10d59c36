//! Synthetic HTTP response captured from render functions.

use crate::edge::event::{CfHeader, CfResponse};
use crate::edge::headers::{HeaderValue, ResponseHeaders};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::BytesMut;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tokio::sync::oneshot;
use tracing::warn;

/// Response under construction by a render function.
///
/// [`end`](Self::end) consumes the response, so it cannot be ended twice or
/// touched after it was sent.
#[derive(Debug)]
pub struct EdgeResponse {
    status: u16,
    status_message: Option<String>,
    headers: ResponseHeaders,
    platform_headers: ResponseHeaders,
    body: BytesMut,
    gzip: bool,
    sender: oneshot::Sender<CfResponse>,
}

impl EdgeResponse {
    pub(crate) fn new(gzip: bool, sender: oneshot::Sender<CfResponse>) -> Self {
        Self {
            status: 200,
            status_message: None,
            headers: ResponseHeaders::new(),
            platform_headers: ResponseHeaders::new(),
            body: BytesMut::new(),
            gzip,
            sender,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn set_status_code(&mut self, status: u16) {
        self.status = status;
    }

    /// Override the status text sent with the response.
    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Set the status and merge `headers` into the header map.
    pub fn write_head<I, K, V>(&mut self, status: u16, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<HeaderValue>,
    {
        self.status = status;
        for (name, value) in headers {
            self.headers.insert(name.as_ref(), value);
        }
        self
    }

    /// Append a chunk to the body. Strings are written as UTF-8.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.body.extend_from_slice(chunk.as_ref());
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<HeaderValue>) {
        self.headers.insert(name, value);
    }

    /// Set a header the platform treats specially, such as `content-type`
    /// or `location`.
    ///
    /// The generic header map never emits reserved names; this path does,
    /// with a single value per name. CloudFront's read-only headers are
    /// still dropped.
    pub fn set_platform_header(&mut self, name: &str, value: impl Into<String>) {
        self.platform_headers.insert(name, value.into());
    }

    pub fn get_platform_header(&self, name: &str) -> Option<&str> {
        self.platform_headers.get(name).and_then(HeaderValue::first)
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn get_header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn get_headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// Whether the body will be gzip-compressed on [`end`](Self::end).
    pub fn gzip_enabled(&self) -> bool {
        self.gzip
    }

    /// Finish the response.
    pub fn end(self) {
        let (sender, response) = self.into_cloudfront();
        // The receiver is gone only when the invocation was abandoned.
        let _ = sender.send(response);
    }

    /// Append a final chunk and finish the response.
    pub fn end_with(mut self, chunk: impl AsRef<[u8]>) {
        self.write(chunk);
        self.end();
    }

    fn into_cloudfront(self) -> (oneshot::Sender<CfResponse>, CfResponse) {
        let (payload, compressed) = if self.gzip {
            match gzip(&self.body) {
                Ok(compressed) => (compressed, true),
                Err(e) => {
                    warn!("gzip failed, sending uncompressed body: {}", e);
                    (self.body.to_vec(), false)
                }
            }
        } else {
            (self.body.to_vec(), false)
        };

        let mut headers = self.headers.to_cloudfront();
        headers.extend(self.platform_headers.to_cloudfront_single());
        if compressed {
            headers.insert(
                "content-encoding".to_string(),
                vec![CfHeader::new("Content-Encoding", "gzip")],
            );
        }

        let status_description = self.status_message.unwrap_or_else(|| {
            hyper::StatusCode::from_u16(self.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string()
        });

        let response = CfResponse {
            status: self.status,
            status_description,
            headers,
            body: STANDARD.encode(payload),
            body_encoding: "base64".to_string(),
        };
        (self.sender, response)
    }
}

fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}
