//! Turns a CloudFront request into a request/response pair for a render
//! function, and hands the finished response back through a one-shot
//! completion handle.

use crate::edge::event::{CfHeaders, CfRequest, CfResponse};
use crate::edge::request::EdgeRequest;
use crate::edge::response::EdgeResponse;
use crate::error::{EdgeError, Result};
use tokio::sync::oneshot;

/// Output of [`adapt`].
#[derive(Debug)]
pub struct Adapted {
    pub request: EdgeRequest,
    pub response: EdgeResponse,
    pub completion: Completion,
}

/// Resolves once the paired [`EdgeResponse`] is ended.
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<CfResponse>,
}

impl Completion {
    /// Wait for the response.
    ///
    /// Fails with [`EdgeError::AdapterMisuse`] when the response was dropped
    /// without being ended. Never returns if the response is held but never
    /// ended.
    pub async fn wait(self) -> Result<CfResponse> {
        self.receiver
            .await
            .map_err(|_| EdgeError::AdapterMisuse("response dropped before end".to_string()))
    }
}

/// Whether any `accept-encoding` value lists the `gzip` token.
pub fn is_gzip_supported(headers: &CfHeaders) -> bool {
    headers
        .get("accept-encoding")
        .into_iter()
        .flatten()
        .flat_map(|h| h.value.split(','))
        .map(|token| token.split(';').next().unwrap_or_default().trim())
        .any(|token| token == "gzip")
}

/// Build the request/response pair for one invocation.
pub fn adapt(request: &CfRequest) -> Result<Adapted> {
    let edge_request = EdgeRequest::from_cloudfront(request)?;
    let (sender, receiver) = oneshot::channel();
    let response = EdgeResponse::new(is_gzip_supported(&request.headers), sender);

    Ok(Adapted {
        request: edge_request,
        response,
        completion: Completion { receiver },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::event::CfHeader;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn request(accept_encoding: Option<&str>) -> CfRequest {
        let mut request = CfRequest {
            uri: "/".to_string(),
            method: "GET".to_string(),
            ..Default::default()
        };
        if let Some(value) = accept_encoding {
            request.headers.insert(
                "accept-encoding".to_string(),
                vec![CfHeader::new("Accept-Encoding", value)],
            );
        }
        request
    }

    #[test]
    fn test_gzip_token_detection() {
        assert!(is_gzip_supported(&request(Some("gzip, deflate")).headers));
        assert!(is_gzip_supported(&request(Some("br;q=1.0, gzip;q=0.8")).headers));
        assert!(!is_gzip_supported(&request(Some("gzipx, deflate")).headers));
        assert!(!is_gzip_supported(&request(None).headers));
    }

    #[tokio::test]
    async fn test_gzip_negotiated_body() {
        let Adapted { response, completion, .. } = adapt(&request(Some("gzip, deflate"))).unwrap();
        response.end_with("<h1>hello</h1>");

        let out = completion.wait().await.unwrap();
        assert_eq!(out.body_encoding, "base64");
        assert_eq!(out.headers["content-encoding"][0].value, "gzip");

        let compressed = STANDARD.decode(&out.body).unwrap();
        let mut body = String::new();
        GzDecoder::new(&compressed[..]).read_to_string(&mut body).unwrap();
        assert_eq!(body, "<h1>hello</h1>");
    }

    #[tokio::test]
    async fn test_plain_body_without_accept_encoding() {
        let Adapted { response, completion, .. } = adapt(&request(None)).unwrap();
        response.end_with("<h1>hello</h1>");

        let out = completion.wait().await.unwrap();
        assert!(!out.headers.contains_key("content-encoding"));
        assert_eq!(STANDARD.decode(&out.body).unwrap(), b"<h1>hello</h1>");
    }

    #[tokio::test]
    async fn test_defaults_to_200_ok() {
        let Adapted { response, completion, .. } = adapt(&request(None)).unwrap();
        response.end();

        let out = completion.wait().await.unwrap();
        assert_eq!(out.status, 200);
        assert_eq!(out.status_description, "OK");
        assert_eq!(out.body, "");
    }

    #[tokio::test]
    async fn test_status_and_headers() {
        let Adapted { mut response, completion, .. } = adapt(&request(None)).unwrap();
        response.set_status_code(404);
        assert_eq!(response.status_code(), 404);
        response.write_head(201, [("X-Custom", "v"), ("Content-Type", "text/html")]);
        assert!(response.has_header("x-custom"));
        response.set_header("X-Removed", "gone");
        response.remove_header("x-removed");
        response.write("a");
        response.write(b"b".to_vec());
        response.end_with(String::from("c"));

        let out = completion.wait().await.unwrap();
        assert_eq!(out.status, 201);
        assert_eq!(out.status_description, "Created");
        assert_eq!(out.headers.len(), 1);
        assert_eq!(out.headers["x-custom"], vec![CfHeader::new("x-custom", "v")]);
        assert_eq!(STANDARD.decode(&out.body).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_redirect_with_platform_location() {
        let Adapted { mut response, completion, .. } = adapt(&request(None)).unwrap();
        response.set_status_code(302);
        response.set_header("Location", "/ignored");
        response.set_platform_header("Location", "/login");
        response.set_platform_header("Content-Type", "text/html");
        response.set_platform_header("Content-Length", "0");
        assert_eq!(response.get_platform_header("location"), Some("/login"));
        assert!(response.has_header("location"));
        response.end();

        let out = completion.wait().await.unwrap();
        assert_eq!(out.status, 302);
        assert_eq!(out.status_description, "Found");
        assert_eq!(out.headers.len(), 2);
        assert_eq!(out.headers["location"], vec![CfHeader::new("location", "/login")]);
        assert_eq!(out.headers["content-type"][0].value, "text/html");
    }

    #[tokio::test]
    async fn test_status_message_override() {
        let Adapted { mut response, completion, .. } = adapt(&request(None)).unwrap();
        response.set_status_message("Fine");
        response.end();

        let out = completion.wait().await.unwrap();
        assert_eq!(out.status, 200);
        assert_eq!(out.status_description, "Fine");
    }

    #[tokio::test]
    async fn test_gzip_enabled_follows_negotiation() {
        let Adapted { response, .. } = adapt(&request(Some("gzip"))).unwrap();
        assert!(response.gzip_enabled());
        let Adapted { response, .. } = adapt(&request(Some("identity"))).unwrap();
        assert!(!response.gzip_enabled());
    }

    #[tokio::test]
    async fn test_dropped_response_is_misuse() {
        let Adapted { response, completion, .. } = adapt(&request(None)).unwrap();
        drop(response);
        assert!(matches!(
            completion.wait().await,
            Err(EdgeError::AdapterMisuse(_))
        ));
    }

    #[tokio::test]
    async fn test_end_from_another_task() {
        let Adapted { response, completion, .. } = adapt(&request(None)).unwrap();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            response.end_with("late");
        });
        let out = completion.wait().await.unwrap();
        assert_eq!(STANDARD.decode(&out.body).unwrap(), b"late");
    }
}
