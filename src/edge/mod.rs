//! CloudFront Lambda@Edge protocol adapter.
//!
//! [`adapt`] converts one inbound request into an [`EdgeRequest`] and an
//! [`EdgeResponse`] with plain HTTP semantics. When the render function ends
//! the response, the body is base64-encoded (gzip-compressed first when the
//! viewer accepts it) and delivered through the paired [`Completion`].

mod adapter;
pub mod event;
pub mod headers;
mod request;
mod response;

pub use adapter::{adapt, is_gzip_supported, Adapted, Completion};
pub use event::{CfHeader, CfHeaders, CfRequest, CfResponse, CloudFrontEvent, EdgeOutcome};
pub use headers::{HeaderValue, ResponseHeaders};
pub use request::EdgeRequest;
pub use response::EdgeResponse;
