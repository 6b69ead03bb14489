//! Request transports.
//!
//! `LocalTransport` hands requests straight to an in-process `Router`.
//! `HttpTransport` (feature `http`) sends them over the network.

use crate::error::ClientResult;
use notch_core::api::{ApiRequest, ApiResponse, Router};

/// Delivers one request and returns the raw response.
///
/// Implementations report non-2xx statuses as `Ok`; classification happens
/// in the client. `Err` is reserved for failures where no response exists.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        (**self).send(request)
    }
}

/// Loopback transport over an embedded authority.
pub struct LocalTransport {
    router: Router,
}

impl LocalTransport {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl Transport for LocalTransport {
    fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        Ok(self.router.handle(request))
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::Transport;
    use crate::error::{ClientError, ClientResult};
    use notch_core::api::{ApiRequest, ApiResponse, Method};
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
    use std::time::Duration;

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Blocking HTTP transport against a remote authority.
    pub struct HttpTransport {
        base_url: String,
        client: reqwest::blocking::Client,
    }

    impl HttpTransport {
        /// `base_url` is scheme and host, e.g. `https://notch.example`.
        pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(|err| ClientError::transport(format!("HTTP client setup failed: {err}")))?;
            Ok(Self {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                client,
            })
        }
    }

    impl Transport for HttpTransport {
        fn send(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
            let mut url = format!("{}{}", self.base_url, request.path);
            if let Some(query) = request.query.as_deref() {
                url.push('?');
                url.push_str(query);
            }
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Patch => reqwest::Method::PATCH,
                Method::Delete => reqwest::Method::DELETE,
            };

            let mut builder = self.client.request(method, url);
            if let Some(authorization) = request.authorization.as_deref() {
                builder = builder.header(AUTHORIZATION, authorization);
            }
            if let Some(body) = request.body.as_deref() {
                builder = builder
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.to_string());
            }

            let response = builder
                .send()
                .map_err(|err| ClientError::transport(format!("request failed: {err}")))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .map_err(|err| ClientError::transport(format!("response read failed: {err}")))?;
            Ok(ApiResponse { status, body })
        }
    }
}
