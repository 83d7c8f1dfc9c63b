// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and `ETag` handling.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use crate::config::{AuthMethod, CardDavConfig};
use crate::error::CardDavError;
use crate::types::{ETag, Href};

/// Longest response body kept in [`CardDavError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for `CardDAV` operations.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: CardDavConfig,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: CardDavConfig) -> Result<Self, CardDavError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| CardDavError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Builds a request with authentication headers.
    pub fn build_request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self.client.request(method, url);

        match &self.config.auth {
            AuthMethod::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }

        req
    }

    /// Builds a request using a `WebDAV` extension method such as PROPFIND or REPORT.
    ///
    /// # Errors
    ///
    /// Returns an error if the method name is not a valid HTTP token.
    pub fn build_dav_request(&self, method: &str, url: &str) -> Result<RequestBuilder, CardDavError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| CardDavError::Config(format!("Invalid method {method}: {e}")))?;
        Ok(self.build_request(method, url))
    }

    /// Executes a request and checks for HTTP errors.
    ///
    /// `href` names the target resource in the returned error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns an error status code.
    pub async fn execute(&self, req: RequestBuilder, href: &Href) -> Result<Response, CardDavError> {
        let resp = req.send().await?;

        match resp.status() {
            StatusCode::OK
            | StatusCode::CREATED
            | StatusCode::NO_CONTENT
            | StatusCode::MULTI_STATUS => Ok(resp),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(CardDavError::Auth(format!("{} for {href}", resp.status())))
            }
            StatusCode::NOT_FOUND => Err(CardDavError::NotFound(href.clone())),
            StatusCode::PRECONDITION_FAILED => Err(CardDavError::PreconditionFailed(href.clone())),
            status => {
                let mut body = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response".to_string());
                if body.len() > MAX_ERROR_BODY {
                    let mut end = MAX_ERROR_BODY;
                    while !body.is_char_boundary(end) {
                        end -= 1;
                    }
                    body.truncate(end);
                }
                tracing::debug!(%href, %status, "server returned error status");
                Err(CardDavError::Status {
                    code: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Adds If-Match header for conditional updates.
    pub fn if_match(req: RequestBuilder, etag: &ETag) -> RequestBuilder {
        req.header("If-Match", etag.as_str())
    }

    /// Adds `If-None-Match: *` so the request only creates new resources.
    pub fn if_none_match_any(req: RequestBuilder) -> RequestBuilder {
        req.header("If-None-Match", "*")
    }

    /// Extracts `ETag` from response headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the `ETag` header is missing.
    pub fn extract_etag(resp: &Response) -> Result<ETag, CardDavError> {
        resp.headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(|s| ETag::new(s.to_string()))
            .ok_or_else(|| CardDavError::InvalidResponse("Missing ETag header".to_string()))
    }
}
