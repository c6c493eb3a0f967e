// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides the HTTP seam used by TBTL's backend-facing client
//! crates.
//!
//! All network interaction goes through the [`HttpClient`] trait, which takes
//! a fully described request ([`HttpRequest`]: method, URL, optional bearer
//! token, optional JSON body) and yields a [`reqwest::Response`].  The
//! [`ReqwestHttpClient`] implementation is the one used in production;
//! swapping in a different implementation allows callers to restrict
//! reachable hosts, or — with the `test-utils` feature — to test request
//! handling logic without a live backend.
//!
//! # Example
//!
//! ```no_run
//! use bh_http_utils::{HttpClient, HttpRequest, Method, ReqwestHttpClient};
//!
//! # async fn example() -> reqwest::Result<()> {
//! let client = ReqwestHttpClient::new(reqwest::Client::new());
//! let response = client
//!     .send(HttpRequest::new(Method::GET, "https://example.com/api/v4/issuers"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;

pub use reqwest::Method;

#[cfg(feature = "test-utils")]
pub mod test_utils;

/// A single HTTP request as issued through the [`HttpClient`] seam.
///
/// Every request carries `Content-Type: application/json`; the bearer token
/// and the JSON body are attached only when set.
#[derive(Debug)]
pub struct HttpRequest<'a> {
    /// HTTP method of the request.
    pub method: Method,
    /// Absolute URL the request is addressed to.
    pub url: &'a str,
    /// Bearer token sent in the `Authorization` header, if any.
    pub bearer: Option<&'a str>,
    /// JSON request body, if any.
    pub body: Option<&'a serde_json::Value>,
}

impl<'a> HttpRequest<'a> {
    /// Construct a request with no bearer token and no body.
    pub fn new(method: Method, url: &'a str) -> Self {
        Self {
            method,
            url,
            bearer: None,
            body: None,
        }
    }

    /// Attach a bearer token to the request.
    pub fn with_bearer(mut self, token: &'a str) -> Self {
        self.bearer = Some(token);
        self
    }

    /// Attach a JSON body to the request.
    pub fn with_json(mut self, body: &'a serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Interface providing the functionality of sending an HTTP request.
///
/// Motivation for introducing this abstraction is to allow an implementation
/// of a more restrictive HTTP client (e.g. by whitelisting hosts), as well as
/// stub implementations for tests.
pub trait HttpClient: Sync {
    /// Error type used by this trait.
    type Err: std::error::Error + Send + Sync + 'static;

    /// Performs the described HTTP request.
    fn send(
        &self,
        request: HttpRequest<'_>,
    ) -> impl Future<Output = std::result::Result<reqwest::Response, Self::Err>> + Send;
}

/// [`HttpClient`] implementation using the [`reqwest`] crate.
pub struct ReqwestHttpClient(reqwest::Client);

impl ReqwestHttpClient {
    /// Construct [`ReqwestHttpClient`] from a [`reqwest::Client`].
    pub fn new(client: reqwest::Client) -> Self {
        Self(client)
    }

    /// Construct [`ReqwestHttpClient`] from a [`reqwest::ClientBuilder`].
    pub fn from_builder(builder: reqwest::ClientBuilder) -> reqwest::Result<Self> {
        Ok(Self(builder.build()?))
    }
}

impl HttpClient for ReqwestHttpClient {
    type Err = reqwest::Error;

    fn send(
        &self,
        request: HttpRequest<'_>,
    ) -> impl Future<Output = reqwest::Result<reqwest::Response>> + Send {
        let mut builder = self
            .0
            .request(request.method, request.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }
        builder.send()
    }
}
