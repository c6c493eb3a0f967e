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

//! Stub [`HttpClient`] implementations for tests.
//!
//! [`StubHttpClient`] asserts that exactly the expected request arrives and
//! answers it with a canned [`http::Response`]; [`FailingHttpClient`] fails
//! every request at the transport level.  Both panic loudly on misuse so a
//! test never silently passes against the wrong request.

use crate::{HttpClient, HttpRequest, Method};

/// The request a [`StubHttpClient`] expects to receive.
#[derive(Debug)]
pub struct ExpectedRequest {
    /// Expected HTTP method.
    pub method: Method,
    /// Expected absolute URL.
    pub url: String,
    /// Expected bearer token, if any.
    pub bearer: Option<String>,
    /// Expected JSON body, if any.
    pub body: Option<serde_json::Value>,
}

/// Transport-level error returned by the stub clients.
#[derive(Debug)]
pub struct StubError(pub String);

impl std::fmt::Display for StubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StubError {}

/// [`HttpClient`] answering one expected request with a canned response.
///
/// Panics when the received request differs from the expected one.
pub struct StubHttpClient {
    expected: ExpectedRequest,
    response: http::Response<String>,
}

impl StubHttpClient {
    /// Construct a stub answering `expected` with `response`.
    pub fn new(expected: ExpectedRequest, response: http::Response<String>) -> Self {
        Self { expected, response }
    }
}

impl HttpClient for StubHttpClient {
    type Err = StubError;

    async fn send(&self, request: HttpRequest<'_>) -> Result<reqwest::Response, StubError> {
        if request.url != self.expected.url {
            panic!("Unexpected url: {}", request.url);
        }
        if request.method != self.expected.method {
            panic!("Unexpected method: {}", request.method);
        }
        if request.bearer.map(str::to_owned) != self.expected.bearer {
            panic!("Unexpected bearer token: {:?}", request.bearer);
        }
        if request.body.cloned() != self.expected.body {
            panic!("Unexpected body: {:?}", request.body);
        }
        Ok(reqwest::Response::from(self.response.clone()))
    }
}

/// [`HttpClient`] failing every request with the carried message.
pub struct FailingHttpClient(pub String);

impl HttpClient for FailingHttpClient {
    type Err = StubError;

    async fn send(&self, _request: HttpRequest<'_>) -> Result<reqwest::Response, StubError> {
        Err(StubError(self.0.clone()))
    }
}

/// Build a JSON response with the given status for a stub client.
pub fn response_with_json(status: u16, body: serde_json::Value) -> http::Response<String> {
    http::Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .expect("static response parts must be valid")
}

/// Build a response with the given status and a raw body.
pub fn response_with_status(status: u16, body: &str) -> http::Response<String> {
    http::Response::builder()
        .status(status)
        .body(body.to_owned())
        .expect("static response parts must be valid")
}
