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

/// Error type returned by every gateway operation.
///
/// The [`std::fmt::Display`] output of each variant is the user-facing
/// message; dashboards surface it verbatim in their notifications.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[strum(to_string = "{0}")]
    Transport(String),

    /// The backend rejected the bearer token; the session has been cleared
    /// as a side effect.
    #[strum(to_string = "Session expired. Please log in again.")]
    SessionExpired,

    /// Non-OK response carrying a problem body with `title`/`detail`.
    #[strum(to_string = "{0}")]
    Problem(String),

    /// Non-OK response without a usable problem body.
    #[strum(to_string = "HTTP error! status: {0}")]
    HttpStatus(u16),

    /// A success response carried a body this client cannot decode.
    #[strum(to_string = "{0}")]
    Decode(String),

    /// The registry answered successfully but not with the expected
    /// `{"items": [...]}` envelope.
    #[strum(to_string = "Unexpected response from registry API")]
    UnexpectedRegistry,

    /// A configured base URL cannot be extended with an endpoint path.
    #[strum(to_string = "Invalid URL: {0}")]
    InvalidUrl(String),
}

impl bherror::BhError for ApiError {}

/// Error type for loading the runtime configuration.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[strum(to_string = "Missing environment variable `{0}`")]
    MissingVar(String),

    /// An environment variable does not hold a valid absolute URL.
    #[strum(to_string = "Environment variable `{0}` is not a valid URL: {1}")]
    InvalidUrl(String, String),
}

impl bherror::BhError for ConfigError {}

/// Result type used across the crate.
pub type Result<T, E = ApiError> = bherror::Result<T, E>;
