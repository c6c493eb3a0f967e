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

//! Runtime configuration for the trust anchor clients.
//!
//! The configuration is constructed once at process start — explicitly via
//! [`TrustAnchorConfig::new`] or from the environment via
//! [`TrustAnchorConfig::from_env`] — and passed by reference to the client
//! constructors.  There is no implicit global.

use std::path::PathBuf;

use bherror::traits::ForeignError as _;
use reqwest::Url;

use crate::error::{ConfigError, Result};

/// Environment variable naming the backend base URL.  Required by
/// [`TrustAnchorConfig::from_env`].
pub const ENV_API_URL: &str = "TRUST_ANCHOR_API_URL";
/// Environment variable naming the authentication base URL.  Defaults to the
/// backend base URL.
pub const ENV_AUTH_URL: &str = "TRUST_ANCHOR_AUTH_URL";
/// Environment variable naming the token file location.
pub const ENV_TOKEN_FILE: &str = "TRUST_ANCHOR_TOKEN_FILE";

/// Default location of the persisted bearer token.
const DEFAULT_TOKEN_FILE: &str = "auth_token";

/// Runtime configuration of the trust anchor clients.
#[derive(Clone, Debug)]
pub struct TrustAnchorConfig {
    /// Base URL of the backend serving the issuer and registry APIs.
    pub api_url: Url,
    /// Base URL of the authentication endpoints; usually the same host as
    /// [`api_url`][Self::api_url].
    pub auth_url: Url,
    /// Location of the file holding the persisted bearer token.
    pub token_file: PathBuf,
}

impl TrustAnchorConfig {
    /// Construct a configuration where all endpoints live under `base_url`
    /// and the token is persisted at the default location.
    pub fn new(base_url: Url) -> Self {
        Self {
            api_url: base_url.clone(),
            auth_url: base_url,
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }

    /// Load the configuration from the environment.
    ///
    /// [`ENV_API_URL`] must be set to an absolute URL; there is no
    /// relative-path fallback outside a browser.  [`ENV_AUTH_URL`] and
    /// [`ENV_TOKEN_FILE`] are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = parse_url(
            ENV_API_URL,
            &std::env::var(ENV_API_URL)
                .foreign_err(|| ConfigError::MissingVar(ENV_API_URL.to_owned()))?,
        )?;

        let auth_url = match std::env::var(ENV_AUTH_URL) {
            Ok(raw) => parse_url(ENV_AUTH_URL, &raw)?,
            Err(_) => api_url.clone(),
        };

        let token_file = std::env::var(ENV_TOKEN_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE));

        Ok(Self {
            api_url,
            auth_url,
            token_file,
        })
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).foreign_err(|| ConfigError::InvalidUrl(var.to_owned(), raw.to_owned()))
}
