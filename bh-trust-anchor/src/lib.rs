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

//! This crate implements the administration core of a data-space trust
//! anchor: managing the trusted issuers registered with a backend, and
//! reading the public EBSI issuer registry alongside.
//!
//! All backend interaction goes through the [`TrustAnchorClient`] — a single
//! choke point which attaches the session's bearer token, normalizes the
//! backend's heterogeneous response shapes into `Result`s, and tears the
//! session down when the backend revokes it.  The session itself lives in a
//! [`bh_session::SessionStore`]; this crate only ever reads the token and
//! forces a logout on an authorization failure.
//!
//! # Details
//!
//! * [`TrustAnchorClient`] -- trusted-issuer CRUD and registry reads.
//! * [`TrustAnchorConfig`] -- runtime configuration, built once at process
//!   start and injected into the constructors.
//! * [`models`] -- the issuer and registry records on the wire.
//! * [`DashboardStats`] -- aggregates computed over a fetched listing.
//!
//! # Example
//!
//! ```no_run
//! use bh_session::{FileTokenStore, SessionStore};
//! use bh_trust_anchor::{ReqwestHttpClient, TrustAnchorClient, TrustAnchorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrustAnchorConfig::from_env()?;
//! let session = SessionStore::new(FileTokenStore::new(&config.token_file));
//! let client = TrustAnchorClient::new(
//!     &config,
//!     session,
//!     ReqwestHttpClient::new(reqwest::Client::new()),
//! )?;
//!
//! let issuers = client.get_ebsi_issuers().await?;
//! println!("{} trusted issuers", issuers.len());
//! # Ok(())
//! # }
//! ```

// Re-export the building blocks callers wire together with this crate.
pub use bh_http_utils::{self, HttpClient, ReqwestHttpClient};
pub use bh_session;

pub use client::TrustAnchorClient;
pub use config::TrustAnchorConfig;
pub use error::{ApiError, ConfigError, Result};
pub use models::{
    CredentialMetadata, CredentialSupported, EbsiIssuer, IssuerDraft, IssuerStatus, TrustedIssuer,
};
pub use stats::DashboardStats;

mod client;
pub mod config;
mod error;
pub mod models;
mod stats;
