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

//! Typed records exchanged with the backend and the public EBSI registry.
//!
//! The managed records ([`TrustedIssuer`]) are camelCase on the wire; the
//! registry records ([`EbsiIssuer`]) are snake_case, as served by the
//! registry itself.  Timestamps stay ISO-8601 strings — the backend's
//! representation, whose lexicographic order is chronological.

use bherror::Error;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Lifecycle status of a trusted issuer record.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssuerStatus {
    /// The issuer is trusted and may issue credentials.
    Active,
    /// The issuer is registered but currently disabled.
    Inactive,
    /// The issuer registration awaits approval.
    Pending,
}

/// A credential type an issuer supports.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialSupported {
    /// Credential type name, e.g. `VerifiableId`.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Credential format, e.g. `jwt_vc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A trusted issuer record managed through the backend.
///
/// This is the superset of the shapes the backend has served over time; all
/// fields beyond the identifiers are optional.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrustedIssuer {
    /// Backend-assigned identifier.  Rows derived from the registry listing
    /// set it equal to the DID.
    pub id: String,
    /// Decentralized identifier, the natural key of the record.
    pub did: String,
    /// Display name, when the backend carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Credential types the issuer supports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials_supported: Vec<CredentialSupported>,
    /// Lifecycle status of the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IssuerStatus>,
    /// Creation timestamp, ISO-8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last-update timestamp, ISO-8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Input for creating or updating a trusted issuer.
///
/// The backend assigns the `id`, so the draft carries everything but.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IssuerDraft {
    /// Decentralized identifier; surrounding whitespace is trimmed before
    /// the record is addressed.
    pub did: String,
    /// Display name, if any.
    pub name: Option<String>,
    /// Credential types the issuer should support.
    pub credentials_supported: Vec<CredentialSupported>,
}

/// Credential metadata advertised by a registry issuer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CredentialMetadata {
    /// Credential type name.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Credential format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Supported cryptographic binding methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cryptographic_binding_methods_supported: Option<Vec<String>>,
    /// Supported cryptographic suites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cryptographic_suites_supported: Option<Vec<String>>,
}

/// A read-only record from the public EBSI registry.
///
/// Never created or mutated by this system; fetched and displayed only.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EbsiIssuer {
    /// Decentralized identifier of the registry entry.
    pub did: String,
    /// Credentials the issuer advertises.
    #[serde(default)]
    pub credentials_supported: Vec<CredentialMetadata>,
    /// Authorization server of the issuer, if published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_server: Option<String>,
}

impl EbsiIssuer {
    /// Public EBSI DID explorer page for this issuer.
    pub fn explorer_url(&self) -> String {
        format!("https://did.ebsi.eu/did/{}", self.did)
    }
}

/// Item shape of the registry listing envelope.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryItem {
    did: String,
    #[serde(default)]
    status: Option<IssuerStatus>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Decode the registry listing envelope into [`TrustedIssuer`] rows.
///
/// The registry is a foreign API, so the envelope is checked explicitly: a
/// success body without an array under `items` is an
/// [`ApiError::UnexpectedRegistry`], never a panic.  Each row gets its `id`
/// set equal to its DID — the registry has no separate identifier.
pub(crate) fn parse_registry_page(body: serde_json::Value) -> Result<Vec<TrustedIssuer>> {
    use bherror::traits::ForeignError as _;

    let Some(items) = body.get("items").filter(|items| items.is_array()) else {
        return Err(Error::root(ApiError::UnexpectedRegistry));
    };

    let items: Vec<RegistryItem> =
        serde_json::from_value(items.clone()).foreign_err(|| ApiError::UnexpectedRegistry)?;

    Ok(items
        .into_iter()
        .map(|item| TrustedIssuer {
            id: item.did.clone(),
            did: item.did,
            name: None,
            credentials_supported: Vec::new(),
            status: item.status,
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
        .collect())
}
