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

//! Aggregate figures for the administration dashboard.

use crate::models::{IssuerStatus, TrustedIssuer};

/// Aggregates computed over a listed set of issuers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DashboardStats {
    /// Number of listed issuers.
    pub total_issuers: usize,
    /// Issuers whose status is `active`.
    pub active_issuers: usize,
    /// Issuers whose status is `pending`.
    pub pending_issuers: usize,
    /// Deduplicated, sorted credential type names across all issuers;
    /// nameless types are not counted.
    pub credential_types: Vec<String>,
    /// Most recent `updated_at` timestamp, when any issuer carries one.
    pub last_updated: Option<String>,
}

impl DashboardStats {
    /// Compute the dashboard aggregates for `issuers`.
    pub fn from_issuers(issuers: &[TrustedIssuer]) -> Self {
        let mut credential_types: Vec<String> = issuers
            .iter()
            .flat_map(|issuer| issuer.credentials_supported.iter())
            .map(|credential| credential.credential_type.clone())
            .filter(|credential_type| !credential_type.is_empty())
            .collect();
        credential_types.sort();
        credential_types.dedup();

        Self {
            total_issuers: issuers.len(),
            active_issuers: count_with_status(issuers, IssuerStatus::Active),
            pending_issuers: count_with_status(issuers, IssuerStatus::Pending),
            credential_types,
            // ISO-8601 timestamps order lexicographically.
            last_updated: issuers
                .iter()
                .filter_map(|issuer| issuer.updated_at.clone())
                .max(),
        }
    }
}

fn count_with_status(issuers: &[TrustedIssuer], status: IssuerStatus) -> usize {
    issuers
        .iter()
        .filter(|issuer| issuer.status == Some(status))
        .count()
}
