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

//! End-to-end administration flow against a live backend.
//!
//! Reads the backend location from `TRUST_ANCHOR_API_URL` (and friends) and
//! the credentials from `TRUST_ANCHOR_USERNAME` / `TRUST_ANCHOR_PASSWORD`,
//! then logs in, lists the registry and prints the dashboard aggregates.

use bh_session::{AuthClient, FileTokenStore, SessionStore};
use bh_trust_anchor::{
    DashboardStats, ReqwestHttpClient, TrustAnchorClient, TrustAnchorConfig,
};

#[tokio::main]
async fn main() {
    let config = TrustAnchorConfig::from_env().expect("backend configuration missing");
    let username = std::env::var("TRUST_ANCHOR_USERNAME").expect("TRUST_ANCHOR_USERNAME missing");
    let password = std::env::var("TRUST_ANCHOR_PASSWORD").expect("TRUST_ANCHOR_PASSWORD missing");

    let session = SessionStore::new(FileTokenStore::new(&config.token_file));
    // Any number of independently wired components can react to login and
    // logout this way; the dashboard gates re-render through the same hook.
    session.subscribe({
        let session = session.clone();
        move || println!("auth changed: authenticated = {}", session.is_authenticated())
    });

    let auth = AuthClient::new(
        session.clone(),
        config.auth_url.clone(),
        ReqwestHttpClient::new(reqwest::Client::new()),
    )
    .expect("invalid auth URL");
    let client = TrustAnchorClient::new(
        &config,
        session.clone(),
        ReqwestHttpClient::new(reqwest::Client::new()),
    )
    .expect("invalid API URL");

    auth.login(&username, &password).await.expect("login failed");
    let user = auth.me().await.expect("session introspection failed");
    println!("logged in as {}", user.username);

    let issuers = client.get_ebsi_issuers().await.expect("listing failed");
    let stats = DashboardStats::from_issuers(&issuers);
    println!(
        "{} issuers ({} active, {} pending), {} credential types, last updated {}",
        stats.total_issuers,
        stats.active_issuers,
        stats.pending_issuers,
        stats.credential_types.len(),
        stats.last_updated.as_deref().unwrap_or("N/A"),
    );

    for issuer in issuers.iter().take(5) {
        let record = client.get_ebsi_issuer(&issuer.did).await;
        match record {
            Ok(record) => println!("  {} -> {}", record.did, record.explorer_url()),
            Err(err) => println!("  {} -> {}", issuer.did, err),
        }
    }

    session.logout();
}
