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

//! The single choke point for backend HTTP interaction.
//!
//! Every operation goes through one normalization path which attaches the
//! bearer token, maps the backend's heterogeneous response shapes
//! (`204`/`201`/problem bodies/plain JSON) onto `Result`, and reacts to an
//! authorization failure by tearing the session down.  No error escapes as a
//! panic; every path terminates in an [`ApiError`] whose `Display` is the
//! message to surface.

use bh_http_utils::{HttpClient, HttpRequest, Method};
use bh_session::SessionStore;
use bh_uri_utils::UriPathExtensions as _;
use bherror::{
    traits::{ForeignError, PropagateError},
    Error,
};
use reqwest::{StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    config::TrustAnchorConfig,
    error::{ApiError, Result},
    models::{parse_registry_page, EbsiIssuer, IssuerDraft, TrustedIssuer},
};

/// Path prefix of the trusted-issuer management API.
const ISSUER_API_PATH: &str = "/api/issuer";
/// Path prefix of the public registry listing API.
const REGISTRY_API_PATH: &str = "/api/v4/issuers";

/// Gateway client for the trusted-issuer backend and the public registry.
///
/// Holds the [`SessionStore`] it reads the bearer token from; an
/// authorization failure (401) forces a logout through that store — the only
/// path by which this client mutates session state.
pub struct TrustAnchorClient<C> {
    http: C,
    session: SessionStore,
    issuer_api: Url,
    registry_api: Url,
}

impl<C: HttpClient> TrustAnchorClient<C> {
    /// Construct a gateway client from the runtime configuration.
    pub fn new(config: &TrustAnchorConfig, session: SessionStore, http: C) -> Result<Self> {
        let issuer_api = config
            .api_url
            .clone()
            .add_path_suffix(ISSUER_API_PATH)
            .with_err(|| ApiError::InvalidUrl(config.api_url.to_string()))?;
        let registry_api = config
            .api_url
            .clone()
            .add_path_suffix(REGISTRY_API_PATH)
            .with_err(|| ApiError::InvalidUrl(config.api_url.to_string()))?;

        Ok(Self {
            http,
            session,
            issuer_api,
            registry_api,
        })
    }

    /// Register a new trusted issuer.
    ///
    /// The DID is trimmed before the record is created.  The backend may
    /// answer `201` without a body, in which case `Ok(None)` is returned.
    pub async fn create_trusted_issuer(
        &self,
        draft: &IssuerDraft,
    ) -> Result<Option<TrustedIssuer>> {
        let payload = issuer_payload(draft.did.trim(), draft);
        let body = self
            .request(Method::POST, self.issuer_api.clone(), Some(&payload))
            .await?;
        decode_optional(body)
    }

    /// Update the trusted issuer currently identified by `original_did`.
    ///
    /// The record is addressed by the trimmed new DID when the draft carries
    /// one, and by the trimmed `original_did` otherwise — an edit that
    /// clears the DID field means "keep the original identifier", not an
    /// error.
    pub async fn update_trusted_issuer(
        &self,
        original_did: &str,
        draft: &IssuerDraft,
    ) -> Result<Option<TrustedIssuer>> {
        let new_did = draft.did.trim();
        let target = if new_did.is_empty() {
            original_did.trim()
        } else {
            new_did
        };

        let url = with_did_segment(&self.issuer_api, target);
        let payload = issuer_payload(target, draft);
        let body = self.request(Method::PUT, url, Some(&payload)).await?;
        decode_optional(body)
    }

    /// Delete the trusted issuer identified by `did`.
    pub async fn delete_trusted_issuer(&self, did: &str) -> Result<()> {
        let url = with_did_segment(&self.issuer_api, did);
        self.request(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// Fetch the public registry listing, mapped onto [`TrustedIssuer`]
    /// rows with `id` equal to the DID.
    pub async fn get_ebsi_issuers(&self) -> Result<Vec<TrustedIssuer>> {
        let body = self
            .request(Method::GET, self.registry_api.clone(), None)
            .await?;
        match body {
            Some(body) => parse_registry_page(body),
            None => Err(Error::root(ApiError::UnexpectedRegistry)),
        }
    }

    /// Fetch a single public registry record by DID.
    pub async fn get_ebsi_issuer(&self, did: &str) -> Result<EbsiIssuer> {
        let url = with_did_segment(&self.registry_api, did);
        match self.request(Method::GET, url, None).await? {
            Some(body) => {
                serde_json::from_value(body).foreign_err(|| ApiError::UnexpectedRegistry)
            }
            None => Err(Error::root(ApiError::UnexpectedRegistry)),
        }
    }

    /// The session store this client reads the bearer token from.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Issue one request and normalize the response.
    ///
    /// `Ok(None)` is "success with no body" (`204`, or `201` with an empty
    /// or unparsable body).  A `401` clears the session before reporting
    /// [`ApiError::SessionExpired`]; other non-OK statuses are mapped
    /// best-effort through their problem body.
    async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let token = self.session.token();
        let mut request = HttpRequest::new(method, url.as_str());
        if let Some(token) = token.as_deref().filter(|token| !token.is_empty()) {
            request = request.with_bearer(token);
        }
        if let Some(body) = body {
            request = request.with_json(body);
        }

        let response = self
            .http
            .send(request)
            .await
            .match_foreign_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            Ok(None)
        } else if status == StatusCode::CREATED {
            let text = response
                .text()
                .await
                .match_foreign_err(|err| ApiError::Transport(err.to_string()))?;
            if text.is_empty() {
                return Ok(None);
            }
            // A `201` whose body does not parse is still a success.
            Ok(serde_json::from_str(&text).ok())
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("backend answered 401, clearing the stored session");
            self.session.logout();
            Err(Error::root(ApiError::SessionExpired))
        } else if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            Err(Error::root(problem_error(status.as_u16(), &text)))
        } else {
            let value = response
                .json()
                .await
                .match_foreign_err(|err| ApiError::Decode(err.to_string()))?;
            Ok(Some(value))
        }
    }
}

/// Problem body shape produced by the backend on errors.
#[derive(Deserialize)]
struct ProblemBody {
    title: Option<String>,
    detail: Option<String>,
}

/// Best-effort extraction of a human-readable message from an error
/// response.
fn problem_error(status: u16, body: &str) -> ApiError {
    let Ok(ProblemBody { title, detail }) = serde_json::from_str(body) else {
        return ApiError::HttpStatus(status);
    };
    if title.is_none() && detail.is_none() {
        return ApiError::HttpStatus(status);
    }

    let message = format!(
        "{}{}",
        title.unwrap_or_default(),
        detail
            .map(|detail| format!(": {detail}"))
            .unwrap_or_default()
    );
    ApiError::Problem(message.trim().to_owned())
}

/// Wire payload of the issuer creation and update endpoints: the resolved
/// DID plus the supported credential type names.
fn issuer_payload(did: &str, draft: &IssuerDraft) -> Value {
    let credentials: Vec<&str> = draft
        .credentials_supported
        .iter()
        .map(|credential| credential.credential_type.as_str())
        .collect();
    serde_json::json!({ "did": did, "credentials": credentials })
}

/// Extend `base` with `did` as a final, percent-encoded path segment.
fn with_did_segment(base: &Url, did: &str) -> Url {
    let mut url = base.clone();
    url.path_segments_mut()
        .expect("HTTP(S) base URLs are always segmentable")
        .push(did);
    url
}

fn decode_optional<T: DeserializeOwned>(body: Option<Value>) -> Result<Option<T>> {
    match body {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .match_foreign_err(|err| ApiError::Decode(err.to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use bh_http_utils::test_utils::{
        response_with_json, response_with_status, ExpectedRequest, FailingHttpClient,
        StubHttpClient,
    };
    use serde_json::json;

    use super::*;

    const API_URL: &str = "http://localhost:8080";

    fn test_config() -> TrustAnchorConfig {
        TrustAnchorConfig::new(Url::parse(API_URL).unwrap())
    }

    fn client_with<C: HttpClient>(session: SessionStore, http: C) -> TrustAnchorClient<C> {
        TrustAnchorClient::new(&test_config(), session, http).unwrap()
    }

    fn authenticated_session() -> SessionStore {
        let session = SessionStore::in_memory();
        session.set_token("admin-token").unwrap();
        session
    }

    fn counting_listener(session: &SessionStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        session.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    fn draft(did: &str, credential_types: &[&str]) -> IssuerDraft {
        IssuerDraft {
            did: did.to_owned(),
            name: None,
            credentials_supported: credential_types
                .iter()
                .map(|credential_type| crate::models::CredentialSupported {
                    credential_type: (*credential_type).to_owned(),
                    format: None,
                })
                .collect(),
        }
    }

    fn expected(method: Method, url: String, body: Option<Value>) -> ExpectedRequest {
        ExpectedRequest {
            method,
            url,
            bearer: Some("admin-token".to_owned()),
            body,
        }
    }

    #[tokio::test]
    async fn test_delete_answers_no_content() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::DELETE,
                    format!("{API_URL}/api/issuer/did:x:1"),
                    None,
                ),
                response_with_status(204, ""),
            ),
        );

        client.delete_trusted_issuer("did:x:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_and_reports() {
        let session = authenticated_session();
        let notifications = counting_listener(&session);
        let client = client_with(
            session.clone(),
            StubHttpClient::new(
                expected(
                    Method::DELETE,
                    format!("{API_URL}/api/issuer/did:x:1"),
                    None,
                ),
                response_with_status(401, ""),
            ),
        );

        let err = client.delete_trusted_issuer("did:x:1").await.unwrap_err();

        assert_eq!(err.error, ApiError::SessionExpired);
        assert_eq!(
            err.error.to_string(),
            "Session expired. Please log in again."
        );
        assert!(!session.is_authenticated());
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_on_read_path_clears_session_too() {
        // The 401 handling is method- and endpoint-independent.
        let session = authenticated_session();
        let client = client_with(
            session.clone(),
            StubHttpClient::new(
                expected(Method::GET, format!("{API_URL}/api/v4/issuers"), None),
                response_with_status(401, ""),
            ),
        );

        let err = client.get_ebsi_issuers().await.unwrap_err();

        assert_eq!(err.error, ApiError::SessionExpired);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_problem_body_with_title_and_detail() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::POST,
                    format!("{API_URL}/api/issuer"),
                    Some(json!({"did": "did:x:1", "credentials": []})),
                ),
                response_with_json(
                    400,
                    json!({"title": "Invalid DID", "detail": "unsupported method"}),
                ),
            ),
        );

        let err = client
            .create_trusted_issuer(&draft("did:x:1", &[]))
            .await
            .unwrap_err();

        assert_eq!(
            err.error,
            ApiError::Problem("Invalid DID: unsupported method".to_owned())
        );
        assert_eq!(err.error.to_string(), "Invalid DID: unsupported method");
    }

    #[tokio::test]
    async fn test_problem_body_with_title_only() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::POST,
                    format!("{API_URL}/api/issuer"),
                    Some(json!({"did": "did:x:1", "credentials": []})),
                ),
                response_with_json(409, json!({"title": "Issuer already registered"})),
            ),
        );

        let err = client
            .create_trusted_issuer(&draft("did:x:1", &[]))
            .await
            .unwrap_err();

        assert_eq!(
            err.error,
            ApiError::Problem("Issuer already registered".to_owned())
        );
    }

    #[tokio::test]
    async fn test_error_without_usable_body_reports_status() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::DELETE,
                    format!("{API_URL}/api/issuer/did:x:1"),
                    None,
                ),
                response_with_status(500, "<html>oops</html>"),
            ),
        );

        let err = client.delete_trusted_issuer("did:x:1").await.unwrap_err();

        assert_eq!(err.error, ApiError::HttpStatus(500));
        assert_eq!(err.error.to_string(), "HTTP error! status: 500");
    }

    #[tokio::test]
    async fn test_create_trims_did_and_sends_credentials() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::POST,
                    format!("{API_URL}/api/issuer"),
                    Some(json!({"did": "did:x:9", "credentials": ["VerifiableId"]})),
                ),
                response_with_json(201, json!({"id": "7", "did": "did:x:9"})),
            ),
        );

        let created = client
            .create_trusted_issuer(&draft(" did:x:9 ", &["VerifiableId"]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(created.did, "did:x:9");
    }

    #[tokio::test]
    async fn test_created_with_empty_body_is_success() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::POST,
                    format!("{API_URL}/api/issuer"),
                    Some(json!({"did": "did:x:1", "credentials": []})),
                ),
                response_with_status(201, ""),
            ),
        );

        let created = client
            .create_trusted_issuer(&draft("did:x:1", &[]))
            .await
            .unwrap();

        assert_eq!(created, None);
    }

    #[tokio::test]
    async fn test_created_with_unparsable_body_is_success() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::POST,
                    format!("{API_URL}/api/issuer"),
                    Some(json!({"did": "did:x:1", "credentials": []})),
                ),
                response_with_status(201, "created"),
            ),
        );

        let created = client
            .create_trusted_issuer(&draft("did:x:1", &[]))
            .await
            .unwrap();

        assert_eq!(created, None);
    }

    #[tokio::test]
    async fn test_update_addresses_new_did() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::PUT,
                    format!("{API_URL}/api/issuer/did:x:2"),
                    Some(json!({"did": "did:x:2", "credentials": []})),
                ),
                response_with_json(200, json!({"id": "7", "did": "did:x:2"})),
            ),
        );

        let updated = client
            .update_trusted_issuer("did:x:1", &draft("did:x:2", &[]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.did, "did:x:2");
    }

    #[tokio::test]
    async fn test_update_with_cleared_did_keeps_original() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::PUT,
                    format!("{API_URL}/api/issuer/did:x:1"),
                    Some(json!({"did": "did:x:1", "credentials": []})),
                ),
                response_with_json(200, json!({"id": "7", "did": "did:x:1"})),
            ),
        );

        let updated = client
            .update_trusted_issuer(" did:x:1 ", &draft("   ", &[]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.did, "did:x:1");
    }

    #[tokio::test]
    async fn test_registry_listing_maps_items() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(Method::GET, format!("{API_URL}/api/v4/issuers"), None),
                response_with_json(200, json!({"items": [{"did": "did:a"}]})),
            ),
        );

        let issuers = client.get_ebsi_issuers().await.unwrap();

        assert_eq!(issuers.len(), 1);
        assert_eq!(issuers[0].id, "did:a");
        assert_eq!(issuers[0].did, "did:a");
    }

    #[tokio::test]
    async fn test_registry_listing_without_items_is_rejected() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(Method::GET, format!("{API_URL}/api/v4/issuers"), None),
                response_with_json(200, json!({"total": 3})),
            ),
        );

        let err = client.get_ebsi_issuers().await.unwrap_err();

        assert_eq!(err.error, ApiError::UnexpectedRegistry);
        assert_eq!(
            err.error.to_string(),
            "Unexpected response from registry API"
        );
    }

    #[tokio::test]
    async fn test_registry_record_with_encoded_did() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::GET,
                    format!("{API_URL}/api/v4/issuers/did:web:example.com%2Fissuers"),
                    None,
                ),
                response_with_json(200, json!({"did": "did:web:example.com/issuers"})),
            ),
        );

        let issuer = client
            .get_ebsi_issuer("did:web:example.com/issuers")
            .await
            .unwrap();

        assert_eq!(issuer.did, "did:web:example.com/issuers");
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_message() {
        let client = client_with(
            authenticated_session(),
            FailingHttpClient("connection refused".to_owned()),
        );

        let err = client.get_ebsi_issuers().await.unwrap_err();

        assert_eq!(err.error, ApiError::Transport("connection refused".to_owned()));
        assert_eq!(err.error.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_ok_with_unparsable_body_is_a_decode_error() {
        let client = client_with(
            authenticated_session(),
            StubHttpClient::new(
                expected(
                    Method::GET,
                    format!("{API_URL}/api/v4/issuers/did:x:1"),
                    None,
                ),
                response_with_status(200, "not json"),
            ),
        );

        let err = client.get_ebsi_issuer("did:x:1").await.unwrap_err();

        assert!(matches!(err.error, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_requests_without_session_carry_no_bearer() {
        let client = client_with(
            SessionStore::in_memory(),
            StubHttpClient::new(
                ExpectedRequest {
                    method: Method::GET,
                    url: format!("{API_URL}/api/v4/issuers"),
                    bearer: None,
                    body: None,
                },
                response_with_json(200, json!({"items": []})),
            ),
        );

        let issuers = client.get_ebsi_issuers().await.unwrap();

        assert!(issuers.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_keyed_on_trimmed_did() {
        // A record created from an untrimmed draft is addressed by its
        // trimmed identifier for the rest of its life.
        let session = authenticated_session();

        let create_client = client_with(
            session.clone(),
            StubHttpClient::new(
                expected(
                    Method::POST,
                    format!("{API_URL}/api/issuer"),
                    Some(json!({"did": "did:x:9", "credentials": []})),
                ),
                response_with_json(201, json!({"id": "did:x:9", "did": "did:x:9"})),
            ),
        );
        let created = create_client
            .create_trusted_issuer(&draft(" did:x:9 ", &[]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.did, "did:x:9");

        let delete_client = client_with(
            session,
            StubHttpClient::new(
                expected(
                    Method::DELETE,
                    format!("{API_URL}/api/issuer/did:x:9"),
                    None,
                ),
                response_with_status(204, ""),
            ),
        );
        delete_client.delete_trusted_issuer(&created.did).await.unwrap();
    }

    #[test]
    fn test_problem_error_detail_only_keeps_separator() {
        // Mirrors the historical message layout: a lone `detail` keeps its
        // leading separator.
        assert_eq!(
            problem_error(400, r#"{"detail": "unsupported method"}"#),
            ApiError::Problem(": unsupported method".to_owned())
        );
    }

    #[test]
    fn test_problem_error_empty_object_reports_status() {
        assert_eq!(problem_error(502, "{}"), ApiError::HttpStatus(502));
    }

    #[test]
    fn test_with_did_segment_encodes_reserved_characters() {
        let base = Url::parse("http://localhost:8080/api/v4/issuers").unwrap();

        let url = with_did_segment(&base, "did:web:example.com/path a");

        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v4/issuers/did:web:example.com%2Fpath%20a"
        );
    }
}
