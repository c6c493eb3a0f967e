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

//! The authentication round-trips backing the session store.

use bh_http_utils::{HttpClient, HttpRequest, Method};
use bh_uri_utils::UriPathExtensions as _;
use bherror::{
    traits::{ForeignError, PropagateError},
    Error,
};
use reqwest::Url;
use serde::Deserialize;

use crate::{Result, SessionError, SessionStore};

/// Path of the credential login endpoint, relative to the auth base URL.
const LOGIN_PATH: &str = "/login";
/// Path of the session introspection endpoint, relative to the auth base URL.
const ME_PATH: &str = "/me";

/// The generic message surfaced when a login attempt fails without a
/// backend-provided explanation.
const LOGIN_FAILED: &str = "Login failed";

/// Session introspection data returned by [`AuthClient::me`].
#[derive(Debug, Deserialize, PartialEq)]
pub struct UserInfo {
    /// Username the current token belongs to.
    pub username: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct LoginErrorBody {
    error: Option<String>,
}

/// Client for the authentication endpoints, writing through a
/// [`SessionStore`].
///
/// A successful [`login`][AuthClient::login] persists the received token
/// (which broadcasts the auth change); reading and clearing the session stay
/// with the [`SessionStore`] itself.
pub struct AuthClient<C> {
    http: C,
    session: SessionStore,
    login_url: Url,
    me_url: Url,
}

impl<C: HttpClient> AuthClient<C> {
    /// Construct an authentication client against `auth_url`.
    pub fn new(session: SessionStore, auth_url: Url, http: C) -> Result<Self> {
        let login_url = auth_url
            .clone()
            .add_path_suffix(LOGIN_PATH)
            .with_err(|| SessionError::InvalidUrl(auth_url.to_string()))?;
        let me_url = auth_url
            .clone()
            .add_path_suffix(ME_PATH)
            .with_err(|| SessionError::InvalidUrl(auth_url.to_string()))?;

        Ok(Self {
            http,
            session,
            login_url,
            me_url,
        })
    }

    /// Exchange credentials for a bearer token and persist it.
    ///
    /// On success the token is persisted (notifying auth-change listeners)
    /// and returned.  On failure the error message is taken from the
    /// response body when the backend provides one, and is the generic
    /// "Login failed" otherwise; transport and parse failures surface the
    /// same way.  The call suspends for the whole network round-trip — no
    /// timeout is enforced here, showing progress is the caller's concern.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let body = serde_json::json!({ "username": username, "password": password });
        let request = HttpRequest::new(Method::POST, self.login_url.as_str()).with_json(&body);

        let response = self
            .http
            .send(request)
            .await
            .foreign_err(|| SessionError::LoginFailed(LOGIN_FAILED.to_owned()))?;

        if !response.status().is_success() {
            let message = response
                .json::<LoginErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| LOGIN_FAILED.to_owned());
            return Err(Error::root(SessionError::LoginFailed(message)));
        }

        let LoginResponse { token } = response
            .json()
            .await
            .foreign_err(|| SessionError::LoginFailed(LOGIN_FAILED.to_owned()))?;

        self.session.set_token(&token)?;
        Ok(token)
    }

    /// Ask the backend who the current token belongs to.
    ///
    /// Returns [`SessionError::NoToken`] immediately, without a network
    /// call, when no token is stored.
    pub async fn me(&self) -> Result<UserInfo> {
        let Some(token) = self.session.token().filter(|token| !token.is_empty()) else {
            return Err(Error::root(SessionError::NoToken));
        };

        let request = HttpRequest::new(Method::GET, self.me_url.as_str()).with_bearer(&token);
        let response = self
            .http
            .send(request)
            .await
            .foreign_err(|| SessionError::NotAuthenticated)?;

        if !response.status().is_success() {
            return Err(Error::root(SessionError::NotAuthenticated));
        }

        response
            .json()
            .await
            .foreign_err(|| SessionError::NotAuthenticated)
    }

    /// The session store this client writes through.
    pub fn session(&self) -> &SessionStore {
        &self.session
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

    const AUTH_URL: &str = "http://localhost:9000";

    fn auth_client<C: HttpClient>(session: SessionStore, http: C) -> AuthClient<C> {
        AuthClient::new(session, Url::parse(AUTH_URL).unwrap(), http).unwrap()
    }

    fn counting_listener(session: &SessionStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        session.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    fn expected_login() -> ExpectedRequest {
        ExpectedRequest {
            method: Method::POST,
            url: format!("{AUTH_URL}/login"),
            bearer: None,
            body: Some(json!({"username": "admin", "password": "hunter2"})),
        }
    }

    #[tokio::test]
    async fn test_login_persists_token_and_notifies_once() {
        let session = SessionStore::in_memory();
        let notifications = counting_listener(&session);
        let client = auth_client(
            session.clone(),
            StubHttpClient::new(expected_login(), response_with_json(200, json!({"token": "token-1"}))),
        );

        let token = client.login("admin", "hunter2").await.unwrap();

        assert_eq!(token, "token-1");
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("token-1".to_owned()));
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_rejected_with_backend_message() {
        let session = SessionStore::in_memory();
        let client = auth_client(
            session.clone(),
            StubHttpClient::new(
                expected_login(),
                response_with_json(401, json!({"error": "Bad credentials"})),
            ),
        );

        let err = client.login("admin", "hunter2").await.unwrap_err();

        assert_eq!(
            err.error,
            SessionError::LoginFailed("Bad credentials".to_owned())
        );
        assert_eq!(err.error.to_string(), "Bad credentials");
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_rejected_without_body() {
        let session = SessionStore::in_memory();
        let client = auth_client(
            session.clone(),
            StubHttpClient::new(expected_login(), response_with_status(500, "")),
        );

        let err = client.login("admin", "hunter2").await.unwrap_err();

        assert_eq!(err.error, SessionError::LoginFailed("Login failed".to_owned()));
    }

    #[tokio::test]
    async fn test_login_transport_failure() {
        let session = SessionStore::in_memory();
        let notifications = counting_listener(&session);
        let client = auth_client(
            session.clone(),
            FailingHttpClient("connection refused".to_owned()),
        );

        let err = client.login("admin", "hunter2").await.unwrap_err();

        assert_eq!(err.error, SessionError::LoginFailed("Login failed".to_owned()));
        assert!(!session.is_authenticated());
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_with_unparsable_success_body() {
        let session = SessionStore::in_memory();
        let client = auth_client(
            session.clone(),
            StubHttpClient::new(expected_login(), response_with_status(200, "not json")),
        );

        let err = client.login("admin", "hunter2").await.unwrap_err();

        assert_eq!(err.error, SessionError::LoginFailed("Login failed".to_owned()));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_me_without_token_makes_no_network_call() {
        let session = SessionStore::in_memory();
        // A transport failure would surface as `NotAuthenticated`, so the
        // `NoToken` assertion also proves the network was never touched.
        let client = auth_client(
            session,
            FailingHttpClient("must not be reached".to_owned()),
        );

        let err = client.me().await.unwrap_err();

        assert_eq!(err.error, SessionError::NoToken);
        assert_eq!(err.error.to_string(), "No token");
    }

    #[tokio::test]
    async fn test_me_returns_user_info() {
        let session = SessionStore::in_memory();
        session.set_token("token-1").unwrap();
        let client = auth_client(
            session,
            StubHttpClient::new(
                ExpectedRequest {
                    method: Method::GET,
                    url: format!("{AUTH_URL}/me"),
                    bearer: Some("token-1".to_owned()),
                    body: None,
                },
                response_with_json(200, json!({"username": "admin"})),
            ),
        );

        let user = client.me().await.unwrap();

        assert_eq!(
            user,
            UserInfo {
                username: "admin".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_me_rejected_token() {
        let session = SessionStore::in_memory();
        session.set_token("stale-token").unwrap();
        let client = auth_client(
            session,
            StubHttpClient::new(
                ExpectedRequest {
                    method: Method::GET,
                    url: format!("{AUTH_URL}/me"),
                    bearer: Some("stale-token".to_owned()),
                    body: None,
                },
                response_with_status(401, ""),
            ),
        );

        let err = client.me().await.unwrap_err();

        assert_eq!(err.error, SessionError::NotAuthenticated);
    }
}
