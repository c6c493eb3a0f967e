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

//! This crate manages the bearer-token login session of TBTL's
//! administration clients.
//!
//! The session is held by a [`SessionStore`]: the single source of truth for
//! "is there a logged-in session", persisted through a swappable
//! [`TokenStore`] substrate.  Every state transition (login, logout) first
//! commits to storage and then notifies every registered auth-change
//! listener, so independently wired components can re-evaluate their gating
//! without polling a global.
//!
//! # Details
//!
//! * [`SessionStore`] -- token reads, persist-then-broadcast writes and the
//!   auth-change observer list.
//! * [`TokenStore`] -- the storage substrate, with [`FileTokenStore`] and
//!   [`MemoryTokenStore`] implementations.
//! * [`AuthClient`] -- performs the `/login` and `/me` round-trips against
//!   the configured authentication endpoints and writes through the
//!   [`SessionStore`].
//!
//! Note that there is no cross-process signalling: listeners observe
//! transitions within the current process only, which matches the
//! single-tab scope of the administration clients.

use std::sync::{Arc, Mutex};

pub use auth::{AuthClient, UserInfo};
pub use error::{Result, SessionError};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};

use bherror::traits::ForeignError as _;

mod auth;
mod error;
mod storage;

type AuthChangeListener = Box<dyn Fn() + Send + Sync>;

/// Cheaply cloneable handle to the process-wide authentication state.
///
/// All clones share the same [`TokenStore`] and the same listener registry,
/// so a logout observed through one clone is observed through all of them.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    store: Box<dyn TokenStore>,
    listeners: Mutex<Vec<AuthChangeListener>>,
}

impl SessionStore {
    /// Construct a session store persisting through `store`.
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Box::new(store),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Construct a session store backed by a [`MemoryTokenStore`].
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    /// Synchronous read of the persisted token.
    ///
    /// A failing storage substrate reads as "no session"; the failure is
    /// logged.
    pub fn token(&self) -> Option<String> {
        match self.inner.store.load() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!("failed to read the session token: {err}");
                None
            }
        }
    }

    /// Whether a non-empty token is currently persisted.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some_and(|token| !token.is_empty())
    }

    /// Persist `token` and notify the auth-change listeners.
    ///
    /// Listeners are notified only after the storage write has completed.
    pub fn set_token(&self, token: &str) -> Result<()> {
        self.inner
            .store
            .store(token)
            .foreign_err(|| SessionError::Storage("failed to persist the session token".to_owned()))?;
        self.notify();
        Ok(())
    }

    /// Unconditionally clear the persisted token and notify the auth-change
    /// listeners.
    ///
    /// Idempotent: clearing an absent token is a no-op storage-wise, and the
    /// broadcast fires regardless.  A failing storage substrate is logged
    /// and never prevents the broadcast, since this is also invoked
    /// mid-request when the backend revokes a session.
    pub fn logout(&self) {
        if let Err(err) = self.inner.store.clear() {
            tracing::warn!("failed to clear the session token: {err}");
        }
        self.notify();
    }

    /// Register `listener` to be invoked on every login/logout transition.
    ///
    /// Listeners registered before a transition observe exactly one
    /// notification per transition, after the persistence write completes.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .push(Box::new(listener));
    }

    fn notify(&self) {
        let listeners = self.inner.listeners.lock().expect("listener lock poisoned");
        for listener in listeners.iter() {
            listener();
        }
    }
}
