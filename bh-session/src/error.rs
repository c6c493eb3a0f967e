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

/// Top-level error type for the session crate.
///
/// The [`std::fmt::Display`] output of each variant is the user-facing
/// message; callers surface it verbatim.
#[derive(strum_macros::Display, Debug, PartialEq)]
pub enum SessionError {
    /// The login round-trip was rejected or failed; carries the message to
    /// show the user.
    #[strum(to_string = "{0}")]
    LoginFailed(String),

    /// A token-requiring call was made with no stored token.
    #[strum(to_string = "No token")]
    NoToken,

    /// The backend rejected the stored token.
    #[strum(to_string = "Not authenticated")]
    NotAuthenticated,

    /// The token storage substrate failed.
    #[strum(to_string = "Token storage error: {0}")]
    Storage(String),

    /// The configured authentication base URL cannot be extended into
    /// endpoint URLs.
    #[strum(to_string = "Invalid auth URL: {0}")]
    InvalidUrl(String),
}

impl bherror::BhError for SessionError {}

/// Result type used across the crate.
pub type Result<T> = bherror::Result<T, SessionError>;
