//! Access control for Docgate.
//!
//! This crate provides the [`Role`] and [`TokenTable`] types used to decide
//! which requests a bearer token may make. Token issuance is out of scope:
//! the table is filled from configuration at boot and never changes.

#![warn(missing_docs)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access: views, cursors, spec listings.
    User,
    /// Everything, including bulk writes and ad-hoc queries.
    Admin,
}

/// Authentication failures, rendered verbatim to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("Missing header: Authorization")]
    MissingHeader,
    /// The token is unknown, malformed, or lacks the required role.
    #[error("403 - Unauthorized")]
    Unauthorized,
}

/// Static mapping from bearer token to role.
///
/// ```ignore
/// use docgate_security::{Role, TokenTable};
///
/// let tokens = TokenTable::new()
///     .with_token("admin_token", Role::Admin)
///     .with_token("user_token", Role::User);
///
/// assert_eq!(tokens.authorize(Some("Bearer admin_token"), Role::Admin), Ok(Role::Admin));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, Role>,
}

impl TokenTable {
    /// Create an empty table; every request is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token. A token listed twice keeps the higher role.
    pub fn with_token(mut self, token: impl Into<String>, role: Role) -> Self {
        let entry = self.tokens.entry(token.into()).or_insert(role);
        *entry = (*entry).max(role);
        self
    }

    /// Build a table from token lists.
    pub fn from_lists<A, U>(admin_tokens: A, user_tokens: U) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        let table = user_tokens
            .into_iter()
            .fold(Self::new(), |t, token| t.with_token(token, Role::User));
        admin_tokens
            .into_iter()
            .fold(table, |t, token| t.with_token(token, Role::Admin))
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is configured.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Resolve the role behind an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingHeader`] when `header` is `None`,
    /// [`AuthError::Unauthorized`] when it is not `Bearer <known token>`.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Role, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let token = bearer_token(header).ok_or(AuthError::Unauthorized)?;
        self.tokens
            .get(token)
            .copied()
            .ok_or(AuthError::Unauthorized)
    }

    /// Resolve the caller's role and require at least `required`.
    ///
    /// # Errors
    ///
    /// As [`TokenTable::authenticate`], plus [`AuthError::Unauthorized`] when the
    /// role is lower than `required`.
    pub fn authorize(&self, header: Option<&str>, required: Role) -> Result<Role, AuthError> {
        let role = self.authenticate(header)?;
        if role < required {
            return Err(AuthError::Unauthorized);
        }
        Ok(role)
    }
}

/// Extract the token from `Bearer <token>` (scheme matched case-insensitively).
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
