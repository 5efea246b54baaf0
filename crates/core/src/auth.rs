//! Credential checks for every inbound tool call.
//!
//! The gate holds one shared secret and, optionally, one bound identity (the listing owner's
//! phone number in the usual deployment). Tokens are compared through SHA-256 digests so the
//! comparison time does not depend on where the first differing byte sits.

use std::collections::BTreeSet;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;
use crate::errors::AuthError;

/// Identity used when no binding is configured and the caller presents none.
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

/// What a caller presents with each request.
#[derive(Clone, Default)]
pub struct AuthCredential {
    pub token: Option<String>,
    pub identity: Option<String>,
}

impl AuthCredential {
    pub fn new(token: impl Into<String>, identity: Option<String>) -> Self {
        Self { token: Some(token.into()), identity }
    }
}

impl fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("identity", &self.identity)
            .finish()
    }
}

/// An authenticated caller. Only [`AuthGate::authorize`] produces one outside tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub identity: String,
    pub operator: bool,
}

impl Caller {
    pub fn new(identity: impl Into<String>) -> Self {
        Self { identity: identity.into(), operator: false }
    }

    pub fn operator(identity: impl Into<String>) -> Self {
        Self { identity: identity.into(), operator: true }
    }

    /// Owners may always modify their listings; operators may modify any.
    pub fn can_modify(&self, owner_identity: &str) -> bool {
        self.operator || self.identity == owner_identity
    }
}

#[derive(Clone)]
pub struct AuthGate {
    token_digest: [u8; 32],
    bound_identity: Option<String>,
    operators: BTreeSet<String>,
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("token_digest", &"[REDACTED]")
            .field("bound_identity", &self.bound_identity)
            .field("operators", &self.operators)
            .finish()
    }
}

impl AuthGate {
    pub fn new(
        token: &SecretString,
        bound_identity: Option<String>,
        operators: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            token_digest: digest(token.expose_secret()),
            bound_identity: bound_identity
                .map(|identity| normalize_identity(&identity))
                .filter(|identity| !identity.is_empty()),
            operators: operators.into_iter().map(|identity| normalize_identity(&identity)).collect(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.token, config.identity.clone(), config.operator_identities.clone())
    }

    pub fn bound_identity(&self) -> Option<&str> {
        self.bound_identity.as_deref()
    }

    /// Checks the token first, then the identity binding. Pure: no logging, no state.
    pub fn authorize(&self, credential: &AuthCredential) -> Result<Caller, AuthError> {
        let presented = credential.token.as_deref().map(str::trim).unwrap_or_default();
        if presented.is_empty() || !constant_time_eq(&digest(presented), &self.token_digest) {
            return Err(AuthError::InvalidToken);
        }

        let presented_identity = credential
            .identity
            .as_deref()
            .map(normalize_identity)
            .filter(|identity| !identity.is_empty());

        let identity = match (&self.bound_identity, presented_identity) {
            (Some(bound), Some(presented)) if *bound == presented => presented,
            (Some(_), _) => return Err(AuthError::IdentityMismatch),
            (None, Some(presented)) => presented,
            (None, None) => ANONYMOUS_IDENTITY.to_string(),
        };

        let operator = self.operators.contains(&identity);
        Ok(Caller { identity, operator })
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(left: &[u8; 32], right: &[u8; 32]) -> bool {
    left.iter().zip(right.iter()).fold(0u8, |acc, (l, r)| acc | (l ^ r)) == 0
}

/// Phone-number identities arrive with and without spaces or dashes.
fn normalize_identity(identity: &str) -> String {
    identity.trim().chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}
