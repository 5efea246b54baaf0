use http::header::AUTHORIZATION;
use http::HeaderMap;

use roomie_core::AuthCredential;

/// Header carrying the caller's identity (a phone number on the chat platform).
pub const IDENTITY_HEADER: &str = "x-caller-identity";

/// Reads `Authorization: Bearer <token>` and the identity header. Missing or malformed
/// headers leave the matching field empty; the gate decides what that means.
pub fn credential_from_headers(headers: &HeaderMap) -> AuthCredential {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);
    let identity = headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|identity| !identity.is_empty())
        .map(str::to_string);

    AuthCredential { token, identity }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
