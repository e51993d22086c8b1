//! Bearer credential extractor

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::{AuthError, CredentialClaims, DomainError, UserId};

/// Extractor that requires a valid bearer credential.
///
/// Only the credential is checked; the user record is not loaded, so a block
/// takes effect once outstanding credentials expire.
#[derive(Debug, Clone)]
pub struct RequireClaims {
    pub user_id: UserId,
    pub claims: CredentialClaims,
}

impl FromRequestParts<AppState> for RequireClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;

        let claims = state.credentials().verify(&token).map_err(|e| {
            debug!(error = %e, "Bearer credential rejected");
            ApiError::from(e)
        })?;

        let user_id = claims
            .user_id()
            .parse::<UserId>()
            .map_err(|_| ApiError::from(DomainError::from(AuthError::MalformedClaims)))?;

        Ok(RequireClaims { user_id, claims })
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
    }

    Err(ApiError::unauthorized(
        "Authentication required. Provide a credential via 'Authorization: Bearer <token>'",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        let token = extract_bearer_token(&headers_with("Bearer v2.local.abc")).unwrap();
        assert_eq!(token, "v2.local.abc");
    }

    #[test]
    fn test_missing_header() {
        let err = extract_bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_other_scheme_rejected() {
        assert!(extract_bearer_token(&headers_with("Basic dXNlcjpwYXNz")).is_err());
    }

    #[test]
    fn test_blank_bearer_rejected() {
        assert!(extract_bearer_token(&headers_with("Bearer    ")).is_err());
    }
}
