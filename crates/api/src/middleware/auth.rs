//! Bearer-token authentication for the protected routes.
//!
//! The middleware turns a verified token into an [`Identity`] and parks it
//! in the request extensions; handlers take it back out with [`AuthUser`].

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use groupbuy_core::access::Identity;
use groupbuy_shared::{JwtError, JwtService};

use crate::AppState;

/// Why a request was turned away before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// The token verified but has expired.
    Expired,
    /// Bad signature, untrusted issuer or unreadable claims.
    InvalidToken,
    /// The role claim names no known role.
    UnknownRole,
    /// A handler asked for an identity on an unauthenticated route.
    NoIdentity,
}

impl AuthRejection {
    const fn code_and_message(self) -> (&'static str, &'static str) {
        match self {
            Self::MissingToken => (
                "missing_token",
                "Authorization header with Bearer token is required",
            ),
            Self::Expired => ("token_expired", "Token has expired"),
            Self::InvalidToken => ("invalid_token", "Invalid or malformed token"),
            Self::UnknownRole => ("invalid_token", "Token carries an unknown role"),
            Self::NoIdentity => ("unauthorized", "Authentication required"),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (error, message) = self.code_and_message();
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": error, "message": message })),
        )
            .into_response()
    }
}

impl From<JwtError> for AuthRejection {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::Expired,
            JwtError::UntrustedIssuer | JwtError::Malformed(_) | JwtError::Signing(_) => {
                Self::InvalidToken
            }
        }
    }
}

/// Token after a case-insensitive `Bearer` scheme.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the caller's identity from the request headers.
fn authenticate(
    jwt: &JwtService,
    headers: &HeaderMap,
) -> Result<Identity, AuthRejection> {
    let token = bearer_token(headers).ok_or(AuthRejection::MissingToken)?;
    let claims = jwt.verify(token)?;
    Identity::from_claims(&claims).map_err(|e| {
        tracing::warn!(user_id = %claims.sub, tenant_id = %claims.tid, error = %e, "Rejected token");
        AuthRejection::UnknownRole
    })
}

/// Rejects requests without a valid token; otherwise stores the caller's
/// [`Identity`] for the handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let identity = authenticate(&state.jwt_service, request.headers())?;
    tracing::debug!(
        user_id = %identity.user_id,
        tenant_id = %identity.tenant_id,
        role = identity.role.as_str(),
        "Authenticated request"
    );
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or(AuthRejection::NoIdentity)
    }
}
