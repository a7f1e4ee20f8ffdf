use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    services::tokens,
    state::AppState,
};

/// The authenticated caller, inserted as a request extension once the
/// access token checks out.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

/// Extracts the access token from the cookie jar or the Authorization
/// header, cookie first.
fn extract_access_token(cookies: &Cookies, request: &Request<Body>) -> Option<String> {
    if let Some(cookie) = cookies.get("access_token") {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// A middleware that requires a valid access token.
///
/// Stateless by design: the token is verified against the signing key and
/// its expiry, with no store lookup on the hot path. Session tokens are
/// rejected here even when validly signed.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_access_token(&cookies, &request).ok_or_else(|| {
        tracing::warn!("❌ No access token in cookie or Authorization header");
        AppError::Authentication("Missing access token".to_string())
    })?;

    let claims = tokens::validate_access(&state.token_keys, &token)?;

    tracing::debug!("✅ User authenticated: {}", claims.sub);

    request.extensions_mut().insert(CurrentUser { id: claims.sub });

    Ok(next.run(request).await)
}
