//! Session authentication - cookie/Bearer token extractors.

use std::future::{Ready, ready};

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;
use uuid::Uuid;

use quill_core::ports::{AuthError, TokenClaims};

use crate::state::AppState;

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE: &str = "quill_session";

/// Where anonymous visitors are sent.
pub const LOGIN_URL: &str = "/auth/login/";

/// Characters of `next` left as-is in the login redirect.
const NEXT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Authenticated user identity extractor.
///
/// Handlers taking an `Identity` are login-only: anonymous requests are
/// redirected to the login page with the original path in `next`.
/// ```ignore
/// async fn post_create(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

impl Identity {
    /// Resolve the session carried by `req`, if any.
    pub fn from_session(req: &HttpRequest) -> Result<Self, AuthError> {
        let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
            tracing::error!("AppState not found in app data");
            AuthError::InvalidToken("Server configuration error".to_string())
        })?;

        let token = session_token(req)?;
        state.tokens.validate_token(&token).map(Identity::from)
    }
}

/// Token from the session cookie, or from an `Authorization: Bearer` header.
fn session_token(req: &HttpRequest) -> Result<String, AuthError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Ok(cookie.value().to_string());
    }

    let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
        return Err(AuthError::MissingAuth);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))
}

/// Anonymous access to a login-only page.
#[derive(Debug, Error)]
#[error("login required for {next}")]
pub struct LoginRequired {
    /// Path (and query) to come back to after logging in.
    pub next: String,
}

impl ResponseError for LoginRequired {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, login_redirect_url(&self.next)))
            .finish()
    }
}

/// `/auth/login/?next=<next>` with `next` percent-encoded, `/` kept.
pub fn login_redirect_url(next: &str) -> String {
    format!("{LOGIN_URL}?next={}", utf8_percent_encode(next, NEXT_ENCODE_SET))
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path
        }
        _ => "/",
    }
}

impl FromRequest for Identity {
    type Error = LoginRequired;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = Identity::from_session(req).map_err(|e| {
            tracing::debug!(path = %req.path(), reason = %e, "Anonymous access to login-only page");
            let next = match req.query_string() {
                "" => req.path().to_string(),
                query => format!("{}?{}", req.path(), query),
            };
            LoginRequired { next }
        });

        ready(result)
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn as_ref(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(Identity::from_session(req).ok())))
    }
}

/// Session cookie carrying `token` for `max_age_seconds`.
pub fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

/// Cookie that clears the session in the browser.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_keeps_slashes() {
        assert_eq!(login_redirect_url("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_redirect_url("/posts/1/edit/"),
            "/auth/login/?next=/posts/1/edit/"
        );
    }

    #[test]
    fn test_login_redirect_escapes_query() {
        assert_eq!(
            login_redirect_url("/create/?a=b"),
            "/auth/login/?next=/create/%3Fa%3Db"
        );
    }

    #[test]
    fn test_safe_next_rejects_foreign_targets() {
        assert_eq!(safe_next(Some("/posts/1/")), "/posts/1/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
