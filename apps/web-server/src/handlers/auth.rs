//! Account pages: signup, login and logout.

use actix_web::{HttpResponse, web};
use quill_core::domain::User;
use quill_core::forms::{FormErrors, LoginForm, SignupForm};
use serde::Deserialize;

use super::render;
use crate::middleware::auth::{
    OptionalIdentity, removal_cookie, safe_next, session_cookie,
};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;
use crate::views;

const SIGNUP_FIELDS: &[&str] = &["username", "email", "password"];
const LOGIN_FIELDS: &[&str] = &["username", "password"];

/// `?next=` carried through the login form.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// GET /auth/signup/
pub async fn signup_form(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    signup_page(&state, identity, &SignupForm::default(), None)
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    form: web::Form<SignupForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    match state.accounts.signup(&form).await? {
        Ok(user) => start_session(&state, &user, "/"),
        Err(errors) => signup_page(&state, identity, &form, Some(&errors)),
    }
}

/// GET /auth/login/
pub async fn login_form(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<NextQuery>,
) -> AppResult<HttpResponse> {
    login_page(&state, identity, &LoginForm::default(), query.next.as_deref(), None)
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<NextQuery>,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    match state.accounts.authenticate(&form).await? {
        Ok(user) => start_session(&state, &user, safe_next(query.next.as_deref())),
        Err(errors) => {
            tracing::info!(username = %form.username, "Failed login attempt");
            login_page(&state, identity, &form, query.next.as_deref(), Some(&errors))
        }
    }
}

/// GET|POST /auth/logout/
pub async fn logout(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let html = state
        .templates
        .render("users/logged_out.html", &views::base_context(None))?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .content_type("text/html; charset=utf-8")
        .body(html))
}

/// Issue a session cookie for `user` and send them to `location`.
fn start_session(state: &AppState, user: &User, location: &str) -> AppResult<HttpResponse> {
    let token = state
        .tokens
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, "Session started");

    Ok(HttpResponse::Found()
        .cookie(session_cookie(
            token,
            state.tokens.expiration_seconds(),
            state.cookie_secure,
        ))
        .insert_header((actix_web::http::header::LOCATION, location))
        .finish())
}

fn signup_page(
    state: &AppState,
    identity: OptionalIdentity,
    form: &SignupForm,
    errors: Option<&FormErrors>,
) -> AppResult<HttpResponse> {
    let mut ctx = views::base_context(identity.as_ref());
    ctx.insert("form", form);
    ctx.insert("errors", &views::errors(errors, SIGNUP_FIELDS));
    render(state, "users/signup.html", &ctx)
}

fn login_page(
    state: &AppState,
    identity: OptionalIdentity,
    form: &LoginForm,
    next: Option<&str>,
    errors: Option<&FormErrors>,
) -> AppResult<HttpResponse> {
    let mut ctx = views::base_context(identity.as_ref());
    ctx.insert("form", form);
    ctx.insert("next", next.unwrap_or_default());
    ctx.insert("errors", &views::errors(errors, LOGIN_FIELDS));
    render(state, "users/login.html", &ctx)
}
