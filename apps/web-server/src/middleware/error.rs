//! Error handling - domain failures to HTTP statuses, statuses to HTML pages.

use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{HttpMessage, HttpResponse, ResponseError, web};
use quill_core::error::{DomainError, RepoError};
use quill_shared::ErrorResponse;
use thiserror::Error;

use crate::middleware::auth::Identity;
use crate::observability::RequestId;
use crate::state::AppState;
use crate::views;

/// Application-level error type.
///
/// The response carries no body of its own; [`error_pages`] renders the
/// matching HTML page from the [`ErrorResponse`] stored in its extensions.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
            AppError::Template(err) => {
                tracing::error!(error = ?err, "Failed to render template");
                ErrorResponse::internal_error()
            }
        };

        let mut res = HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(error.title.clone());
        res.extensions_mut().insert(error);
        res
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, key } => {
                AppError::NotFound(format!("No {} matches \"{}\".", entity_type, key))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Replace bare 404/500 responses with the site's error pages.
pub fn error_pages<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(StatusCode::NOT_FOUND, render_not_found)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, render_server_error)
}

fn render_not_found<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let error = res
        .response()
        .extensions()
        .get::<ErrorResponse>()
        .cloned()
        .unwrap_or_else(|| ErrorResponse::not_found("No route matches the requested path."))
        .with_instance(res.request().path());

    render_page(res, "core/404.html", |ctx, _| ctx.insert("error", &error))
}

fn render_server_error<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_page(res, "core/500.html", |ctx, res| {
        let request_id = res
            .request()
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string());
        ctx.insert("request_id", &request_id);
    })
}

/// Swap the body of `res` for `template`, keeping status and headers.
/// Falls back to the original response if the page itself cannot render.
fn render_page<B>(
    res: ServiceResponse<B>,
    template: &str,
    fill: impl FnOnce(&mut tera::Context, &ServiceResponse<B>),
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let Some(state) = res.request().app_data::<web::Data<AppState>>().cloned() else {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    };

    let identity = Identity::from_session(res.request()).ok();
    let mut ctx = views::base_context(identity.as_ref());
    fill(&mut ctx, &res);

    let html = match state.templates.render(template, &ctx) {
        Ok(html) => html,
        Err(e) => {
            tracing::error!(error = ?e, template, "Failed to render error page");
            return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
        }
    };

    let (req, res) = res.into_parts();
    let mut res = res.set_body(html);
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/html; charset=utf-8"),
    );

    let res = ServiceResponse::new(req, res)
        .map_into_boxed_body()
        .map_into_right_body();
    Ok(ErrorHandlerResponse::Response(res))
}
