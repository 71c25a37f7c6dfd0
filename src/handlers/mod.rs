pub mod auth;
pub mod home;
pub mod notes;

#[cfg(test)]
mod tests;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    config::Config,
    dto::{FieldError, UpdateNoteForm, UpdateNoteResponse},
    hasher::Hasher,
    html::PageContext,
    repository::Repository,
    service::{NoteService, UserService},
    session::{self, FlashLevel, SessionId, SessionStore, SessionUser},
};

pub const CSRF_HEADER: &str = "x-csrftoken";

pub struct AppState {
    pub config: Config,
    pub notes: NoteService,
    pub users: UserService,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, repo: Arc<dyn Repository>, hasher: Arc<dyn Hasher>) -> Self {
        Self {
            notes: NoteService::new(Arc::clone(&repo), config.page_size),
            users: UserService::new(repo, hasher),
            sessions: SessionStore::new(config.session_ttl)
                .with_limits(config.fresh_session_ttl, config.max_sessions),
            config,
        }
    }

    /// Collects what a rendered page needs, consuming pending flashes.
    pub async fn page_context(&self, session: &SessionId) -> PageContext {
        PageContext {
            user: self.sessions.user(session).await,
            flashes: self.sessions.take_flashes(session).await,
            csrf_token: self.sessions.csrf_token(session).await,
        }
    }

    pub async fn flash(&self, session: &SessionId, level: FlashLevel, text: impl Into<String>) {
        self.sessions.push_flash(session, level, text).await;
    }

    pub async fn flash_errors(&self, session: &SessionId, errors: &[FieldError]) {
        for error in errors {
            self.sessions
                .push_flash(session, FlashLevel::Error, error.to_string())
                .await;
        }
    }

    /// Checks the token from the `X-CSRFToken` header, or from the form
    /// field when the header is absent. Returns the rejection to send back.
    pub async fn check_csrf(
        &self,
        session: &SessionId,
        headers: &HeaderMap,
        form_token: &str,
    ) -> Option<Response> {
        let presented = headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(form_token);

        if self.sessions.verify_csrf(session, presented).await {
            None
        } else {
            tracing::warn!("Rejected request with missing or invalid CSRF token");
            Some(
                (
                    StatusCode::FORBIDDEN,
                    "CSRF verification failed. Request aborted.",
                )
                    .into_response(),
            )
        }
    }

    /// The signed-in user, or the redirect to the login page.
    pub async fn require_user(&self, session: &SessionId) -> Result<SessionUser, Response> {
        self.sessions
            .user(session)
            .await
            .ok_or_else(|| Redirect::to("/login").into_response())
    }
}

pub fn internal_error(context: &str, e: &dyn std::error::Error) -> Response {
    tracing::error!("{}: {}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

#[derive(OpenApi)]
#[openapi(
    paths(notes::update_note),
    components(schemas(UpdateNoteForm, UpdateNoteResponse)),
    tags(
        (name = "notes", description = "Background note editing")
    )
)]
pub struct ApiDoc;

async fn openapi() -> Response {
    Json(ApiDoc::openapi()).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/", get(home::index).post(home::create_note))
        .route("/notes/", post(notes::update_note))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            session::session_layer,
        ))
        .route("/api-doc/openapi.json", get(openapi))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
