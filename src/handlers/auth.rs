use axum::{
    Extension, Form,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use axum_macros::debug_handler;

use std::sync::Arc;

use super::{AppState, internal_error};
use crate::{
    dto::{LoginForm, SignupForm},
    html,
    service::ServiceError,
    session::{self, FlashLevel, SessionId, SessionUser},
};

#[debug_handler]
pub async fn signup_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Response {
    let ctx = state.page_context(&session).await;
    Html(html::signup_page(&ctx)).into_response()
}

#[debug_handler]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Response {
    if let Some(rejection) = state
        .check_csrf(&session, &headers, &form.csrfmiddlewaretoken)
        .await
    {
        return rejection;
    }

    match state.users.username_taken(form.username.trim()).await {
        Ok(true) => {
            state
                .flash(&session, FlashLevel::Error, "User already exists")
                .await;
            return Redirect::to("/signup").into_response();
        }
        Ok(false) => {}
        Err(e) => return internal_error("failed to look up user", &e),
    }

    if let Err(errors) = form.validate() {
        state.flash_errors(&session, &errors).await;
        return Redirect::to("/signup").into_response();
    }

    match state
        .users
        .register(form.username.trim(), form.email.trim(), &form.password)
        .await
    {
        Ok(user) => {
            tracing::info!("Registered user '{}'", user.username);
            state
                .flash(&session, FlashLevel::Success, "You have successfully signed up!")
                .await;
            Redirect::to("/login").into_response()
        }
        Err(ServiceError::AlreadyExists) => {
            state
                .flash(&session, FlashLevel::Error, "User already exists")
                .await;
            Redirect::to("/signup").into_response()
        }
        Err(e) => internal_error("failed to register user", &e),
    }
}

#[debug_handler]
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
) -> Response {
    let ctx = state.page_context(&session).await;
    Html(html::login_page(&ctx)).into_response()
}

#[debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if let Some(rejection) = state
        .check_csrf(&session, &headers, &form.csrfmiddlewaretoken)
        .await
    {
        return rejection;
    }

    if let Err(errors) = form.validate() {
        state.flash_errors(&session, &errors).await;
        return Redirect::to("/login").into_response();
    }

    match state
        .users
        .authenticate(form.username.trim(), &form.password)
        .await
    {
        Ok(Some(user)) => {
            let signed_in = SessionUser {
                id: user.id,
                username: user.username,
            };
            let Some(session) = state.sessions.login(&session, signed_in).await else {
                tracing::warn!("Session ended before login completed");
                return Redirect::to("/login").into_response();
            };
            tracing::info!("User {} logged in", user.id);
            state
                .flash(&session, FlashLevel::Success, "You have successfully logged in!")
                .await;
            let cookie = session::session_cookie(&state.config.session_cookie, &session);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Ok(None) => {
            state
                .flash(&session, FlashLevel::Error, "User does not exist")
                .await;
            Redirect::to("/login").into_response()
        }
        Err(e) => internal_error("failed to authenticate user", &e),
    }
}

#[debug_handler]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    jar: CookieJar,
) -> Response {
    state.sessions.logout(&session).await;
    let cookie = Cookie::build((state.config.session_cookie.clone(), "")).path("/");
    (jar.remove(cookie), Redirect::to("/")).into_response()
}
