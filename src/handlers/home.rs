use axum::{
    Extension, Form,
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_macros::debug_handler;

use std::sync::Arc;

use super::{AppState, internal_error};
use crate::{
    dto::{HomeQuery, NoteForm},
    html,
    session::{FlashLevel, SessionId},
};

/// Lists the signed-in user's notes. `?id=<id>&action=delete` deletes a note
/// first and redirects back to the listing.
#[debug_handler]
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<HomeQuery>,
) -> Response {
    let user = match state.require_user(&session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    if let Some(target) = query.delete_target() {
        let deleted = match target.trim().parse::<i64>() {
            Ok(id) => match state.notes.delete_note(user.id, id).await {
                Ok(deleted) => deleted,
                Err(e) => return internal_error("failed to delete note", &e),
            },
            Err(_) => false,
        };

        if deleted {
            tracing::info!("User {} deleted note {}", user.id, target);
            state
                .flash(&session, FlashLevel::Success, "Note deleted successfully")
                .await;
        } else {
            state
                .flash(&session, FlashLevel::Error, "Note not found")
                .await;
        }
        return Redirect::to("/").into_response();
    }

    let page = match state.notes.page(user.id, query.page.as_deref()).await {
        Ok(page) => page,
        Err(e) => return internal_error("failed to list notes", &e),
    };

    let ctx = state.page_context(&session).await;
    Html(html::home_page(&ctx, &page)).into_response()
}

#[debug_handler]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    headers: HeaderMap,
    Form(form): Form<NoteForm>,
) -> Response {
    if let Some(rejection) = state
        .check_csrf(&session, &headers, &form.csrfmiddlewaretoken)
        .await
    {
        return rejection;
    }

    let user = match state.require_user(&session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    if let Err(errors) = form.validate() {
        state.flash_errors(&session, &errors).await;
        return Redirect::to("/").into_response();
    }

    match state
        .notes
        .create_note(user.id, form.title.trim(), form.body.trim())
        .await
    {
        Ok(note) => {
            tracing::info!("User {} created note {}", user.id, note.id);
            state
                .flash(&session, FlashLevel::Success, "Note added successfully")
                .await;
            Redirect::to("/").into_response()
        }
        Err(e) => internal_error("failed to create note", &e),
    }
}
