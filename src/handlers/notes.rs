use axum::{
    Extension, Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;

use std::sync::Arc;

use super::{AppState, internal_error};
use crate::{
    dto::{UpdateNoteForm, UpdateNoteResponse},
    session::{FlashLevel, SessionId},
};

/// Saves the edit form posted in the background by the page script.
///
/// The reply is always `{"success": bool}` so the script can decide whether
/// to reload the home page.
#[utoipa::path(
    post,
    path = "/notes/",
    request_body(
        content = UpdateNoteForm,
        content_type = "application/x-www-form-urlencoded"
    ),
    params(
        ("X-CSRFToken" = Option<String>, Header, description = "Anti-forgery token of the session")
    ),
    responses(
        (status = 200, description = "Note updated successfully", body = UpdateNoteResponse),
        (status = 400, description = "Invalid form", body = UpdateNoteResponse),
        (status = 403, description = "CSRF verification failed"),
        (status = 404, description = "Note not found", body = UpdateNoteResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    headers: HeaderMap,
    Form(form): Form<UpdateNoteForm>,
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

    let id = match form.validate() {
        Ok(id) => id,
        Err(errors) => {
            tracing::warn!("Rejected note update: {} invalid field(s)", errors.len());
            return (
                StatusCode::BAD_REQUEST,
                Json(UpdateNoteResponse { success: false }),
            )
                .into_response();
        }
    };

    match state
        .notes
        .update_note(user.id, id, form.title.trim(), form.body.trim())
        .await
    {
        Ok(Some(note)) => {
            tracing::info!("User {} updated note {}", user.id, note.id);
            state
                .flash(&session, FlashLevel::Success, "Note updated successfully")
                .await;
            Json(UpdateNoteResponse { success: true }).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(UpdateNoteResponse { success: false }),
        )
            .into_response(),
        Err(e) => internal_error("failed to update note", &e),
    }
}
