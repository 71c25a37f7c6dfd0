use std::fmt::Display;

use crate::{
    dom::{Document, DocumentExt},
    error::ClientError,
};

pub const NOTE_ID_FIELD: &str = "note_id";
pub const EDIT_TITLE_FIELD: &str = "edit-title";
pub const EDIT_BODY_FIELD: &str = "edit-body";
pub const MODAL_TOGGLE: &str = "btnModal";

pub fn title_element_id(note_id: impl Display) -> String {
    format!("title-{note_id}")
}

pub fn body_element_id(note_id: impl Display) -> String {
    format!("body-{note_id}")
}

/// Values loaded into the edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub note_id: String,
    pub title: String,
    pub body: String,
}

/// Copies the displayed title and body of a note into the edit form and
/// opens the edit modal.
///
/// Nothing is written unless both display elements exist.
pub fn show_edit_modal<D>(doc: &D, note_id: impl Display) -> Result<EditDraft, ClientError>
where
    D: Document + ?Sized,
{
    let note_id = note_id.to_string();
    let title = doc.require_text(&title_element_id(&note_id))?;
    let body = doc.require_text(&body_element_id(&note_id))?;

    doc.require_set_value(NOTE_ID_FIELD, &note_id)?;
    doc.require_set_value(EDIT_TITLE_FIELD, &title)?;
    doc.require_set_value(EDIT_BODY_FIELD, &body)?;
    doc.require_click(MODAL_TOGGLE)?;

    tracing::debug!("Loaded note {} into the edit modal", note_id);

    Ok(EditDraft {
        note_id,
        title,
        body,
    })
}
