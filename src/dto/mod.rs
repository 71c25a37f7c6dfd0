use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use std::fmt;

pub const USERNAME_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 250;
pub const PASSWORD_MAX_LEN: usize = 50;
pub const TITLE_MAX_LEN: usize = 250;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Required, at most `max` characters once surrounding whitespace is
/// stripped.
fn check_text(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    max: Option<usize>,
    required_message: &str,
    too_long: impl FnOnce(usize) -> String,
) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError::new(field, required_message));
        return;
    }

    let len = value.chars().count();
    if max.is_some_and(|max| len > max) {
        errors.push(FieldError::new(field, too_long(len)));
    }
}

fn too_long_message(max: usize) -> impl FnOnce(usize) -> String {
    move |len| format!("Ensure this value has at most {max} characters (it has {len}).")
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    !local.is_empty()
        && !local.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains(char::is_whitespace)
        && !domain.contains('@')
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub csrfmiddlewaretoken: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        check_text(
            &mut errors,
            "username",
            &self.username,
            Some(USERNAME_MAX_LEN),
            REQUIRED,
            too_long_message(USERNAME_MAX_LEN),
        );
        check_text(
            &mut errors,
            "email",
            &self.email,
            Some(EMAIL_MAX_LEN),
            REQUIRED,
            too_long_message(EMAIL_MAX_LEN),
        );
        if !self.email.trim().is_empty() && !is_valid_email(self.email.trim()) {
            errors.push(FieldError::new("email", "Enter a valid email address."));
        }
        check_text(
            &mut errors,
            "password",
            &self.password,
            Some(PASSWORD_MAX_LEN),
            REQUIRED,
            too_long_message(PASSWORD_MAX_LEN),
        );

        finish(errors)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub csrfmiddlewaretoken: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        check_text(
            &mut errors,
            "username",
            &self.username,
            Some(USERNAME_MAX_LEN),
            "Please enter your username.",
            |_| format!("username cannot exceed {USERNAME_MAX_LEN} characters."),
        );
        check_text(
            &mut errors,
            "password",
            &self.password,
            Some(PASSWORD_MAX_LEN),
            "Please enter your password.",
            |_| format!("password cannot exceed {PASSWORD_MAX_LEN} characters."),
        );

        finish(errors)
    }
}

fn validate_note(title: &str, body: &str) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    check_text(
        &mut errors,
        "title",
        title,
        Some(TITLE_MAX_LEN),
        REQUIRED,
        too_long_message(TITLE_MAX_LEN),
    );
    check_text(&mut errors, "body", body, None, REQUIRED, |_| String::new());

    finish(errors)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteForm {
    #[serde(default)]
    pub csrfmiddlewaretoken: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl NoteForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        validate_note(&self.title, &self.body)
    }
}

/// Fields posted by the edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateNoteForm {
    /// Anti-forgery token, also accepted as the `X-CSRFToken` header
    #[serde(default)]
    pub csrfmiddlewaretoken: String,
    /// Note ID
    #[serde(default)]
    pub note_id: String,
    /// New note title
    #[serde(default)]
    pub title: String,
    /// New note body
    #[serde(default)]
    pub body: String,
}

impl UpdateNoteForm {
    pub fn validate(&self) -> Result<i64, Vec<FieldError>> {
        let id = self.note_id.trim().parse::<i64>().map_err(|_| {
            vec![FieldError::new("note_id", "Enter a whole number.")]
        });

        match (id, validate_note(&self.title, &self.body)) {
            (Ok(id), Ok(())) => Ok(id),
            (Ok(_), Err(errors)) => Err(errors),
            (Err(mut errors), note) => {
                errors.extend(note.err().unwrap_or_default());
                Err(errors)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UpdateNoteResponse {
    /// Whether the note was updated
    pub success: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomeQuery {
    pub page: Option<String>,
    pub id: Option<String>,
    pub action: Option<String>,
}

impl HomeQuery {
    /// Id of the note to delete, when the query asks for a deletion.
    pub fn delete_target(&self) -> Option<&str> {
        match (&self.id, self.action.as_deref()) {
            (Some(id), Some("delete")) if !id.is_empty() => Some(id),
            _ => None,
        }
    }
}
