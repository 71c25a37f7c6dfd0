use std::cell::Cell;

use serde_json::Value;

use crate::{
    browser::Browser,
    dom::{Document, DocumentExt},
    error::ClientError,
    transport::Transport,
};

pub const EDIT_FORM_ID: &str = "edit-form";
pub const UPDATE_ENDPOINT: &str = "notes/";
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const HOME_URL: &str = "/";
pub const FAILURE_MESSAGE: &str = "Failed to update note.";

/// The DOM submit event of the edit form.
pub trait SubmitEvent {
    fn prevent_default(&self);

    fn stop_propagation(&self);
}

/// Stops the browser's own form submission. Must run synchronously inside
/// the event dispatch.
pub fn intercept<E: SubmitEvent + ?Sized>(event: &E) {
    event.prevent_default();
    event.stop_propagation();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server reported success and the page navigated home.
    Navigated,
    /// The request or its handling failed and the user was alerted.
    Alerted,
    /// The server answered without reporting success.
    Ignored,
}

/// Parsed body of the update endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResponse(Value);

impl UpdateResponse {
    pub fn parse(body: &str) -> Result<Self, ClientError> {
        match serde_json::from_str(body)? {
            Value::Null => Err(ClientError::NullResponse),
            value => Ok(Self(value)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.0.get("success").is_some_and(is_truthy)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

struct InFlight<'a>(&'a Cell<usize>);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a Cell<usize>) -> Self {
        counter.set(counter.get() + 1);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Sends the edit form in the background and reacts to the answer.
///
/// Submissions are not serialized: a second one may start before the
/// first resolves.
pub struct EditFormSubmitter<D, T, B> {
    document: D,
    transport: T,
    browser: B,
    in_flight: Cell<usize>,
}

impl<D, T, B> EditFormSubmitter<D, T, B>
where
    D: Document,
    T: Transport,
    B: Browser,
{
    pub const fn new(document: D, transport: T, browser: B) -> Self {
        Self {
            document,
            transport,
            browser,
            in_flight: Cell::new(0),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    pub fn state(&self) -> SubmitState {
        if self.in_flight() == 0 {
            SubmitState::Idle
        } else {
            SubmitState::Submitting
        }
    }

    pub async fn handle<E: SubmitEvent + ?Sized>(&self, event: &E) -> SubmitOutcome {
        intercept(event);
        self.submit().await
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let result = {
            let _guard = InFlight::enter(&self.in_flight);
            self.send().await
        };

        match result {
            Ok(response) if response.is_success() => {
                self.browser.navigate(HOME_URL);
                SubmitOutcome::Navigated
            }
            Ok(response) => {
                // No user feedback for a rejected update.
                tracing::warn!("Note update was not accepted: {:?}", response);
                SubmitOutcome::Ignored
            }
            Err(e) => {
                tracing::error!("Failed to update note: {}", e);
                self.browser.alert(FAILURE_MESSAGE);
                SubmitOutcome::Alerted
            }
        }
    }

    async fn send(&self) -> Result<UpdateResponse, ClientError> {
        let fields = self.document.require_form(EDIT_FORM_ID)?;
        let token = fields.get(CSRF_FIELD).unwrap_or_default();

        let body = self
            .transport
            .post_form(UPDATE_ENDPOINT, &[(CSRF_HEADER, token)], &fields)
            .await?;

        UpdateResponse::parse(&body)
    }
}
