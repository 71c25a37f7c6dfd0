//! Bindings of the client behaviors to the browser.

use std::{rc::Rc, time::Duration};

use wasm_bindgen::{JsCast, prelude::*};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    Element, Event, FormData, Headers, HtmlElement, HtmlFormElement, HtmlInputElement,
    HtmlTextAreaElement, RequestInit, Response, UrlSearchParams, Window,
};

use crate::{
    Browser, Document, FormFields, Timer, Transport, TransportError,
    flash::FlashDismissal,
    modal,
    submit::{self, EDIT_FORM_ID, EditFormSubmitter, SubmitEvent},
};


#[derive(Clone)]
pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    pub fn new(window: &Window) -> Result<Self, JsValue> {
        window
            .document()
            .map(|document| Self { document })
            .ok_or_else(|| JsValue::from_str("window has no document"))
    }
}

impl Document for WebDocument {
    type Node = Element;

    fn select_all(&self, selector: &str) -> Vec<Element> {
        let Ok(list) = self.document.query_selector_all(selector) else {
            tracing::warn!("Invalid selector '{}'", selector);
            return Vec::new();
        };

        (0..list.length())
            .filter_map(|index| list.get(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn remove(&self, node: &Element) {
        node.remove();
    }

    fn text_content(&self, id: &str) -> Option<String> {
        self.document
            .get_element_by_id(id)
            .map(|element| element.text_content().unwrap_or_default())
    }

    fn set_value(&self, id: &str, value: &str) -> bool {
        let Some(element) = self.document.get_element_by_id(id) else {
            return false;
        };

        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
            area.set_value(value);
        } else {
            tracing::warn!("Element '#{}' has no value to set", id);
        }
        true
    }

    fn click(&self, id: &str) -> bool {
        match self
            .document
            .get_element_by_id(id)
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
        {
            Some(element) => {
                element.click();
                true
            }
            None => false,
        }
    }

    fn form_fields(&self, form_id: &str) -> Option<FormFields> {
        let form = self
            .document
            .get_element_by_id(form_id)?
            .dyn_into::<HtmlFormElement>()
            .ok()?;
        let data = FormData::new_with_form(&form).ok()?;

        let mut fields = FormFields::new();
        for entry in data.entries() {
            let Ok(entry) = entry else { continue };
            let pair = js_sys::Array::from(&entry);
            // File inputs carry no string value and are skipped.
            if let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
                fields.push(name, value);
            }
        }
        Some(fields)
    }
}

impl SubmitEvent for Event {
    fn prevent_default(&self) {
        Self::prevent_default(self);
    }

    fn stop_propagation(&self) {
        Self::stop_propagation(self);
    }
}

#[derive(Clone)]
pub struct WebBrowser {
    window: Window,
}

impl WebBrowser {
    pub const fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Browser for WebBrowser {
    fn navigate(&self, url: &str) {
        if let Err(e) = self.window.location().set_href(url) {
            tracing::error!("Failed to navigate to {}: {:?}", url, e);
        }
    }

    fn alert(&self, message: &str) {
        if let Err(e) = self.window.alert_with_message(message) {
            tracing::error!("Failed to show alert: {:?}", e);
        }
    }
}

#[derive(Clone)]
pub struct BrowserTimer {
    window: Window,
}

impl BrowserTimer {
    pub const fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Timer for BrowserTimer {
    async fn sleep(&self, duration: Duration) {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            if let Err(e) = self
                .window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
            {
                tracing::error!("Failed to schedule timeout: {:?}", e);
            }
        });

        if let Err(e) = JsFuture::from(promise).await {
            tracing::error!("Timeout promise rejected: {:?}", e);
        }
    }
}

/// Transport over `fetch`, sending the fields URL-encoded.
#[derive(Clone)]
pub struct FetchTransport {
    window: Window,
}

impl FetchTransport {
    pub const fn new(window: Window) -> Self {
        Self { window }
    }
}

fn js_error(value: JsValue) -> TransportError {
    TransportError::Network(format!("{value:?}"))
}

fn encode_fields(fields: &FormFields) -> Result<UrlSearchParams, JsValue> {
    let params = UrlSearchParams::new()?;
    for (name, value) in fields.iter() {
        params.append(name, value);
    }
    Ok(params)
}

fn request_headers(headers: &[(&str, &str)]) -> Result<Headers, JsValue> {
    let request_headers = Headers::new()?;
    for (name, value) in headers {
        request_headers.set(name, value)?;
    }
    Ok(request_headers)
}

impl Transport for FetchTransport {
    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        fields: &FormFields,
    ) -> Result<String, TransportError> {
        let params = encode_fields(fields).map_err(js_error)?;
        let request_headers = request_headers(headers).map_err(js_error)?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&request_headers);
        init.set_body(&params);

        let response = JsFuture::from(self.window.fetch_with_str_and_init(url, &init))
            .await
            .map_err(js_error)?;
        let response: Response = response.dyn_into().map_err(js_error)?;

        let text = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?;

        text.as_string()
            .ok_or_else(|| TransportError::Network("response body is not text".to_string()))
    }
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))
}

/// Installs the page behaviors: schedules flash dismissal and takes over
/// the edit form's submit event.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());

    let window = window()?;
    let document = WebDocument::new(&window)?;

    let dismissal = FlashDismissal::capture(&document);
    {
        let document = document.clone();
        let timer = BrowserTimer::new(window.clone());
        spawn_local(async move {
            dismissal.run(&document, &timer).await;
        });
    }

    let Some(form) = document.document.get_element_by_id(EDIT_FORM_ID) else {
        tracing::debug!("No edit form on this page");
        return Ok(());
    };

    let submitter = Rc::new(EditFormSubmitter::new(
        document,
        FetchTransport::new(window.clone()),
        WebBrowser::new(window),
    ));

    let on_submit = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        submit::intercept(&event);
        let submitter = Rc::clone(&submitter);
        spawn_local(async move {
            submitter.submit().await;
        });
    });
    form.add_event_listener_with_callback("submit", on_submit.as_ref().unchecked_ref())?;
    on_submit.forget();

    Ok(())
}

/// Loads a note into the edit modal. Throws when the note is not on the page.
#[wasm_bindgen(js_name = showEditModal)]
pub fn show_edit_modal(note_id: &JsValue) -> Result<(), JsValue> {
    let document = WebDocument::new(&window()?)?;
    let note_id = note_id
        .as_string()
        .or_else(|| note_id.as_f64().map(|id| id.to_string()))
        .ok_or_else(|| JsValue::from_str("note id must be a string or a number"))?;

    modal::show_edit_modal(&document, note_id)
        .map(|_| ())
        .map_err(|e| js_sys::Error::new(&e.to_string()).into())
}
