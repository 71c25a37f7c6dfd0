//! In-memory page used in place of the browser DOM.

use std::{
    cell::RefCell,
    collections::HashMap,
};

use crate::{browser::Browser, dom::Document, dom::FormFields};

#[derive(Debug, Default, Clone)]
struct Element {
    text: String,
    value: String,
    clicks: usize,
}

#[derive(Debug)]
struct Node {
    selector: String,
    text: String,
    attached: bool,
}

#[derive(Debug, Default)]
struct Page {
    elements: HashMap<String, Element>,
    nodes: Vec<Node>,
    // form id -> (field name, element id)
    forms: HashMap<String, Vec<(String, String)>>,
}

/// Handle to a node returned by [`HeadlessDocument::select_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(usize);

#[derive(Debug, Default)]
pub struct HeadlessDocument {
    page: RefCell<Page>,
}

impl HeadlessDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element displaying `text`.
    #[must_use]
    pub fn with_text(self, id: &str, text: &str) -> Self {
        self.page
            .borrow_mut()
            .elements
            .entry(id.to_string())
            .or_default()
            .text = text.to_string();
        self
    }

    /// Adds an input element holding `value`.
    #[must_use]
    pub fn with_field(self, id: &str, value: &str) -> Self {
        self.page
            .borrow_mut()
            .elements
            .entry(id.to_string())
            .or_default()
            .value = value.to_string();
        self
    }

    /// Adds a node matched by `selector`.
    #[must_use]
    pub fn with_node(self, selector: &str, text: &str) -> Self {
        self.page.borrow_mut().nodes.push(Node {
            selector: selector.to_string(),
            text: text.to_string(),
            attached: true,
        });
        self
    }

    /// Adds a form whose fields submit the live values of the given
    /// `(field name, element id)` inputs.
    #[must_use]
    pub fn with_form<'a>(
        self,
        form_id: &str,
        fields: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, id)| (name.to_string(), id.to_string()))
            .collect();
        self.page
            .borrow_mut()
            .forms
            .insert(form_id.to_string(), fields);
        self
    }

    pub fn value(&self, id: &str) -> Option<String> {
        self.page
            .borrow()
            .elements
            .get(id)
            .map(|element| element.value.clone())
    }

    pub fn clicks(&self, id: &str) -> usize {
        self.page
            .borrow()
            .elements
            .get(id)
            .map_or(0, |element| element.clicks)
    }

    /// Texts of the nodes matching `selector` still in the page.
    pub fn attached(&self, selector: &str) -> Vec<String> {
        self.page
            .borrow()
            .nodes
            .iter()
            .filter(|node| node.attached && node.selector == selector)
            .map(|node| node.text.clone())
            .collect()
    }
}

impl Document for HeadlessDocument {
    type Node = NodeHandle;

    fn select_all(&self, selector: &str) -> Vec<NodeHandle> {
        self.page
            .borrow()
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.attached && node.selector == selector)
            .map(|(index, _)| NodeHandle(index))
            .collect()
    }

    fn remove(&self, node: &NodeHandle) {
        if let Some(node) = self.page.borrow_mut().nodes.get_mut(node.0) {
            node.attached = false;
        }
    }

    fn text_content(&self, id: &str) -> Option<String> {
        self.page
            .borrow()
            .elements
            .get(id)
            .map(|element| element.text.clone())
    }

    fn set_value(&self, id: &str, value: &str) -> bool {
        match self.page.borrow_mut().elements.get_mut(id) {
            Some(element) => {
                element.value = value.to_string();
                true
            }
            None => false,
        }
    }

    fn click(&self, id: &str) -> bool {
        match self.page.borrow_mut().elements.get_mut(id) {
            Some(element) => {
                element.clicks += 1;
                true
            }
            None => false,
        }
    }

    fn form_fields(&self, form_id: &str) -> Option<FormFields> {
        let page = self.page.borrow();
        let fields = page.forms.get(form_id)?;

        Some(
            fields
                .iter()
                .filter_map(|(name, id)| {
                    page.elements
                        .get(id)
                        .map(|element| (name.clone(), element.value.clone()))
                })
                .collect(),
        )
    }
}

/// Records navigations and alerts instead of performing them.
#[derive(Debug, Default)]
pub struct HeadlessBrowser {
    navigations: RefCell<Vec<String>>,
    alerts: RefCell<Vec<String>>,
}

impl HeadlessBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }
}

impl Browser for HeadlessBrowser {
    fn navigate(&self, url: &str) {
        self.navigations.borrow_mut().push(url.to_string());
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }
}
