use crate::error::ClientError;

/// Name/value pairs of a form, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// The slice of the page DOM the client behaviors touch.
///
/// Lookups by id return `None`/`false` when the element does not exist;
/// [`DocumentExt`] turns those into [`ClientError::MissingElement`].
pub trait Document {
    type Node;

    fn select_all(&self, selector: &str) -> Vec<Self::Node>;

    /// Detaches `node`. Detaching a node that is already gone is a no-op.
    fn remove(&self, node: &Self::Node);

    fn text_content(&self, id: &str) -> Option<String>;

    fn set_value(&self, id: &str, value: &str) -> bool;

    fn click(&self, id: &str) -> bool;

    fn form_fields(&self, form_id: &str) -> Option<FormFields>;
}

impl<D: Document + ?Sized> Document for &D {
    type Node = D::Node;

    fn select_all(&self, selector: &str) -> Vec<Self::Node> {
        (**self).select_all(selector)
    }

    fn remove(&self, node: &Self::Node) {
        (**self).remove(node);
    }

    fn text_content(&self, id: &str) -> Option<String> {
        (**self).text_content(id)
    }

    fn set_value(&self, id: &str, value: &str) -> bool {
        (**self).set_value(id, value)
    }

    fn click(&self, id: &str) -> bool {
        (**self).click(id)
    }

    fn form_fields(&self, form_id: &str) -> Option<FormFields> {
        (**self).form_fields(form_id)
    }
}

pub trait DocumentExt: Document {
    fn require_text(&self, id: &str) -> Result<String, ClientError> {
        self.text_content(id)
            .ok_or_else(|| ClientError::missing(id))
    }

    fn require_set_value(&self, id: &str, value: &str) -> Result<(), ClientError> {
        if self.set_value(id, value) {
            Ok(())
        } else {
            Err(ClientError::missing(id))
        }
    }

    fn require_click(&self, id: &str) -> Result<(), ClientError> {
        if self.click(id) {
            Ok(())
        } else {
            Err(ClientError::missing(id))
        }
    }

    fn require_form(&self, form_id: &str) -> Result<FormFields, ClientError> {
        self.form_fields(form_id)
            .ok_or_else(|| ClientError::missing(form_id))
    }
}

impl<D: Document + ?Sized> DocumentExt for D {}
