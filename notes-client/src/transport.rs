use crate::{dom::FormFields, error::TransportError};

/// A single non-blocking form POST.
///
/// Resolves with the response body whatever the HTTP status is, the way
/// `fetch` does. Only transport-level failures are errors.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        fields: &FormFields,
    ) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        fields: &FormFields,
    ) -> Result<String, TransportError> {
        (**self).post_form(url, headers, fields).await
    }
}

/// Native transport. Relative URLs are resolved against the page URL.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    page_url: reqwest::Url,
}

#[cfg(not(target_arch = "wasm32"))]
impl HttpTransport {
    pub fn new(page_url: &str) -> Result<Self, TransportError> {
        Self::with_client(reqwest::Client::new(), page_url)
    }

    /// Reuses `client`, e.g. one holding the session cookie.
    pub fn with_client(client: reqwest::Client, page_url: &str) -> Result<Self, TransportError> {
        let page_url = reqwest::Url::parse(page_url).map_err(|e| TransportError::InvalidUrl {
            url: page_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, page_url })
    }

    pub fn resolve(&self, url: &str) -> Result<reqwest::Url, TransportError> {
        self.page_url
            .join(url)
            .map_err(|e| TransportError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Transport for HttpTransport {
    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        fields: &FormFields,
    ) -> Result<String, TransportError> {
        let target = self.resolve(url)?;

        tracing::debug!("Posting {} form fields to {}", fields.len(), target);

        let mut request = self.client.post(target.clone()).form(fields.as_pairs());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to post form to {}: {}", target, e);
            TransportError::Network(e.to_string())
        })?;

        tracing::debug!("Response status: {}", response.status());

        response.text().await.map_err(|e| {
            tracing::error!("Failed to read response body from {}: {}", target, e);
            TransportError::Network(e.to_string())
        })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn relative_endpoint_resolves_against_page() {
        let transport = HttpTransport::new("http://localhost:8000/").unwrap();
        assert_eq!(
            transport.resolve("notes/").unwrap().as_str(),
            "http://localhost:8000/notes/"
        );

        let transport = HttpTransport::new("http://localhost:8000/?page=2").unwrap();
        assert_eq!(
            transport.resolve("notes/").unwrap().as_str(),
            "http://localhost:8000/notes/"
        );
    }

    #[test]
    fn invalid_page_url_is_rejected() {
        let err = HttpTransport::new("not a url").unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }), "wrong error: {err:?}");
    }
}
