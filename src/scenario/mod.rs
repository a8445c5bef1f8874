//! Per-scenario state: the namespace, the Ingress under test, the request
//! being built, and the last response captured from the Ingress address.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use k8s_openapi::api::networking::v1::Ingress;
use tracing::debug;
use url::Url;

use crate::error::ConformanceError;

/// Path requested when no `With path` step ran.
pub const DEFAULT_REQUEST_PATH: &str = "/";

/// State shared by the steps of one scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    client: reqwest::Client,

    /// Namespace created for the scenario.
    pub namespace: Option<String>,
    /// Name of the manifest the Ingress was read from.
    pub ingress_manifest: Option<String>,
    /// The Ingress under test: the decoded manifest before creation, the
    /// server's copy afterwards.
    pub ingress: Option<Ingress>,
    /// Address published in the Ingress status.
    pub address: Option<String>,

    request_path: String,
    request_headers: HeaderMap,

    response_status: Option<StatusCode>,
    response_headers: Option<HeaderMap>,
    response_body: Vec<u8>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Scenario {
    /// Creates fresh state, using `client` or a default HTTP client.
    #[must_use]
    pub fn new(client: Option<reqwest::Client>) -> Self {
        Self {
            client: client.unwrap_or_default(),
            namespace: None,
            ingress_manifest: None,
            ingress: None,
            address: None,
            request_path: DEFAULT_REQUEST_PATH.to_owned(),
            request_headers: HeaderMap::new(),
            response_status: None,
            response_headers: None,
            response_body: Vec::new(),
        }
    }

    /// Discards everything but the HTTP client.
    pub fn reset(&mut self) {
        *self = Self::new(Some(self.client.clone()));
    }

    /// Returns the path the next request targets.
    #[must_use]
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// Sets the path the next request targets.
    pub fn set_request_path(&mut self, path: impl Into<String>) {
        self.request_path = path.into();
    }

    /// Returns the headers attached to every request.
    #[must_use]
    pub const fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    /// Appends a request header. Repeated names keep every value in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::InvalidRequest`] when the name or value is
    /// not valid HTTP.
    pub fn add_request_header(
        &mut self,
        name: &str,
        value: &str,
    ) -> Result<(), ConformanceError> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|error| {
            ConformanceError::InvalidRequest {
                message: format!("invalid header name {name:?}: {error}"),
            }
        })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|error| ConformanceError::InvalidRequest {
                message: format!("invalid value {value:?} for header {name}: {error}"),
            })?;
        self.request_headers.append(header_name, header_value);
        Ok(())
    }

    /// Returns the status of the last response.
    #[must_use]
    pub const fn response_status(&self) -> Option<StatusCode> {
        self.response_status
    }

    /// Returns the headers of the last response.
    #[must_use]
    pub const fn response_headers(&self) -> Option<&HeaderMap> {
        self.response_headers.as_ref()
    }

    /// Returns the body of the last response.
    #[must_use]
    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    /// Sends `method` to the stored address and request path.
    ///
    /// # Errors
    ///
    /// See [`Scenario::send_request_to`].
    pub async fn send_request(&mut self, method: &str) -> Result<(), ConformanceError> {
        let path = self.request_path.clone();
        self.send_request_to(method, &path).await
    }

    /// Sends `method` to `path` on the stored address and captures the
    /// response.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::MissingState`] when no address is known,
    /// [`ConformanceError::InvalidRequest`] for a bad method or URL, and
    /// [`ConformanceError::Transport`] when the request fails. The previously
    /// captured response is cleared before anything is sent, so a failed
    /// request never leaves a stale response behind.
    pub async fn send_request_to(
        &mut self,
        method: &str,
        path: &str,
    ) -> Result<(), ConformanceError> {
        self.clear_response();
        let address = self
            .address
            .as_deref()
            .filter(|address| !address.is_empty())
            .ok_or_else(|| ConformanceError::missing("ingress address"))?;
        let url = request_url(address, path)?;
        let http_method = Method::from_bytes(method.as_bytes()).map_err(|error| {
            ConformanceError::InvalidRequest {
                message: format!("invalid method {method:?}: {error}"),
            }
        })?;

        debug!(%http_method, %url, "sending request");
        let outcome = self
            .client
            .request(http_method, url.clone())
            .headers(self.request_headers.clone())
            .send()
            .await;
        let response = match outcome {
            Ok(response) => response,
            Err(error) => return Err(transport_failure(&url, &error)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => return Err(transport_failure(&url, &error)),
        };

        debug!(%status, bytes = body.len(), "response captured");
        self.response_status = Some(status);
        self.response_headers = Some(headers);
        self.response_body = body.to_vec();
        Ok(())
    }

    fn clear_response(&mut self) {
        self.response_status = None;
        self.response_headers = None;
        self.response_body.clear();
    }
}

fn transport_failure(url: &Url, error: &reqwest::Error) -> ConformanceError {
    ConformanceError::Transport {
        url: url.to_string(),
        message: error.to_string(),
    }
}

/// Builds `http://{address}{path}`.
///
/// # Errors
///
/// Returns [`ConformanceError::InvalidRequest`] when the result is not a
/// valid URL.
pub fn request_url(address: &str, path: &str) -> Result<Url, ConformanceError> {
    let separator = if path.starts_with('/') { "" } else { "/" };
    let raw = format!("http://{address}{separator}{path}");
    Url::parse(&raw).map_err(|error| ConformanceError::InvalidRequest {
        message: format!("invalid request URL {raw:?}: {error}"),
    })
}
