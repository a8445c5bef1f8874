//! Conformance step behaviour.
//!
//! [`Steps`] implements every step against a [`SuiteContext`] (shared,
//! read-only) and a [`Scenario`] (per scenario, mutable). The cucumber step
//! bindings in `bindings` are thin wrappers that parse captures and call
//! into it, so the behaviour can be exercised without a Gherkin runner.

pub mod assertions;
mod bindings;
mod world;

use std::fmt;
use std::sync::Arc;

use camino::Utf8Path;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, info};

pub use world::ConformanceWorld;

use crate::cluster::{self, Backoff, ClusterGateway, PollSettings, wait_for_ingress_address};
use crate::error::ConformanceError;
use crate::manifests::{AnnotationOverrides, ManifestLoader};
use crate::scenario::Scenario;

/// Name of the Ingress objects the steps build in code.
pub const GENERATED_INGRESS_NAME: &str = "defaultbackend";

/// Service an Ingress points at when it must have a backend that does not
/// exist.
pub const MISSING_SERVICE_NAME: &str = "non-existing";

const HTTP_PORT: i32 = 80;

/// Everything the steps share across scenarios.
pub struct SuiteContext {
    /// Kubernetes API access.
    pub cluster: Arc<dyn ClusterGateway>,
    /// Fixture manifest access.
    pub manifests: ManifestLoader,
    /// Retry schedule for namespace and Ingress creation.
    pub backoff: Backoff,
    /// Polling for the Ingress address.
    pub address_polling: PollSettings,
    /// Polling for service endpoints.
    pub endpoint_polling: PollSettings,
}

impl fmt::Debug for SuiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteContext")
            .field("manifests", &self.manifests)
            .field("backoff", &self.backoff)
            .field("address_polling", &self.address_polling)
            .field("endpoint_polling", &self.endpoint_polling)
            .finish_non_exhaustive()
    }
}

impl SuiteContext {
    /// Creates a context with the default retry and polling settings.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterGateway>, manifests: ManifestLoader) -> Self {
        Self {
            cluster,
            manifests,
            backoff: Backoff::default(),
            address_polling: PollSettings::INGRESS_ADDRESS,
            endpoint_polling: PollSettings::SERVICE_ENDPOINTS,
        }
    }

    /// Overrides both polling settings.
    #[must_use]
    pub const fn with_polling(mut self, address: PollSettings, endpoints: PollSettings) -> Self {
        self.address_polling = address;
        self.endpoint_polling = endpoints;
        self
    }

    /// Overrides the creation retry schedule.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Step implementations bound to one scenario.
#[derive(Debug)]
pub struct Steps<'w> {
    context: &'w SuiteContext,
    scenario: &'w mut Scenario,
}

fn single_path_ingress(namespace: &str, host: &str, backend: IngressBackend) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(GENERATED_INGRESS_NAME.to_owned()),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host.to_owned()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_owned()),
                        path_type: "Prefix".to_owned(),
                        backend,
                    }],
                }),
            }]),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}

fn missing_service_backend() -> IngressBackend {
    IngressBackend {
        service: Some(IngressServiceBackend {
            name: MISSING_SERVICE_NAME.to_owned(),
            port: Some(ServiceBackendPort {
                number: Some(HTTP_PORT),
                ..ServiceBackendPort::default()
            }),
        }),
        ..IngressBackend::default()
    }
}

impl<'w> Steps<'w> {
    /// Binds the steps to a scenario.
    #[must_use]
    pub const fn new(context: &'w SuiteContext, scenario: &'w mut Scenario) -> Self {
        Self { context, scenario }
    }

    /// Returns the scenario state.
    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &*self.scenario
    }

    fn namespace(&self) -> Result<String, ConformanceError> {
        self.scenario
            .namespace
            .clone()
            .ok_or_else(|| ConformanceError::missing("namespace"))
    }

    fn ingress(&self) -> Result<&Ingress, ConformanceError> {
        self.scenario
            .ingress
            .as_ref()
            .ok_or_else(|| ConformanceError::missing("Ingress"))
    }

    /// `a new random namespace`
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Kubernetes`] when the namespace cannot be
    /// created.
    pub async fn create_namespace(&mut self) -> Result<(), ConformanceError> {
        let name =
            cluster::create_test_namespace(self.context.cluster.as_ref(), &self.context.backoff)
                .await?;
        self.scenario.namespace = Some(name);
        Ok(())
    }

    /// `reading Ingress from manifest "F"`
    ///
    /// # Errors
    ///
    /// Returns an error when no namespace exists or the manifest cannot be
    /// decoded.
    pub fn read_ingress_manifest(&mut self, manifest: &str) -> Result<(), ConformanceError> {
        let namespace = self.namespace()?;
        let ingress = self
            .context
            .manifests
            .ingress_from_manifest(Utf8Path::new(manifest), &namespace)?;
        self.scenario.ingress = Some(ingress);
        self.scenario.ingress_manifest = Some(manifest.to_owned());
        Ok(())
    }

    /// `creating Ingress from manifest`
    ///
    /// # Errors
    ///
    /// Returns an error when no Ingress was read or the API rejects it.
    pub async fn create_ingress(&mut self) -> Result<(), ConformanceError> {
        let namespace = self.namespace()?;
        let created = cluster::create_ingress(
            self.context.cluster.as_ref(),
            &self.context.backoff,
            &namespace,
            self.ingress()?,
        )
        .await?;
        info!(
            namespace = %namespace,
            ingress = created.metadata.name.as_deref().unwrap_or_default(),
            "created ingress"
        );
        self.scenario.ingress = Some(created);
        Ok(())
    }

    /// `creating Ingress from manifest returns an error message containing
    /// "E"` and `The error message contains "E"`
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Assertion`] when creation succeeds or
    /// fails with a different message.
    pub async fn create_ingress_expecting_error(
        &self,
        expected: &str,
    ) -> Result<(), ConformanceError> {
        let namespace = self.namespace()?;
        let ingress = self.ingress()?;
        let name = ingress.metadata.name.clone().unwrap_or_default();
        let outcome = cluster::create_ingress(
            self.context.cluster.as_ref(),
            &self.context.backoff,
            &namespace,
            ingress,
        )
        .await;

        match outcome {
            Ok(_) => Err(ConformanceError::assertion(format!(
                "expected an error creating ingress {name} but it was created"
            ))),
            Err(error) if error.to_string().contains(expected) => {
                debug!(%error, "ingress rejected as expected");
                Ok(())
            }
            Err(error) => Err(ConformanceError::assertion(format!(
                "expected an error containing {expected:?} but returned {error}"
            ))),
        }
    }

    /// `creating an Ingress with host "H" without backend serviceName`
    ///
    /// Builds the Ingress without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::MissingState`] when no namespace exists.
    pub fn ingress_without_backend(&mut self, host: &str) -> Result<(), ConformanceError> {
        let namespace = self.namespace()?;
        let mut ingress = single_path_ingress(&namespace, host, IngressBackend::default());
        self.context.manifests.apply_ingress_class(&mut ingress);
        self.scenario.ingress = Some(ingress);
        Ok(())
    }

    /// `an Ingress is created with host "H" with an invalid backend`
    ///
    /// # Errors
    ///
    /// Returns an error when no namespace exists or the API rejects the
    /// Ingress.
    pub async fn ingress_with_invalid_backend(&mut self, host: &str) -> Result<(), ConformanceError> {
        let namespace = self.namespace()?;
        let mut ingress = single_path_ingress(&namespace, host, missing_service_backend());
        self.context.manifests.apply_ingress_class(&mut ingress);
        self.scenario.ingress = Some(ingress);
        self.create_ingress().await
    }

    /// `creating objects from directory "D"`
    ///
    /// # Errors
    ///
    /// Returns the first fixture, API, or timeout error.
    pub async fn create_objects_from_directory(
        &mut self,
        directory: &str,
    ) -> Result<(), ConformanceError> {
        let namespace = self.namespace()?;
        let ingress = self
            .context
            .manifests
            .create_from_directory(
                self.context.cluster.as_ref(),
                Utf8Path::new(directory),
                &namespace,
                &AnnotationOverrides::default(),
                self.context.endpoint_polling,
            )
            .await?;
        self.scenario.ingress = Some(ingress);
        Ok(())
    }

    /// `the ingress status shows the IP address or FQDN where is exposed`
    ///
    /// # Errors
    ///
    /// Returns an error when no Ingress exists or no address appears in
    /// time.
    pub async fn resolve_ingress_address(&mut self) -> Result<(), ConformanceError> {
        let namespace = self.namespace()?;
        let name = self
            .ingress()?
            .metadata
            .name
            .clone()
            .ok_or_else(|| ConformanceError::missing("Ingress name"))?;
        let address = wait_for_ingress_address(
            self.context.cluster.as_ref(),
            &namespace,
            &name,
            self.context.address_polling,
        )
        .await?;
        info!(namespace = %namespace, ingress = %name, %address, "ingress is exposed");
        self.scenario.address = Some(address);
        Ok(())
    }

    /// `Header "H" with value "V"`
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::InvalidRequest`] for invalid headers.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), ConformanceError> {
        self.scenario.add_request_header(name, value)
    }

    /// `With path "P"`
    pub fn with_path(&mut self, path: &str) {
        self.scenario.set_request_path(path);
    }

    /// `Send HTTP request with method "M"`
    ///
    /// # Errors
    ///
    /// Returns an error when no address is known or the request fails.
    pub async fn send_request(&mut self, method: &str) -> Result<(), ConformanceError> {
        self.scenario.send_request(method).await
    }

    /// `send GET HTTP request`
    ///
    /// # Errors
    ///
    /// Returns an error when no address is known or the request fails.
    pub async fn send_get_request(&mut self) -> Result<(), ConformanceError> {
        self.scenario.send_request(http::Method::GET.as_str()).await
    }

    /// `Send HTTP request with <path> and <method> checking response status
    /// code is N:`
    ///
    /// The first row is the table header; every other row holds a path and
    /// a method.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed tables, failed requests, or the first
    /// row whose status differs from `expected`.
    pub async fn check_paths_and_methods(
        &mut self,
        expected: u16,
        rows: &[Vec<String>],
    ) -> Result<(), ConformanceError> {
        if rows.is_empty() {
            return Err(ConformanceError::assertion(
                "expected a table with at least one row",
            ));
        }

        for row in rows.iter().skip(1) {
            let (Some(path), Some(method)) = (row.first(), row.get(1)) else {
                return Err(ConformanceError::assertion(format!(
                    "expected a path and a method in table row {row:?}"
                )));
            };
            self.scenario.send_request_to(method, path).await?;
            let actual = self.scenario.response_status().map(|status| status.as_u16());
            if actual != Some(expected) {
                return Err(ConformanceError::assertion(format!(
                    "expected status code {expected} for path {path} and method {method} but \
                     {} was returned",
                    actual.map_or_else(|| "nothing".to_owned(), |code| code.to_string())
                )));
            }
        }
        Ok(())
    }

    /// `Response status code is N` and `the HTTP response code is N`
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Assertion`] on mismatch.
    pub fn response_status_code_is(&self, expected: u16) -> Result<(), ConformanceError> {
        assertions::response_status_code_is(self.scenario.response_status(), expected)
    }

    /// `Header "H" is "V"`
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Assertion`] on mismatch.
    pub fn header_is(&self, name: &str, value: &str) -> Result<(), ConformanceError> {
        assertions::header_is(self.scenario.response_headers(), name, value)
    }

    /// `Header "H" is not present`
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Assertion`] when the header exists.
    pub fn header_is_not_present(&self, name: &str) -> Result<(), ConformanceError> {
        assertions::header_is_not_present(self.scenario.response_headers(), name)
    }
}
