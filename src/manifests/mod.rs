//! Loading fixture manifests and creating them in a scenario namespace.
//!
//! A fixture directory holds `rc.yaml`, `svc.yaml`, and `ing.yaml`, plus an
//! optional `secret.yaml`. Files may be YAML or JSON.

pub mod yaml;

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8Path;
use k8s_openapi::api::core::v1::{ReplicationController, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::cluster::{ClusterGateway, PollSettings, wait_for_service_endpoints};
use crate::error::ConformanceError;
use crate::files::{self, FileSource};

/// Annotation selecting the controller that implements an Ingress.
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Ingress manifest inside a fixture directory.
pub const INGRESS_FILE: &str = "ing.yaml";
/// Replication controller manifest inside a fixture directory.
pub const REPLICATION_CONTROLLER_FILE: &str = "rc.yaml";
/// Service manifest inside a fixture directory.
pub const SERVICE_FILE: &str = "svc.yaml";
/// Optional secret manifest inside a fixture directory.
pub const SECRET_FILE: &str = "secret.yaml";

/// Reads manifests from a [`FileSource`] and stamps the configured Ingress
/// class on every Ingress it produces.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    source: Arc<dyn FileSource>,
    ingress_class: Option<String>,
}

/// Annotations replacing those found in the fixture files.
///
/// An empty map keeps the file's annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationOverrides {
    /// Replacement Ingress annotations.
    pub ingress: BTreeMap<String, String>,
    /// Replacement service annotations.
    pub service: BTreeMap<String, String>,
}

impl ManifestLoader {
    /// Creates a loader. An empty `ingress_class` disables the class
    /// annotation.
    #[must_use]
    pub fn new(source: Arc<dyn FileSource>, ingress_class: Option<String>) -> Self {
        Self {
            source,
            ingress_class: ingress_class.filter(|class| !class.is_empty()),
        }
    }

    /// Returns the file source manifests are read from.
    #[must_use]
    pub fn source(&self) -> &dyn FileSource {
        self.source.as_ref()
    }

    /// Returns the Ingress class stamped on loaded Ingresses.
    #[must_use]
    pub fn ingress_class(&self) -> Option<&str> {
        self.ingress_class.as_deref()
    }

    /// Reads and decodes one manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::FixtureNotFound`] when the file is
    /// missing and [`ConformanceError::Fixture`] when it cannot be decoded
    /// into `T`.
    pub fn decode<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T, ConformanceError> {
        let bytes = files::read(self.source(), path)?;
        let invalid = |message: String| ConformanceError::Fixture {
            path: path.to_string(),
            message,
        };
        let text = String::from_utf8(bytes).map_err(|error| invalid(error.to_string()))?;
        let value = yaml::to_json(&text).map_err(invalid)?;
        serde_json::from_value(value).map_err(|error| invalid(error.to_string()))
    }

    /// Loads the Ingress at `path`, sets its namespace, and applies the
    /// configured class annotation.
    ///
    /// # Errors
    ///
    /// Returns an error when the manifest is missing or is not an Ingress.
    pub fn ingress_from_manifest(
        &self,
        path: &Utf8Path,
        namespace: &str,
    ) -> Result<Ingress, ConformanceError> {
        let mut ingress: Ingress = self.decode(path)?;
        ingress.metadata.namespace = Some(namespace.to_owned());
        self.apply_ingress_class(&mut ingress);
        Ok(ingress)
    }

    /// Sets the configured class annotation on `ingress`, keeping its other
    /// annotations.
    pub fn apply_ingress_class(&self, ingress: &mut Ingress) {
        if let Some(class) = self.ingress_class.as_ref() {
            ingress
                .metadata
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(INGRESS_CLASS_ANNOTATION.to_owned(), class.clone());
        }
    }

    /// Creates the fixture objects in `directory` inside `namespace` and
    /// returns the server's copy of the Ingress.
    ///
    /// Objects are created in order: replication controller, service, a wait
    /// for one ready endpoint, the optional secret, and finally the Ingress.
    ///
    /// # Errors
    ///
    /// Returns the first fixture, API, or timeout error encountered.
    pub async fn create_from_directory(
        &self,
        gateway: &dyn ClusterGateway,
        directory: &Utf8Path,
        namespace: &str,
        overrides: &AnnotationOverrides,
        endpoints: PollSettings,
    ) -> Result<Ingress, ConformanceError> {
        debug!(%directory, namespace, "creating fixture objects");

        let controller: ReplicationController =
            self.decode(&directory.join(REPLICATION_CONTROLLER_FILE))?;
        gateway
            .create_replication_controller(namespace, &controller)
            .await?;

        let mut service: Service = self.decode(&directory.join(SERVICE_FILE))?;
        if !overrides.service.is_empty() {
            service.metadata.annotations = Some(overrides.service.clone());
        }
        let created = gateway.create_service(namespace, &service).await?;
        let service_name = created
            .metadata
            .name
            .or(service.metadata.name)
            .ok_or_else(|| ConformanceError::Fixture {
                path: directory.join(SERVICE_FILE).to_string(),
                message: "service has no name".to_owned(),
            })?;
        wait_for_service_endpoints(gateway, namespace, &service_name, 1, endpoints).await?;

        let secret_path = directory.join(SECRET_FILE);
        if files::exists(self.source(), &secret_path) {
            let secret: Secret = self.decode(&secret_path)?;
            gateway.create_secret(namespace, &secret).await?;
        }

        let mut ingress: Ingress = self.decode(&directory.join(INGRESS_FILE))?;
        if !overrides.ingress.is_empty() {
            ingress.metadata.annotations = Some(overrides.ingress.clone());
        }
        self.apply_ingress_class(&mut ingress);
        let created_ingress = gateway.create_ingress(namespace, &ingress).await?;
        info!(
            %directory,
            namespace,
            ingress = created_ingress.metadata.name.as_deref().unwrap_or_default(),
            "created fixture objects"
        );
        Ok(created_ingress)
    }
}
