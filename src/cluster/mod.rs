//! Kubernetes API access for conformance scenarios.
//!
//! All cluster calls go through the [`ClusterGateway`] trait so that steps can
//! be exercised against a mock or an in-memory cluster. The kube-rs backed
//! [`KubeGateway`] is the production implementation. Transient API failures
//! are classified once, in [`ClusterError`], and the retry and polling helpers
//! decide what to do with them.

mod error;
mod error_mapping;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
mod kube_gateway;
pub mod retry;
pub mod wait;

pub use error::ClusterError;
pub use kube_gateway::KubeGateway;
pub use retry::{Backoff, retry_transient};
pub use wait::{
    PollSettings, ingress_addresses, wait_for_ingress_address, wait_for_service_endpoints,
};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Endpoints, ReplicationController, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use tracing::{debug, info, warn};

/// Name prefix of namespaces created for scenarios.
pub const TEST_NAMESPACE_PREFIX: &str = "ingress-conformance-";

/// Label carried by every namespace the suite creates.
pub const TEST_NAMESPACE_LABEL: &str = "ingress-conformance.k8s.io/test-namespace";

/// Operations the suite performs against the Kubernetes API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Returns the API server's git version.
    async fn server_version(&self) -> Result<String, ClusterError>;

    /// Creates a labelled namespace whose name starts with `prefix` and
    /// returns the generated name.
    async fn create_namespace(&self, prefix: &str) -> Result<String, ClusterError>;

    /// Deletes a namespace and everything inside it.
    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError>;

    /// Lists namespaces created by earlier runs of the suite that are not
    /// already terminating.
    async fn list_test_namespaces(&self) -> Result<Vec<String>, ClusterError>;

    /// Creates a replication controller.
    async fn create_replication_controller(
        &self,
        namespace: &str,
        controller: &ReplicationController,
    ) -> Result<ReplicationController, ClusterError>;

    /// Creates a service.
    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, ClusterError>;

    /// Creates a secret.
    async fn create_secret(&self, namespace: &str, secret: &Secret)
    -> Result<Secret, ClusterError>;

    /// Creates an Ingress and returns the server's copy.
    async fn create_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, ClusterError>;

    /// Fetches an Ingress.
    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, ClusterError>;

    /// Lists the endpoints objects of a namespace.
    async fn list_endpoints(&self, namespace: &str) -> Result<Vec<Endpoints>, ClusterError>;
}

/// Creates a fresh scenario namespace, retrying transient failures.
///
/// # Errors
///
/// Returns the last [`ClusterError`] once retries are exhausted or a
/// non-retryable error occurs.
pub async fn create_test_namespace(
    gateway: &dyn ClusterGateway,
    backoff: &Backoff,
) -> Result<String, ClusterError> {
    let name = retry_transient(backoff, "create namespace", || {
        gateway.create_namespace(TEST_NAMESPACE_PREFIX)
    })
    .await?;
    info!(namespace = %name, "created test namespace");
    Ok(name)
}

/// Creates an Ingress in `namespace`, retrying transient failures.
///
/// # Errors
///
/// Returns the last [`ClusterError`] once retries are exhausted or a
/// non-retryable error occurs.
pub async fn create_ingress(
    gateway: &dyn ClusterGateway,
    backoff: &Backoff,
    namespace: &str,
    ingress: &Ingress,
) -> Result<Ingress, ClusterError> {
    retry_transient(backoff, "create ingress", || {
        gateway.create_ingress(namespace, ingress)
    })
    .await
}

/// Deletes namespaces left behind by earlier runs and returns how many were
/// removed.
///
/// A namespace that is already gone counts as removed. Other deletion
/// failures are logged and skipped so the remaining namespaces are still
/// cleaned up.
///
/// # Errors
///
/// Returns an error when the namespaces cannot be listed.
pub async fn cleanup_namespaces(gateway: &dyn ClusterGateway) -> Result<usize, ClusterError> {
    let stale = gateway.list_test_namespaces().await?;
    let mut removed = 0;
    for name in &stale {
        match gateway.delete_namespace(name).await {
            Ok(()) => {
                info!(namespace = %name, "deleted stale test namespace");
                removed += 1;
            }
            Err(error) if error.is_not_found() => {
                debug!(namespace = %name, "stale test namespace already deleted");
                removed += 1;
            }
            Err(error) => {
                warn!(namespace = %name, %error, "failed to delete stale test namespace");
            }
        }
    }
    Ok(removed)
}

/// Deletes a scenario namespace, logging rather than returning failures.
pub async fn delete_namespace_best_effort(gateway: &dyn ClusterGateway, name: &str) {
    match gateway.delete_namespace(name).await {
        Ok(()) => info!(namespace = %name, "deleted test namespace"),
        Err(error) => warn!(namespace = %name, %error, "failed to delete test namespace"),
    }
}
