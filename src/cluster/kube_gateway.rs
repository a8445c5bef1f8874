//! kube-rs backed cluster gateway.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use camino::Utf8Path;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{Endpoints, Namespace, ReplicationController, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, ListParams, PostParams, PropagationPolicy};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error_mapping::map_kube_error;
use super::{ClusterError, ClusterGateway, TEST_NAMESPACE_LABEL};
use crate::error::ConformanceError;

/// Gateway talking to a real API server through kube-rs.
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
}

impl Debug for KubeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeGateway").finish_non_exhaustive()
    }
}

impl KubeGateway {
    /// Creates a gateway from an existing client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects using an explicit kubeconfig, or the in-cluster and
    /// `KUBECONFIG` defaults when `kubeconfig` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Configuration`] when no usable cluster
    /// configuration is found or the client cannot be built.
    pub async fn connect(kubeconfig: Option<&Utf8Path>) -> Result<Self, ConformanceError> {
        let config = match kubeconfig {
            Some(path) => {
                let file = Kubeconfig::read_from(path).map_err(|error| {
                    ConformanceError::Configuration {
                        message: format!("failed to read kubeconfig {path}: {error}"),
                    }
                })?;
                Config::from_custom_kubeconfig(file, &KubeConfigOptions::default())
                    .await
                    .map_err(|error| ConformanceError::Configuration {
                        message: format!("invalid kubeconfig {path}: {error}"),
                    })?
            }
            None => Config::infer()
                .await
                .map_err(|error| ConformanceError::Configuration {
                    message: format!("no cluster configuration found: {error}"),
                })?,
        };

        debug!(cluster_url = %config.cluster_url, "connecting to cluster");
        let client = Client::try_from(config).map_err(|error| ConformanceError::Configuration {
            message: format!("failed to build Kubernetes client: {error}"),
        })?;
        Ok(Self::new(client))
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn create_in<K>(
        &self,
        operation: &str,
        namespace: &str,
        object: &K,
    ) -> Result<K, ClusterError>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned
            + Serialize
            + Send
            + Sync,
        K::DynamicType: Default,
    {
        self.namespaced::<K>(namespace)
            .create(&PostParams::default(), object)
            .await
            .map_err(|error| map_kube_error(operation, &error))
    }
}

fn test_namespace(prefix: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            generate_name: Some(prefix.to_owned()),
            labels: Some(BTreeMap::from([(
                TEST_NAMESPACE_LABEL.to_owned(),
                "true".to_owned(),
            )])),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    }
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    async fn server_version(&self) -> Result<String, ClusterError> {
        self.client
            .apiserver_version()
            .await
            .map(|info| info.git_version)
            .map_err(|error| map_kube_error("get server version", &error))
    }

    async fn create_namespace(&self, prefix: &str) -> Result<String, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let created = api
            .create(&PostParams::default(), &test_namespace(prefix))
            .await
            .map_err(|error| map_kube_error("create namespace", &error))?;
        created.metadata.name.ok_or_else(|| ClusterError::Rejected {
            operation: "create namespace".to_owned(),
            message: "API server returned a namespace without a name".to_owned(),
        })
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let params = DeleteParams {
            grace_period_seconds: Some(0),
            propagation_policy: Some(PropagationPolicy::Background),
            ..DeleteParams::default()
        };
        api.delete(name, &params)
            .await
            .map(|_| ())
            .map_err(|error| map_kube_error("delete namespace", &error))
    }

    async fn list_test_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let selector = format!("{TEST_NAMESPACE_LABEL}=true");
        let list = api
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|error| map_kube_error("list namespaces", &error))?;
        Ok(list
            .items
            .into_iter()
            .filter(|namespace| namespace.metadata.deletion_timestamp.is_none())
            .filter_map(|namespace| namespace.metadata.name)
            .collect())
    }

    async fn create_replication_controller(
        &self,
        namespace: &str,
        controller: &ReplicationController,
    ) -> Result<ReplicationController, ClusterError> {
        self.create_in("create replication controller", namespace, controller)
            .await
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, ClusterError> {
        self.create_in("create service", namespace, service).await
    }

    async fn create_secret(
        &self,
        namespace: &str,
        secret: &Secret,
    ) -> Result<Secret, ClusterError> {
        self.create_in("create secret", namespace, secret).await
    }

    async fn create_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, ClusterError> {
        self.create_in("create ingress", namespace, ingress).await
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, ClusterError> {
        self.namespaced::<Ingress>(namespace)
            .get(name)
            .await
            .map_err(|error| map_kube_error("get ingress", &error))
    }

    async fn list_endpoints(&self, namespace: &str) -> Result<Vec<Endpoints>, ClusterError> {
        self.namespaced::<Endpoints>(namespace)
            .list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|error| map_kube_error("list endpoints", &error))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_namespaces_are_generated_and_labelled() {
        let namespace = test_namespace("ingress-conformance-");

        assert_eq!(
            namespace.metadata.generate_name.as_deref(),
            Some("ingress-conformance-")
        );
        assert!(namespace.metadata.name.is_none());
        let labels = namespace.metadata.labels.unwrap_or_default();
        assert_eq!(labels.get(TEST_NAMESPACE_LABEL).map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn connect_reports_unreadable_kubeconfig() {
        let error = KubeGateway::connect(Some(Utf8Path::new("/nonexistent/kubeconfig")))
            .await
            .expect_err("missing kubeconfig should fail");

        assert!(matches!(error, ConformanceError::Configuration { .. }));
        assert!(error.to_string().contains("/nonexistent/kubeconfig"));
    }
}
