//! In-memory cluster used by behavioural tests.
//!
//! The fake keeps just enough state to drive the conformance steps without a
//! real API server: generated namespaces, created objects, one ready endpoint
//! per service, and an optional load balancer address published on every
//! Ingress. It rejects Ingress paths without a backend the way the API
//! server's validation does.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    EndpointAddress, EndpointSubset, Endpoints, ReplicationController, Secret, Service,
};
use k8s_openapi::api::networking::v1::{
    Ingress, IngressBackend, IngressLoadBalancerIngress, IngressLoadBalancerStatus,
    IngressStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::{ClusterError, ClusterGateway};

/// Gateway calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeCall {
    /// [`ClusterGateway::create_namespace`].
    CreateNamespace,
    /// [`ClusterGateway::delete_namespace`].
    DeleteNamespace,
    /// [`ClusterGateway::create_ingress`].
    CreateIngress,
    /// [`ClusterGateway::get_ingress`].
    GetIngress,
    /// [`ClusterGateway::create_service`].
    CreateService,
}

#[derive(Debug, Default)]
struct FakeState {
    next_suffix: u32,
    namespaces: BTreeSet<String>,
    deleted: Vec<String>,
    created: Vec<String>,
    ingresses: BTreeMap<(String, String), Ingress>,
    services: BTreeSet<(String, String)>,
    load_balancer: Option<String>,
    failures: VecDeque<(FakeCall, ClusterError)>,
}

impl FakeState {
    fn take_failure(&mut self, call: FakeCall) -> Result<(), ClusterError> {
        let position = self.failures.iter().position(|(queued, _)| *queued == call);
        match position.and_then(|index| self.failures.remove(index)) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn require_namespace(&self, operation: &str, namespace: &str) -> Result<(), ClusterError> {
        if self.namespaces.contains(namespace) {
            Ok(())
        } else {
            Err(ClusterError::NotFound {
                operation: operation.to_owned(),
                message: format!("namespaces \"{namespace}\" not found"),
            })
        }
    }

    fn record(&mut self, kind: &str, namespace: &str, metadata: &ObjectMeta) -> String {
        let name = metadata.name.clone().unwrap_or_default();
        self.created.push(format!("{kind} {namespace}/{name}"));
        name
    }
}

/// In-memory [`ClusterGateway`].
#[derive(Debug, Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    /// Creates an empty cluster without a load balancer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `address` on every Ingress created from now on.
    #[must_use]
    pub fn with_load_balancer(self, address: impl Into<String>) -> Self {
        self.lock().load_balancer = Some(address.into());
        self
    }

    /// Adds an existing namespace, as if left behind by an earlier run.
    pub fn seed_namespace(&self, name: impl Into<String>) {
        self.lock().namespaces.insert(name.into());
    }

    /// Makes the next matching call fail with `error`.
    pub fn fail_next(&self, call: FakeCall, error: ClusterError) {
        self.lock().failures.push_back((call, error));
    }

    /// Lists namespaces that currently exist.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.lock().namespaces.iter().cloned().collect()
    }

    /// Lists deleted namespaces in deletion order.
    #[must_use]
    pub fn deleted_namespaces(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    /// Lists created objects as `Kind namespace/name` in creation order.
    #[must_use]
    pub fn created_objects(&self) -> Vec<String> {
        self.lock().created.clone()
    }

    /// Returns the stored copy of an Ingress.
    #[must_use]
    pub fn ingress(&self, namespace: &str, name: &str) -> Option<Ingress> {
        self.lock()
            .ingresses
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn has_target(backend: &IngressBackend) -> bool {
    backend.service.is_some() || backend.resource.is_some()
}

/// Mirrors the API server's requirement that every backend names a target.
fn validate_backends(ingress: &Ingress) -> Result<(), String> {
    let Some(spec) = ingress.spec.as_ref() else {
        return Err("spec: Required value".to_owned());
    };
    if spec
        .default_backend
        .as_ref()
        .is_some_and(|backend| !has_target(backend))
    {
        return Err("spec.defaultBackend: Invalid value: must specify a backend".to_owned());
    }

    let rules = spec.rules.as_deref().unwrap_or_default();
    if rules.is_empty() && spec.default_backend.is_none() {
        return Err("spec: Invalid value: either `defaultBackend` or `rules` must be specified"
            .to_owned());
    }
    for (rule_index, rule) in rules.iter().enumerate() {
        let paths = rule.http.iter().flat_map(|http| http.paths.iter());
        for (path_index, path) in paths.enumerate() {
            if !has_target(&path.backend) {
                return Err(format!(
                    "spec.rules[{rule_index}].http.paths[{path_index}].backend: \
                     Invalid value: must specify a backend"
                ));
            }
        }
    }
    Ok(())
}

fn load_balancer_status(address: &str) -> IngressStatus {
    let entry = if address.parse::<IpAddr>().is_ok() {
        IngressLoadBalancerIngress {
            ip: Some(address.to_owned()),
            ..IngressLoadBalancerIngress::default()
        }
    } else {
        IngressLoadBalancerIngress {
            hostname: Some(address.to_owned()),
            ..IngressLoadBalancerIngress::default()
        }
    };
    IngressStatus {
        load_balancer: Some(IngressLoadBalancerStatus {
            ingress: Some(vec![entry]),
        }),
    }
}

fn ready_endpoints(namespace: &str, service: &str) -> Endpoints {
    Endpoints {
        metadata: ObjectMeta {
            name: Some(service.to_owned()),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        subsets: Some(vec![EndpointSubset {
            addresses: Some(vec![EndpointAddress {
                ip: "10.244.0.10".to_owned(),
                ..EndpointAddress::default()
            }]),
            ..EndpointSubset::default()
        }]),
    }
}

fn with_namespace(metadata: &ObjectMeta, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(namespace.to_owned()),
        ..metadata.clone()
    }
}

#[async_trait]
impl ClusterGateway for FakeCluster {
    async fn server_version(&self) -> Result<String, ClusterError> {
        Ok("v1.32.0-fake".to_owned())
    }

    async fn create_namespace(&self, prefix: &str) -> Result<String, ClusterError> {
        let mut state = self.lock();
        state.take_failure(FakeCall::CreateNamespace)?;
        state.next_suffix += 1;
        let name = format!("{prefix}{:05}", state.next_suffix);
        state.namespaces.insert(name.clone());
        Ok(name)
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let mut state = self.lock();
        state.take_failure(FakeCall::DeleteNamespace)?;
        if !state.namespaces.remove(name) {
            return Err(ClusterError::NotFound {
                operation: "delete namespace".to_owned(),
                message: format!("namespaces \"{name}\" not found"),
            });
        }
        state.ingresses.retain(|(namespace, _), _| namespace != name);
        state.services.retain(|(namespace, _)| namespace != name);
        state.deleted.push(name.to_owned());
        Ok(())
    }

    async fn list_test_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        Ok(self.namespaces())
    }

    async fn create_replication_controller(
        &self,
        namespace: &str,
        controller: &ReplicationController,
    ) -> Result<ReplicationController, ClusterError> {
        let mut state = self.lock();
        state.require_namespace("create replication controller", namespace)?;
        state.record("ReplicationController", namespace, &controller.metadata);
        Ok(ReplicationController {
            metadata: with_namespace(&controller.metadata, namespace),
            ..controller.clone()
        })
    }

    async fn create_service(
        &self,
        namespace: &str,
        service: &Service,
    ) -> Result<Service, ClusterError> {
        let mut state = self.lock();
        state.take_failure(FakeCall::CreateService)?;
        state.require_namespace("create service", namespace)?;
        let name = state.record("Service", namespace, &service.metadata);
        state.services.insert((namespace.to_owned(), name));
        Ok(Service {
            metadata: with_namespace(&service.metadata, namespace),
            ..service.clone()
        })
    }

    async fn create_secret(
        &self,
        namespace: &str,
        secret: &Secret,
    ) -> Result<Secret, ClusterError> {
        let mut state = self.lock();
        state.require_namespace("create secret", namespace)?;
        state.record("Secret", namespace, &secret.metadata);
        Ok(Secret {
            metadata: with_namespace(&secret.metadata, namespace),
            ..secret.clone()
        })
    }

    async fn create_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, ClusterError> {
        let mut state = self.lock();
        state.take_failure(FakeCall::CreateIngress)?;
        state.require_namespace("create ingress", namespace)?;
        validate_backends(ingress).map_err(|message| ClusterError::Rejected {
            operation: "create ingress".to_owned(),
            message: format!("Ingress.networking.k8s.io is invalid: {message}"),
        })?;

        let name = state.record("Ingress", namespace, &ingress.metadata);
        let stored = Ingress {
            metadata: with_namespace(&ingress.metadata, namespace),
            status: state.load_balancer.as_deref().map(load_balancer_status),
            ..ingress.clone()
        };
        state
            .ingresses
            .insert((namespace.to_owned(), name), stored.clone());
        Ok(stored)
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Ingress, ClusterError> {
        let mut state = self.lock();
        state.take_failure(FakeCall::GetIngress)?;
        state
            .ingresses
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                operation: "get ingress".to_owned(),
                message: format!("ingresses.networking.k8s.io \"{name}\" not found"),
            })
    }

    async fn list_endpoints(&self, namespace: &str) -> Result<Vec<Endpoints>, ClusterError> {
        let state = self.lock();
        Ok(state
            .services
            .iter()
            .filter(|(service_namespace, _)| service_namespace == namespace)
            .map(|(_, service)| ready_endpoints(namespace, service))
            .collect())
    }
}
