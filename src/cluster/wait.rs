//! Polling helpers for Ingress addresses and service endpoints.

use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::core::v1::Endpoints;
use k8s_openapi::api::networking::v1::Ingress;
use tokio::time::Instant;
use tracing::debug;

use super::{ClusterError, ClusterGateway};
use crate::error::ConformanceError;

/// Interval and deadline for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between checks.
    pub interval: Duration,
    /// Total time before giving up.
    pub timeout: Duration,
}

impl PollSettings {
    /// Waiting for a load balancer to publish an Ingress address.
    pub const INGRESS_ADDRESS: Self = Self {
        interval: Duration::from_secs(5),
        timeout: Duration::from_secs(5 * 60),
    };

    /// Waiting for a service's pods to become ready endpoints.
    pub const SERVICE_ENDPOINTS: Self = Self {
        interval: Duration::from_secs(2),
        timeout: Duration::from_secs(5 * 60),
    };
}

/// Returns the addresses published in an Ingress status, preferring the IP of
/// each load balancer entry over its hostname.
#[must_use]
pub fn ingress_addresses(ingress: &Ingress) -> Vec<String> {
    ingress
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|load_balancer| load_balancer.ingress.as_ref())
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            entry
                .ip
                .as_ref()
                .filter(|ip| !ip.is_empty())
                .or_else(|| entry.hostname.as_ref().filter(|host| !host.is_empty()))
                .cloned()
        })
        .collect()
}

/// Checks immediately and then every `settings.interval` until `check`
/// yields a value.
///
/// Transient errors keep the loop going; any other error ends it.
async fn poll_until<T, F, Fut>(
    settings: PollSettings,
    condition: &str,
    mut check: F,
) -> Result<T, ConformanceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ClusterError>>,
{
    let started = Instant::now();
    loop {
        match check().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => debug!(condition, "condition not met yet"),
            Err(error) if error.is_retryable() => {
                debug!(condition, %error, "transient failure while polling");
            }
            Err(error) => return Err(error.into()),
        }

        let waited = started.elapsed();
        if waited >= settings.timeout {
            return Err(ConformanceError::Timeout {
                condition: condition.to_owned(),
                waited,
            });
        }
        tokio::time::sleep(settings.interval.min(settings.timeout.saturating_sub(waited))).await;
    }
}

/// Waits until the Ingress `name` reports a load balancer address and
/// returns the first one.
///
/// # Errors
///
/// Returns [`ConformanceError::Timeout`] when no address appears in time, or
/// [`ConformanceError::Kubernetes`] on a non-transient API failure.
pub async fn wait_for_ingress_address(
    gateway: &dyn ClusterGateway,
    namespace: &str,
    name: &str,
    settings: PollSettings,
) -> Result<String, ConformanceError> {
    let condition = format!("an address on ingress {namespace}/{name}");
    let address = poll_until(settings, &condition, || async move {
        let ingress = gateway.get_ingress(namespace, name).await?;
        Ok::<_, ClusterError>(ingress_addresses(&ingress).into_iter().next())
    })
    .await?;
    debug!(namespace, name, %address, "ingress address published");
    Ok(address)
}

/// Counts the ready addresses of the endpoints object backing `service`.
#[must_use]
pub fn ready_endpoint_count(endpoints: &[Endpoints], service: &str) -> usize {
    endpoints
        .iter()
        .filter(|item| item.metadata.name.as_deref() == Some(service))
        .flat_map(|item| item.subsets.iter().flatten())
        .map(|subset| subset.addresses.as_ref().map_or(0, Vec::len))
        .sum()
}

/// Waits until `service` has exactly `expected` ready endpoints.
///
/// # Errors
///
/// Returns [`ConformanceError::Timeout`] when the count is not reached in
/// time, or [`ConformanceError::Kubernetes`] on a non-transient API failure.
pub async fn wait_for_service_endpoints(
    gateway: &dyn ClusterGateway,
    namespace: &str,
    service: &str,
    expected: usize,
    settings: PollSettings,
) -> Result<(), ConformanceError> {
    let condition = format!("{expected} ready endpoint(s) for service {namespace}/{service}");
    poll_until(settings, &condition, || async move {
        let endpoints = gateway.list_endpoints(namespace).await?;
        let ready = ready_endpoint_count(&endpoints, service);
        Ok::<_, ClusterError>((ready == expected).then_some(()))
    })
    .await
}
