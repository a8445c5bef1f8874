//! Shared test utilities.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use ingress_conformance::SuiteContext;
use ingress_conformance::cluster::fake::FakeCluster;
use ingress_conformance::cluster::{Backoff, PollSettings};
use ingress_conformance::files::EmbeddedFileSource;
use ingress_conformance::manifests::ManifestLoader;

/// Polling short enough for scenarios that are expected to time out.
pub const QUICK_POLLING: PollSettings = PollSettings {
    interval: Duration::from_millis(10),
    timeout: Duration::from_millis(300),
};

/// Builds a suite context over `cluster` with the bundled manifests and
/// millisecond polling and retries.
pub fn quick_context(cluster: Arc<FakeCluster>) -> Arc<SuiteContext> {
    let manifests = ManifestLoader::new(
        Arc::new(EmbeddedFileSource::bundled_manifests()),
        Some("conformance".to_owned()),
    );
    let context = SuiteContext::new(cluster, manifests)
        .with_polling(QUICK_POLLING, QUICK_POLLING)
        .with_backoff(Backoff {
            initial_delay: Duration::from_millis(1),
            factor: 2,
            steps: 3,
        });
    Arc::new(context)
}

/// Returns a local address nothing listens on.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .unwrap_or_else(|error| panic!("failed to bind a local port: {error}"));
    let address = listener
        .local_addr()
        .unwrap_or_else(|error| panic!("bound listener has no address: {error}"));
    drop(listener);
    address.to_string()
}
