//! Behaviour-driven conformance suite for Kubernetes Ingress controllers.
//!
//! Gherkin features describe how an Ingress controller must behave. The
//! [`runner`] executes them with cucumber, one scenario at a time, against a
//! live cluster reached through the [`cluster::ClusterGateway`] trait. Each
//! scenario gets its own namespace, loads fixtures through [`manifests`],
//! waits for the Ingress address, probes it over HTTP, and checks the
//! response. The [`codegen`] module keeps the step definitions in sync with
//! the feature files.

pub mod cluster;
pub mod codegen;
pub mod config;
pub mod error;
pub mod files;
pub mod logging;
pub mod manifests;
pub mod runner;
pub mod scenario;
pub mod steps;

pub use cluster::{ClusterError, ClusterGateway, KubeGateway};
pub use config::{ConformanceConfig, OutputFormat};
pub use error::ConformanceError;
pub use runner::RunSummary;
pub use scenario::Scenario;
pub use steps::{ConformanceWorld, SuiteContext};
