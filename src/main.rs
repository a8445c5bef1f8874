//! Ingress conformance suite entrypoint.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use ingress_conformance::{
    ConformanceConfig, ConformanceError, KubeGateway, RunSummary, logging, runner,
};
use ortho_config::OrthoConfig;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init("info");
    match run().await {
        Ok(summary) => summary.exit_code(),
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RunSummary, ConformanceError> {
    let config = load_config()?;
    config.validate()?;

    let gateway = KubeGateway::connect(config.kubeconfig_path()).await?;
    runner::run(&config, Arc::new(gateway)).await
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`ConformanceError::Configuration`] when ortho-config fails to
/// parse arguments or load configuration files.
fn load_config() -> Result<ConformanceConfig, ConformanceError> {
    ConformanceConfig::load().map_err(|error| ConformanceError::Configuration {
        message: error.to_string(),
    })
}
