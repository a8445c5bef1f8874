//! Reports feature steps without a matching step function and, with
//! `--update`, scaffolds them.

use std::io::{self, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use ingress_conformance::codegen::{
    CodegenError, CodegenOptions, collect_feature_paths, process_feature,
};
use ingress_conformance::files::RootFileSource;
use ingress_conformance::logging;
use tracing::{debug, warn};

/// Command-line arguments of the codegen tool.
#[derive(Debug, Parser)]
#[command(name = "codegen", about = "Keep step definitions in sync with feature files")]
struct Cli {
    /// Write scaffolding for missing step functions.
    #[arg(long)]
    update: bool,

    /// Log debug output.
    #[arg(long, short)]
    verbose: bool,

    /// Directory holding the step definition sources.
    #[arg(long, default_value = "src/steps")]
    conformance_path: Utf8PathBuf,

    /// Jinja2 template used for scaffolding instead of the built-in one.
    #[arg(long)]
    template: Option<Utf8PathBuf>,

    /// Feature files or directories to analyse.
    #[arg(required = true)]
    features: Vec<Utf8PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { "info" });

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

/// Processes every feature and prints its report. Returns `true` when all
/// features are in sync after the run.
fn run(cli: &Cli) -> Result<bool, CodegenError> {
    let template = cli
        .template
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path).map_err(|error| CodegenError::Io {
                path: path.to_string(),
                message: error.to_string(),
            })
        })
        .transpose()?;
    let options = CodegenOptions {
        conformance_path: cli.conformance_path.clone(),
        update: cli.update,
        template,
    };
    let source = RootFileSource::new(".");

    let mut stdout = io::stdout().lock();
    let mut in_sync = true;
    for feature in collect_feature_paths(&cli.features)? {
        debug!(%feature, "analysing feature");
        let report = process_feature(&source, &feature, &options)?;
        let scaffolded = cli.update && report.mismatched.is_empty();
        if !report.is_in_sync() && !scaffolded {
            warn!(
                %feature,
                missing = report.missing.len(),
                mismatched = report.mismatched.len(),
                "feature is out of sync with the step definitions"
            );
            in_sync = false;
        }
        writeln!(stdout, "{}", report.to_pretty_json()?).map_err(|error| CodegenError::Io {
            path: "stdout".to_owned(),
            message: error.to_string(),
        })?;
    }
    Ok(in_sync)
}
