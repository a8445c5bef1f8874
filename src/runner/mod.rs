//! Runs the conformance features against a cluster.
//!
//! Each selected feature path gets its own cucumber run so that the
//! cucumber JSON format can write one report per feature. Scenarios run one
//! at a time; a `before` hook hands every scenario the shared
//! [`SuiteContext`] and an `after` hook records the outcome and deletes the
//! scenario namespace.

mod stats;

pub use stats::{RunStats, RunSummary};

use std::fs::{File, OpenOptions};
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cucumber::gherkin::tagexpr::TagOperation;
use cucumber::gherkin::{self, GherkinEnv};
use cucumber::tag::Ext as _;
use cucumber::writer::{self, Coloring, Verbosity};
use cucumber::{World as _, WriterExt as _};
use tracing::{debug, info};

use crate::cluster::{self, ClusterGateway};
use crate::config::{ConformanceConfig, OutputFormat};
use crate::error::ConformanceError;
use crate::files::{EmbeddedFileSource, FileSource, RootFileSource};
use crate::manifests::ManifestLoader;
use crate::steps::{ConformanceWorld, SuiteContext};

/// Where one feature's report is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    /// Standard output.
    Stdout,
    /// A file created (or truncated) for this feature.
    File(Utf8PathBuf),
    /// A file shared by every feature of the run.
    Append(Utf8PathBuf),
}

/// Everything the runner needs besides the cluster.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Feature files or directories, run in order.
    pub features: Vec<Utf8PathBuf>,
    /// Report format.
    pub format: OutputFormat,
    /// Report file, if configured.
    pub output: Option<Utf8PathBuf>,
    /// Scenario selection.
    pub tags: Option<TagOperation>,
    /// Stop at the first failing scenario.
    pub stop_on_failure: bool,
    /// Colour pretty output on a terminal.
    pub colors: bool,
}

impl RunPlan {
    /// Builds the plan from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Configuration`] when the format or tag
    /// expression is invalid.
    pub fn from_config(config: &ConformanceConfig) -> Result<Self, ConformanceError> {
        Ok(Self {
            features: config.feature_paths(),
            format: config.output_format()?,
            output: config.output_path().map(Utf8Path::to_path_buf),
            tags: config.tag_expression()?,
            stop_on_failure: config.stop_on_failure,
            colors: !config.no_colors,
        })
    }

    /// Chooses where the report for `feature` goes.
    #[must_use]
    pub fn report_target(&self, feature: &Utf8Path) -> ReportTarget {
        let stem = feature.file_stem().unwrap_or("features");
        match (self.format, self.output.as_deref()) {
            (OutputFormat::Pretty | OutputFormat::JUnit, None) => ReportTarget::Stdout,
            (OutputFormat::Pretty, Some(path)) => ReportTarget::Append(path.to_path_buf()),
            (OutputFormat::Cucumber, None) => {
                ReportTarget::File(Utf8PathBuf::from(format!("{stem}-report.json")))
            }
            (OutputFormat::Cucumber | OutputFormat::JUnit, Some(path)) => {
                if self.features.len() == 1 {
                    ReportTarget::File(path.to_path_buf())
                } else {
                    let name = path.file_name().unwrap_or("report");
                    ReportTarget::File(
                        path.parent()
                            .unwrap_or_else(|| Utf8Path::new(""))
                            .join(format!("{stem}-{name}")),
                    )
                }
            }
        }
    }

    /// Parses every feature file up front so syntax errors surface before
    /// any cluster work. Directories are left to the cucumber parser.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Configuration`] for missing or malformed
    /// feature files.
    pub fn check_features(&self) -> Result<(), ConformanceError> {
        for feature in &self.features {
            if feature.is_dir() {
                continue;
            }
            gherkin::Feature::parse_path(feature, GherkinEnv::default()).map_err(|error| {
                ConformanceError::Configuration {
                    message: format!("cannot parse feature {feature}: {error}"),
                }
            })?;
        }
        Ok(())
    }
}

/// Builds the manifest loader selected by the configuration.
#[must_use]
pub fn manifest_loader(config: &ConformanceConfig) -> ManifestLoader {
    let source: Arc<dyn FileSource> = if config.embedded_manifests {
        Arc::new(EmbeddedFileSource::bundled_manifests())
    } else {
        Arc::new(RootFileSource::new(config.manifests_dir()))
    };
    ManifestLoader::new(source, config.ingress_class().map(str::to_owned))
}

/// Logs the server version and deletes namespaces left by earlier runs.
///
/// # Errors
///
/// Returns [`ConformanceError::Kubernetes`] when the cluster cannot be
/// reached or the stale namespaces cannot be removed.
pub async fn prepare_cluster(cluster: &dyn ClusterGateway) -> Result<(), ConformanceError> {
    let version = cluster.server_version().await?;
    info!(%version, "connected to Kubernetes");
    let removed = cluster::cleanup_namespaces(cluster).await?;
    if removed > 0 {
        info!(removed, "removed namespaces left by earlier runs");
    }
    Ok(())
}

/// Prepares the cluster and runs every configured feature.
///
/// # Errors
///
/// Returns configuration, cluster preparation, or report file errors.
/// Scenario failures are reported through the returned summary.
pub async fn run(
    config: &ConformanceConfig,
    cluster: Arc<dyn ClusterGateway>,
) -> Result<RunSummary, ConformanceError> {
    let plan = RunPlan::from_config(config)?;
    plan.check_features()?;
    prepare_cluster(cluster.as_ref()).await?;
    let context = Arc::new(SuiteContext::new(cluster, manifest_loader(config)));
    execute(&plan, context).await
}

fn open_report(target: &ReportTarget) -> Result<Box<dyn io::Write>, ConformanceError> {
    let failure = |path: &Utf8Path, error: &io::Error| ConformanceError::Io {
        message: format!("cannot open report file {path}: {error}"),
    };
    match target {
        ReportTarget::Stdout => Ok(Box::new(io::stdout())),
        ReportTarget::File(path) => File::create(path)
            .map(|file| Box::new(file) as Box<dyn io::Write>)
            .map_err(|error| failure(path, &error)),
        ReportTarget::Append(path) => OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(|file| Box::new(file) as Box<dyn io::Write>)
            .map_err(|error| failure(path, &error)),
    }
}

/// Returns `true` when the scenario's own, rule, and feature tags satisfy
/// `tags`.
#[must_use]
pub fn is_selected(
    tags: Option<&TagOperation>,
    feature: &gherkin::Feature,
    rule: Option<&gherkin::Rule>,
    scenario: &gherkin::Scenario,
) -> bool {
    tags.is_none_or(|operation| {
        operation.eval(
            feature
                .tags
                .iter()
                .chain(rule.iter().flat_map(|parent| parent.tags.iter()))
                .chain(scenario.tags.iter()),
        )
    })
}

macro_rules! run_feature {
    ($writer:expr, $input:expr, $plan:expr, $context:expr, $stats:expr) => {{
        let before_context = Arc::clone($context);
        let after_stats = Arc::clone($stats);
        let selection = $plan.tags.clone();
        let cucumber = ConformanceWorld::cucumber()
            .max_concurrent_scenarios(1)
            .before(move |_feature, _rule, scenario, world| {
                let context = Arc::clone(&before_context);
                Box::pin(async move {
                    debug!(scenario = %scenario.name, "starting scenario");
                    world.begin(context);
                })
            })
            .after(move |_feature, _rule, scenario, finished, world| {
                let outcomes = Arc::clone(&after_stats);
                Box::pin(async move {
                    outcomes.record(&scenario.name, finished);
                    if let Some(finished_world) = world {
                        finished_world.teardown().await;
                    }
                })
            })
            .with_writer($writer)
            .with_default_cli();
        let configured = if $plan.stop_on_failure {
            cucumber.fail_fast()
        } else {
            cucumber
        };
        configured
            .filter_run($input, move |feature, rule, scenario| {
                is_selected(selection.as_ref(), feature, rule, scenario)
            })
            .await;
    }};
}

/// Runs every feature in `plan` with a ready suite context.
///
/// # Errors
///
/// Returns [`ConformanceError::Io`] when a report file cannot be opened.
pub async fn execute(
    plan: &RunPlan,
    context: Arc<SuiteContext>,
) -> Result<RunSummary, ConformanceError> {
    let stats = Arc::new(RunStats::default());
    if let (OutputFormat::Pretty, Some(path)) = (plan.format, plan.output.as_deref()) {
        File::create(path).map_err(|error| ConformanceError::Io {
            message: format!("cannot create report file {path}: {error}"),
        })?;
    }

    for feature in &plan.features {
        let target = plan.report_target(feature);
        let output = open_report(&target)?;
        let input = feature.clone().into_std_path_buf();
        info!(%feature, format = %plan.format, ?target, "running feature");

        match plan.format {
            OutputFormat::Pretty => {
                let coloring = if plan.colors && target == ReportTarget::Stdout {
                    Coloring::Auto
                } else {
                    Coloring::Never
                };
                run_feature!(
                    writer::Basic::new(output, coloring, Verbosity::Default)
                        .summarized()
                        .assert_normalized(),
                    input,
                    plan,
                    &context,
                    &stats
                );
            }
            OutputFormat::Cucumber => {
                run_feature!(writer::Json::new(output), input, plan, &context, &stats);
            }
            OutputFormat::JUnit => {
                run_feature!(
                    writer::JUnit::new(output, Verbosity::Default),
                    input,
                    plan,
                    &context,
                    &stats
                );
            }
        }

        let so_far = stats.summary();
        if plan.stop_on_failure && !so_far.succeeded() {
            info!(%feature, "stopping after failure");
            break;
        }
    }

    let summary = stats.summary();
    summary.log();
    Ok(summary)
}
