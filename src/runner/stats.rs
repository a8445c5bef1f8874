//! Scenario outcome counting across feature runs.

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use cucumber::event::ScenarioFinished;
use tracing::{info, warn};

/// Counts finished scenarios. Shared with the cucumber `after` hook.
#[derive(Debug, Default)]
pub struct RunStats {
    passed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl RunStats {
    /// Records how `scenario` finished.
    pub fn record(&self, scenario: &str, finished: &ScenarioFinished) {
        let counter = match finished {
            ScenarioFinished::StepPassed => &self.passed,
            ScenarioFinished::StepSkipped => {
                warn!(scenario, "scenario has steps without a definition");
                &self.skipped
            }
            ScenarioFinished::StepFailed(..) | ScenarioFinished::BeforeHookFailed(_) => {
                warn!(scenario, "scenario failed");
                &self.failed
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the totals recorded so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            passed: self.passed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Scenarios whose steps all passed.
    pub passed: usize,
    /// Scenarios with a failing step or hook.
    pub failed: usize,
    /// Scenarios stopped by a step without a definition.
    pub skipped: usize,
}

impl RunSummary {
    /// Returns the number of scenarios that ran.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// Returns `true` when no scenario failed or hit an undefined step.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Logs the totals.
    pub fn log(&self) {
        if self.total() == 0 {
            warn!("no scenarios matched the selected features and tags");
        }
        info!(
            passed = self.passed,
            failed = self.failed,
            skipped = self.skipped,
            "conformance run finished"
        );
    }

    /// Maps the outcome to the process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        if self.succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
