//! The cucumber world carried through each scenario.

use std::sync::Arc;

use crate::cluster;
use crate::error::ConformanceError;
use crate::scenario::Scenario;

use super::{Steps, SuiteContext};

/// Scenario state plus a handle on the suite context.
///
/// The runner installs the context in a `before` hook, so a fresh world holds
/// none and every step fails until [`ConformanceWorld::begin`] has run.
#[derive(Debug, Default, cucumber::World)]
pub struct ConformanceWorld {
    context: Option<Arc<SuiteContext>>,
    scenario: Scenario,
}

impl ConformanceWorld {
    /// Starts a scenario: installs `context` and resets all scenario state.
    pub fn begin(&mut self, context: Arc<SuiteContext>) {
        self.scenario.reset();
        self.context = Some(context);
    }

    /// Returns the step implementations bound to this scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::MissingState`] when no suite context was
    /// installed.
    pub fn steps(&mut self) -> Result<Steps<'_>, ConformanceError> {
        let context = self
            .context
            .as_deref()
            .ok_or_else(|| ConformanceError::missing("suite context"))?;
        Ok(Steps::new(context, &mut self.scenario))
    }

    /// Returns the scenario state.
    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Deletes the scenario namespace, if one was created. Failures are
    /// logged and never fail the scenario.
    pub async fn teardown(&mut self) {
        let (Some(context), Some(namespace)) = (self.context.as_ref(), self.scenario.namespace.take())
        else {
            return;
        };
        cluster::delete_namespace_best_effort(context.cluster.as_ref(), &namespace).await;
    }
}
