//! Comparison of feature steps with existing step functions.

use camino::Utf8Path;
use serde::Serialize;

use super::{CodegenError, StepFunction};

/// A step function whose arguments differ from those the step implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentMismatch {
    /// Function name in the source.
    pub name: String,
    /// Step expression.
    pub expression: String,
    /// Arguments inferred from the feature.
    pub expected: Vec<String>,
    /// Arguments found in the source.
    pub actual: Vec<String>,
}

/// Result of comparing one feature with the step sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Feature file path.
    pub feature: String,
    /// Module new step functions are scaffolded into.
    pub module: String,
    /// Distinct steps of the feature.
    pub steps: Vec<StepFunction>,
    /// Functions found in the sources.
    pub functions: Vec<StepFunction>,
    /// Steps without a function.
    pub missing: Vec<StepFunction>,
    /// Steps bound to a function with different arguments.
    pub mismatched: Vec<ArgumentMismatch>,
}

/// Finds the function bound to `step`: by expression first, then by name.
fn bound_function<'a>(
    step: &StepFunction,
    functions: &'a [StepFunction],
) -> Option<&'a StepFunction> {
    functions
        .iter()
        .find(|function| {
            !function.expression.is_empty() && function.expression == step.expression
        })
        .or_else(|| functions.iter().find(|function| function.name == step.name))
}

impl SyncReport {
    /// Compares `steps` with `functions`.
    #[must_use]
    pub fn new(
        feature: &Utf8Path,
        module: &str,
        steps: Vec<StepFunction>,
        functions: Vec<StepFunction>,
    ) -> Self {
        let mut missing = Vec::new();
        let mut mismatched = Vec::new();
        for step in &steps {
            match bound_function(step, &functions) {
                None => missing.push(step.clone()),
                Some(function) if function.arguments != step.arguments => {
                    mismatched.push(ArgumentMismatch {
                        name: function.name.clone(),
                        expression: step.expression.clone(),
                        expected: step.arguments.clone(),
                        actual: function.arguments.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        Self {
            feature: feature.to_string(),
            module: module.to_owned(),
            steps,
            functions,
            missing,
            mismatched,
        }
    }

    /// Returns `true` when every step has a function with matching arguments.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }

    /// Renders the report as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::Io`] when serialisation fails.
    pub fn to_pretty_json(&self) -> Result<String, CodegenError> {
        serde_json::to_string_pretty(self).map_err(|error| CodegenError::Io {
            path: self.feature.clone(),
            message: error.to_string(),
        })
    }
}
