//! Collects the distinct steps of a feature file.

use camino::Utf8Path;
use cucumber::gherkin::{self, GherkinEnv};

use super::snippet::{step_arguments, translate_step};
use super::{CodegenError, StepFunction};
use crate::files::{self, FileSource};

/// Reads and parses a feature file from `source`.
///
/// # Errors
///
/// Returns [`CodegenError::Feature`] when the file is missing, is not UTF-8,
/// or is not valid Gherkin.
pub fn parse_feature(
    source: &dyn FileSource,
    path: &Utf8Path,
) -> Result<gherkin::Feature, CodegenError> {
    let invalid = |message: String| CodegenError::Feature {
        path: path.to_string(),
        message,
    };
    let bytes = files::read(source, path).map_err(|error| invalid(error.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|error| invalid(error.to_string()))?;
    gherkin::Feature::parse(text, GherkinEnv::default()).map_err(|error| invalid(error.to_string()))
}

/// Returns the module scaffolded for a feature: the lowercase file name
/// without underscores or the `.feature` extension.
#[must_use]
pub fn module_name(path: &Utf8Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_lowercase()
        .replace('_', "")
        .replace(".feature", "")
}

struct StepText {
    text: String,
    keyword: &'static str,
    has_step_argument: bool,
}

impl StepText {
    fn new(step: &gherkin::Step, text: String) -> Self {
        let keyword = match step.ty {
            gherkin::StepType::Given => "given",
            gherkin::StepType::When => "when",
            gherkin::StepType::Then => "then",
        };
        Self {
            text,
            keyword,
            has_step_argument: step.table.is_some() || step.docstring.is_some(),
        }
    }
}

/// Replaces `<name>` placeholders with the values of one examples row.
fn substitute(text: &str, header: &[String], row: &[String]) -> String {
    header
        .iter()
        .zip(row)
        .fold(text.to_owned(), |expanded, (name, value)| {
            expanded.replace(&format!("<{name}>"), value)
        })
}

/// Lists the steps one scenario executes: backgrounds first, then its own
/// steps once per examples row.
fn scenario_steps(
    backgrounds: &[&gherkin::Background],
    scenario: &gherkin::Scenario,
) -> Vec<StepText> {
    let mut steps: Vec<StepText> = backgrounds
        .iter()
        .flat_map(|background| background.steps.iter())
        .map(|step| StepText::new(step, step.value.clone()))
        .collect();

    let tables: Vec<&gherkin::Table> = scenario
        .examples
        .iter()
        .filter_map(|examples| examples.table.as_ref())
        .collect();
    if tables.is_empty() {
        steps.extend(
            scenario
                .steps
                .iter()
                .map(|step| StepText::new(step, step.value.clone())),
        );
        return steps;
    }

    for table in tables {
        let Some((header, rows)) = table.rows.split_first() else {
            continue;
        };
        for row in rows {
            steps.extend(
                scenario
                    .steps
                    .iter()
                    .map(|step| StepText::new(step, substitute(&step.value, header, row))),
            );
        }
    }
    steps
}

/// Translates every distinct step of `feature` into a step function.
///
/// Steps are deduplicated by expression, keeping the first occurrence.
/// Background steps and expanded scenario outlines are included.
#[must_use]
pub fn steps_from_feature(feature: &gherkin::Feature) -> Vec<StepFunction> {
    let feature_background: Vec<&gherkin::Background> = feature.background.iter().collect();
    let mut texts: Vec<StepText> = feature
        .scenarios
        .iter()
        .flat_map(|scenario| scenario_steps(&feature_background, scenario))
        .collect();
    for rule in &feature.rules {
        let backgrounds: Vec<&gherkin::Background> = feature
            .background
            .iter()
            .chain(rule.background.iter())
            .collect();
        texts.extend(
            rule.scenarios
                .iter()
                .flat_map(|scenario| scenario_steps(&backgrounds, scenario)),
        );
    }

    let mut functions: Vec<StepFunction> = Vec::new();
    let mut unnamed = 0_usize;
    for step in texts {
        let (name, expression) = translate_step(&step.text);
        if functions
            .iter()
            .any(|function| function.expression == expression)
        {
            continue;
        }
        let function_name = if name.is_empty() {
            unnamed += 1;
            format!("step_definition_{unnamed}")
        } else {
            name
        };
        functions.push(StepFunction {
            name: function_name,
            arguments: step_arguments(&expression, step.has_step_argument),
            expression,
            keyword: Some(step.keyword.to_owned()),
        });
    }
    functions
}
