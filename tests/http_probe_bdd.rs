//! Behavioural tests for HTTP probing of the Ingress address.

mod support {
    #[path = "../support/mod.rs"]
    mod common;

    pub use common::{closed_address, quick_context};

    #[path = "../support/runtime.rs"]
    pub mod runtime;
}

use std::error::Error;
use std::sync::Arc;

use ingress_conformance::cluster::fake::FakeCluster;
use ingress_conformance::steps::Steps;
use ingress_conformance::{ConformanceError, Scenario, SuiteContext};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::runtime::{SharedRuntime, ensure_runtime_and_server};
use support::{closed_address, quick_context};

const ECHO_PATH: &str = "/echo";

type StepResult = Result<(), Box<dyn Error>>;

#[derive(ScenarioState, Default)]
struct ProbeState {
    runtime: Slot<SharedRuntime>,
    server: Slot<MockServer>,
    context: Slot<Arc<SuiteContext>>,
    scenario: Slot<Scenario>,
    send_error: Slot<ConformanceError>,
}

#[fixture]
fn probe_state() -> ProbeState {
    ProbeState::default()
}

fn mount_echo(probe_state: &ProbeState, template: ResponseTemplate) -> StepResult {
    let runtime = probe_state
        .runtime
        .get()
        .ok_or("runtime must be initialised")?;
    probe_state
        .server
        .with_ref(|server| {
            runtime.block_on(
                Mock::given(method("GET"))
                    .and(path(ECHO_PATH))
                    .respond_with(template)
                    .mount(server),
            );
        })
        .ok_or("mock server must be initialised")?;
    Ok(())
}

#[given("a scenario whose Ingress address is the mock backend")]
fn scenario_at_mock_backend(probe_state: &ProbeState) -> StepResult {
    ensure_runtime_and_server(&probe_state.runtime, &probe_state.server)?;
    let address = probe_state
        .server
        .with_ref(|server| server.address().to_string())
        .ok_or("mock server must be initialised")?;

    let mut scenario = Scenario::default();
    scenario.address = Some(address);
    scenario.set_request_path(ECHO_PATH);
    probe_state.scenario.set(scenario);
    probe_state
        .context
        .set(quick_context(Arc::new(FakeCluster::new())));
    Ok(())
}

#[given("the backend answers {status:u16}")]
fn backend_answers(probe_state: &ProbeState, status: u16) -> StepResult {
    mount_echo(probe_state, ResponseTemplate::new(status))
}

#[given("the backend answers {status:u16} with header {name} set to {value}")]
fn backend_answers_with_header(
    probe_state: &ProbeState,
    status: u16,
    name: String,
    value: String,
) -> StepResult {
    mount_echo(
        probe_state,
        ResponseTemplate::new(status).insert_header(name.as_str(), value.as_str()),
    )
}

#[when("the header {name} is added with value {value}")]
fn header_added(probe_state: &ProbeState, name: String, value: String) -> StepResult {
    let context = probe_state
        .context
        .get()
        .ok_or("context must be initialised")?;
    probe_state
        .scenario
        .with_mut(|scenario| Steps::new(&context, scenario).add_header(&name, &value))
        .ok_or("scenario must be initialised")??;
    Ok(())
}

#[when("a GET request is sent")]
fn get_request_sent(probe_state: &ProbeState) -> StepResult {
    let runtime = probe_state
        .runtime
        .get()
        .ok_or("runtime must be initialised")?;
    let context = probe_state
        .context
        .get()
        .ok_or("context must be initialised")?;
    let outcome = probe_state
        .scenario
        .with_mut(|scenario| runtime.block_on(Steps::new(&context, scenario).send_get_request()))
        .ok_or("scenario must be initialised")?;
    if let Err(error) = outcome {
        probe_state.send_error.set(error);
    }
    Ok(())
}

#[when("the Ingress address stops accepting connections")]
fn address_refuses_connections(probe_state: &ProbeState) -> StepResult {
    probe_state
        .scenario
        .with_mut(|scenario| scenario.address = Some(closed_address()))
        .ok_or("scenario must be initialised")?;
    Ok(())
}

#[then("the backend received the {name} values {first} then {second}")]
fn backend_received_values(
    probe_state: &ProbeState,
    name: String,
    first: String,
    second: String,
) -> StepResult {
    let runtime = probe_state
        .runtime
        .get()
        .ok_or("runtime must be initialised")?;
    let requests = probe_state
        .server
        .with_ref(|server| runtime.block_on(server.received_requests()))
        .flatten()
        .ok_or("request recording must be enabled")?;
    let request = requests.last().ok_or("the backend received no request")?;
    let values: Vec<&str> = request
        .headers
        .get_all(name.as_str())
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    assert_eq!(values, [first.as_str(), second.as_str()]);
    Ok(())
}

#[then("the send failed with a transport error")]
fn send_failed(probe_state: &ProbeState) {
    let error = probe_state.send_error.get();
    assert!(
        matches!(error, Some(ConformanceError::Transport { .. })),
        "expected a transport error, got {error:?}"
    );
}

#[then("no response is recorded")]
fn no_response(probe_state: &ProbeState) -> StepResult {
    let (status, headers, body_empty) = probe_state
        .scenario
        .with_ref(|scenario| {
            (
                scenario.response_status(),
                scenario.response_headers().cloned(),
                scenario.response_body().is_empty(),
            )
        })
        .ok_or("scenario must be initialised")?;

    assert_eq!(status, None);
    assert_eq!(headers, None);
    assert!(body_empty, "response body should be cleared");
    Ok(())
}

#[then("asserting status {expected:u16} fails mentioning {actual:u16}")]
fn status_assertion_fails(probe_state: &ProbeState, expected: u16, actual: u16) -> StepResult {
    let context = probe_state
        .context
        .get()
        .ok_or("context must be initialised")?;
    let outcome = probe_state
        .scenario
        .with_mut(|scenario| Steps::new(&context, scenario).response_status_code_is(expected))
        .ok_or("scenario must be initialised")?;

    let message = outcome
        .err()
        .ok_or("status assertion should fail")?
        .to_string();
    assert!(message.contains(&expected.to_string()), "{message}");
    assert!(message.contains(&actual.to_string()), "{message}");
    Ok(())
}

#[then("asserting {name} is not present fails mentioning {value}")]
fn absence_assertion_fails(probe_state: &ProbeState, name: String, value: String) -> StepResult {
    let context = probe_state
        .context
        .get()
        .ok_or("context must be initialised")?;
    let outcome = probe_state
        .scenario
        .with_mut(|scenario| Steps::new(&context, scenario).header_is_not_present(&name))
        .ok_or("scenario must be initialised")?;

    let message = outcome
        .err()
        .ok_or("absence assertion should fail")?
        .to_string();
    assert!(message.contains(&value), "{message}");
    Ok(())
}

#[then("asserting {name} is not present passes")]
fn absence_assertion_passes(probe_state: &ProbeState, name: String) -> StepResult {
    let context = probe_state
        .context
        .get()
        .ok_or("context must be initialised")?;
    probe_state
        .scenario
        .with_mut(|scenario| Steps::new(&context, scenario).header_is_not_present(&name))
        .ok_or("scenario must be initialised")??;
    Ok(())
}

#[scenario(path = "tests/features/http_probe.feature", index = 0)]
fn repeated_headers_keep_every_value(probe_state: ProbeState) {
    let _ = probe_state;
}

#[scenario(path = "tests/features/http_probe.feature", index = 1)]
fn failed_send_clears_the_response(probe_state: ProbeState) {
    let _ = probe_state;
}

#[scenario(path = "tests/features/http_probe.feature", index = 2)]
fn status_mismatch_names_both_codes(probe_state: ProbeState) {
    let _ = probe_state;
}

#[scenario(path = "tests/features/http_probe.feature", index = 3)]
fn header_absence_is_checked(probe_state: ProbeState) {
    let _ = probe_state;
}
