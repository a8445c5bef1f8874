//! Gherkin bindings for the conformance steps.
//!
//! Each binding parses its captures and delegates to [`super::Steps`].
#![expect(
    clippy::needless_pass_by_value,
    reason = "cucumber hands captures to step functions by value"
)]

use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use super::ConformanceWorld;
use crate::error::ConformanceError;

#[given(regex = r"^a new random namespace$")]
async fn a_new_random_namespace(world: &mut ConformanceWorld) -> Result<(), ConformanceError> {
    world.steps()?.create_namespace().await
}

#[given(regex = r#"^reading Ingress from manifest "([^"]*)"$"#)]
fn reading_ingress_from_manifest(
    world: &mut ConformanceWorld,
    manifest: String,
) -> Result<(), ConformanceError> {
    world.steps()?.read_ingress_manifest(&manifest)
}

#[when(regex = r"^creating Ingress from manifest$")]
async fn creating_ingress_from_manifest(
    world: &mut ConformanceWorld,
) -> Result<(), ConformanceError> {
    world.steps()?.create_ingress().await
}

#[then(regex = r#"^creating Ingress from manifest returns an error message containing "([^"]*)"$"#)]
async fn creating_ingress_from_manifest_returns_an_error_message_containing(
    world: &mut ConformanceWorld,
    expected: String,
) -> Result<(), ConformanceError> {
    world
        .steps()?
        .create_ingress_expecting_error(&expected)
        .await
}

#[given(regex = r#"^creating an Ingress with host "([^"]*)" without backend serviceName$"#)]
fn creating_an_ingress_with_host_without_backend_servicename(
    world: &mut ConformanceWorld,
    host: String,
) -> Result<(), ConformanceError> {
    world.steps()?.ingress_without_backend(&host)
}

#[then(regex = r#"^The error message contains "([^"]*)"$"#)]
async fn the_error_message_contains(
    world: &mut ConformanceWorld,
    expected: String,
) -> Result<(), ConformanceError> {
    world
        .steps()?
        .create_ingress_expecting_error(&expected)
        .await
}

#[given(regex = r#"^an Ingress is created with host "([^"]*)" with an invalid backend$"#)]
async fn an_ingress_is_created_with_host_with_an_invalid_backend(
    world: &mut ConformanceWorld,
    host: String,
) -> Result<(), ConformanceError> {
    world.steps()?.ingress_with_invalid_backend(&host).await
}

#[given(regex = r#"^creating objects from directory "([^"]*)"$"#)]
async fn creating_objects_from_directory(
    world: &mut ConformanceWorld,
    directory: String,
) -> Result<(), ConformanceError> {
    world
        .steps()?
        .create_objects_from_directory(&directory)
        .await
}

#[given(regex = r"^[Tt]he ingress status shows the IP address or FQDN where is exposed$")]
async fn the_ingress_status_shows_the_ip_address_or_fqdn_where_is_exposed(
    world: &mut ConformanceWorld,
) -> Result<(), ConformanceError> {
    world.steps()?.resolve_ingress_address().await
}

#[when(regex = r#"^Header "([^"]*)" with value "([^"]*)"$"#)]
fn header_with_value(
    world: &mut ConformanceWorld,
    name: String,
    value: String,
) -> Result<(), ConformanceError> {
    world.steps()?.add_header(&name, &value)
}

#[when(regex = r#"^With path "([^"]*)"$"#)]
fn with_path(world: &mut ConformanceWorld, path: String) -> Result<(), ConformanceError> {
    world.steps()?.with_path(&path);
    Ok(())
}

#[when(regex = r#"^Send HTTP request with method "([^"]*)"$"#)]
async fn send_http_request_with_method(
    world: &mut ConformanceWorld,
    method: String,
) -> Result<(), ConformanceError> {
    world.steps()?.send_request(&method).await
}

#[when(regex = r"^send GET HTTP request$")]
async fn send_get_http_request(world: &mut ConformanceWorld) -> Result<(), ConformanceError> {
    world.steps()?.send_get_request().await
}

#[then(
    regex = r"^Send HTTP request with <path> and <method> checking response status code is (\d+):$"
)]
async fn send_http_request_with_path_and_method_checking_response_status_code_is(
    world: &mut ConformanceWorld,
    expected: u16,
    step: &Step,
) -> Result<(), ConformanceError> {
    let rows = step
        .table
        .as_ref()
        .map(|table| table.rows.clone())
        .unwrap_or_default();
    world
        .steps()?
        .check_paths_and_methods(expected, &rows)
        .await
}

#[then(regex = r"^Response status code is (\d+)$")]
fn response_status_code_is(
    world: &mut ConformanceWorld,
    expected: u16,
) -> Result<(), ConformanceError> {
    world.steps()?.response_status_code_is(expected)
}

#[then(regex = r"^the HTTP response code is (\d+)$")]
fn the_http_response_code_is(
    world: &mut ConformanceWorld,
    expected: u16,
) -> Result<(), ConformanceError> {
    world.steps()?.response_status_code_is(expected)
}

#[then(regex = r#"^Header "([^"]*)" is "([^"]*)"$"#)]
fn header_is(
    world: &mut ConformanceWorld,
    name: String,
    value: String,
) -> Result<(), ConformanceError> {
    world.steps()?.header_is(&name, &value)
}

#[then(regex = r#"^Header "([^"]*)" is not present$"#)]
fn header_is_not_present(
    world: &mut ConformanceWorld,
    name: String,
) -> Result<(), ConformanceError> {
    world.steps()?.header_is_not_present(&name)
}
