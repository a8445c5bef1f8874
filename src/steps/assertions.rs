//! Checks run against the captured HTTP response.

use http::StatusCode;
use http::header::HeaderMap;

use crate::error::ConformanceError;

fn header_values(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .collect()
}

/// Requires the captured status to equal `expected`.
///
/// # Errors
///
/// Returns [`ConformanceError::Assertion`] naming both codes, or noting that
/// no response was captured.
pub fn response_status_code_is(
    actual: Option<StatusCode>,
    expected: u16,
) -> Result<(), ConformanceError> {
    match actual {
        Some(status) if status.as_u16() == expected => Ok(()),
        Some(status) => Err(ConformanceError::assertion(format!(
            "expected status code {expected} but {} was returned",
            status.as_u16()
        ))),
        None => Err(ConformanceError::assertion(format!(
            "expected status code {expected} but no response was captured"
        ))),
    }
}

/// Requires header `name` to have exactly one value, equal to `expected`.
///
/// # Errors
///
/// Returns [`ConformanceError::Assertion`] when the header is missing,
/// repeated, or different.
pub fn header_is(
    headers: Option<&HeaderMap>,
    name: &str,
    expected: &str,
) -> Result<(), ConformanceError> {
    let Some(response_headers) = headers else {
        return Err(ConformanceError::assertion(format!(
            "expected header {name} with value {expected:?} but no response was captured"
        )));
    };

    match header_values(response_headers, name).as_slice() {
        [] => Err(ConformanceError::assertion(format!(
            "expected header {name} with value {expected:?} but it is not present"
        ))),
        [actual] if actual == expected => Ok(()),
        [actual] => Err(ConformanceError::assertion(format!(
            "expected header {name} to be {expected:?} but was {actual:?}"
        ))),
        several => Err(ConformanceError::assertion(format!(
            "expected a single value {expected:?} for header {name} but found {several:?}"
        ))),
    }
}

/// Requires header `name` to be absent from the response.
///
/// # Errors
///
/// Returns [`ConformanceError::Assertion`] naming the value(s) present.
pub fn header_is_not_present(
    headers: Option<&HeaderMap>,
    name: &str,
) -> Result<(), ConformanceError> {
    let values = headers.map_or_else(Vec::new, |map| header_values(map, name));
    if values.is_empty() {
        Ok(())
    } else {
        Err(ConformanceError::assertion(format!(
            "expected no header with name {name} but exists (value {})",
            values.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use http::header::HeaderValue;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn headers() -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert("content-type", HeaderValue::from_static("text/plain"));
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map
    }

    #[rstest]
    fn matching_status_passes() {
        assert_eq!(response_status_code_is(Some(StatusCode::OK), 200), Ok(()));
    }

    #[rstest]
    fn mismatched_status_names_both_codes() {
        let error = response_status_code_is(Some(StatusCode::NOT_FOUND), 200)
            .expect_err("404 is not 200");

        assert_eq!(
            error.to_string(),
            "expected status code 200 but 404 was returned"
        );
    }

    #[rstest]
    fn missing_response_fails_status_check() {
        let error = response_status_code_is(None, 200).expect_err("nothing was captured");

        assert!(error.to_string().contains("no response"));
    }

    #[rstest]
    fn header_lookup_is_case_insensitive(headers: HeaderMap) {
        assert_eq!(header_is(Some(&headers), "Content-Type", "text/plain"), Ok(()));
    }

    #[rstest]
    #[case::different("content-type", "application/json", "to be")]
    #[case::absent("x-missing", "value", "not present")]
    #[case::repeated("set-cookie", "a=1", "single value")]
    fn header_mismatches_are_described(
        headers: HeaderMap,
        #[case] name: &str,
        #[case] expected: &str,
        #[case] fragment: &str,
    ) {
        let error = header_is(Some(&headers), name, expected).expect_err("should not match");

        assert!(
            error.to_string().contains(fragment),
            "{error} should mention {fragment:?}"
        );
    }

    #[rstest]
    fn absent_header_passes(headers: HeaderMap) {
        assert_eq!(header_is_not_present(Some(&headers), "X-Test"), Ok(()));
        assert_eq!(header_is_not_present(None, "X-Test"), Ok(()));
    }

    #[rstest]
    fn present_header_names_its_value(headers: HeaderMap) {
        let error = header_is_not_present(Some(&headers), "Set-Cookie")
            .expect_err("header is present");

        assert_eq!(
            error.to_string(),
            "expected no header with name Set-Cookie but exists (value a=1, b=2)"
        );
    }
}
