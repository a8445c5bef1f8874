//! Classification of kube-rs errors.

use super::ClusterError;

/// Transport failure fragments worth retrying.
const TRANSIENT_TRANSPORT_MESSAGES: &[&str] = &[
    "connection reset",
    "connection closed",
    "unexpected eof",
    "broken pipe",
    "timed out",
];

/// Message fragments the API server uses when it asks the client to wait.
const RETRY_HINT_MESSAGES: &[&str] = &["try again later", "retry after"];

/// Checks whether an API status response suggests retrying later.
///
/// `ErrorResponse` does not carry `details.retryAfterSeconds`, so a server
/// retry hint is recognised by its reason or message instead.
pub(super) fn is_transient_status(code: u16, reason: &str, message: &str) -> bool {
    let lowered = message.to_lowercase();
    matches!(code, 429 | 500 | 503 | 504)
        || matches!(
            reason,
            "Timeout"
                | "ServerTimeout"
                | "TooManyRequests"
                | "InternalError"
                | "ServiceUnavailable"
        )
        || RETRY_HINT_MESSAGES
            .iter()
            .any(|fragment| lowered.contains(fragment))
}

/// Checks whether a transport error message describes a dropped connection.
pub(super) fn is_transient_transport(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_TRANSPORT_MESSAGES
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

pub(super) fn map_kube_error(operation: &str, error: &kube::Error) -> ClusterError {
    let operation = operation.to_owned();

    if let kube::Error::Api(response) = error {
        let message = format!("{} ({})", response.message, response.reason);
        return if response.code == 404 {
            ClusterError::NotFound { operation, message }
        } else if is_transient_status(response.code, &response.reason, &response.message) {
            ClusterError::Transient { operation, message }
        } else {
            ClusterError::Rejected { operation, message }
        };
    }

    let message = error.to_string();
    let is_transport = matches!(
        error,
        kube::Error::HyperError(_) | kube::Error::Service(_) | kube::Error::ReadEvents(_)
    );
    if is_transport && is_transient_transport(&message) {
        ClusterError::Transient { operation, message }
    } else {
        ClusterError::Rejected { operation, message }
    }
}

#[cfg(test)]
mod tests {
    use kube::core::ErrorResponse;
    use rstest::rstest;

    use super::*;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_owned(),
            message: "request failed".to_owned(),
            reason: reason.to_owned(),
            code,
        })
    }

    #[rstest]
    #[case::throttled(429, "TooManyRequests")]
    #[case::internal(500, "InternalError")]
    #[case::unavailable(503, "ServiceUnavailable")]
    #[case::gateway_timeout(504, "Timeout")]
    #[case::server_timeout(409, "ServerTimeout")]
    fn transient_api_statuses_are_retryable(#[case] code: u16, #[case] reason: &str) {
        let error = map_kube_error("create namespace", &api_error(code, reason));

        assert!(error.is_retryable(), "{code} {reason} should be retryable");
    }

    #[rstest]
    #[case::reason_only(409, "ServiceUnavailable", "request failed")]
    #[case::hinted_message(409, "Conflict", "Too many requests, please try again later.")]
    #[case::retry_after(422, "", "the server asked to retry after 2 seconds")]
    fn server_retry_hints_are_retryable(
        #[case] code: u16,
        #[case] reason: &str,
        #[case] message: &str,
    ) {
        let error = kube::Error::Api(ErrorResponse {
            status: "Failure".to_owned(),
            message: message.to_owned(),
            reason: reason.to_owned(),
            code,
        });

        assert!(map_kube_error("delete namespace", &error).is_retryable());
    }

    #[rstest]
    fn missing_objects_map_to_not_found() {
        let error = map_kube_error("get ingress", &api_error(404, "NotFound"));

        assert!(error.is_not_found());
        assert!(!error.is_retryable());
        assert_eq!(error.operation(), "get ingress");
    }

    #[rstest]
    #[case::invalid(422, "Invalid")]
    #[case::forbidden(403, "Forbidden")]
    #[case::conflict(409, "AlreadyExists")]
    fn permanent_api_errors_are_rejected(#[case] code: u16, #[case] reason: &str) {
        let error = map_kube_error("create ingress", &api_error(code, reason));

        assert!(matches!(error, ClusterError::Rejected { .. }));
        assert!(error.message().contains(reason));
    }

    #[rstest]
    fn dropped_connections_are_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "Connection reset by peer");
        let error = map_kube_error("list endpoints", &kube::Error::ReadEvents(io));

        assert!(error.is_retryable());
    }

    #[rstest]
    #[case::reset("Connection reset by peer", true)]
    #[case::eof("unexpected EOF during handshake", true)]
    #[case::refused("connection refused", false)]
    fn transport_messages_are_classified(#[case] message: &str, #[case] expected: bool) {
        assert_eq!(is_transient_transport(message), expected);
    }
}
