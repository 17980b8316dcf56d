use thiserror::Error;

/// Failure of a single client operation. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The transport failed and the service composed no message.
    #[error("Network error. Please check your connection. ({0})")]
    Network(String),
    /// The service answered with an explicit error marker.
    #[error("{0}")]
    Remote(String),
    /// A local precondition failed; nothing was sent.
    #[error("{0}")]
    Validation(String),
    #[error("Unexpected response from the service: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_display_the_service_message_verbatim() {
        let err = ClientError::Remote("missing field".into());
        assert_eq!(format!("Error: {err}"), "Error: missing field");
    }

    #[test]
    fn network_errors_carry_transport_detail() {
        let err = ClientError::Network("HTTP 502".into());
        assert_eq!(
            err.to_string(),
            "Network error. Please check your connection. (HTTP 502)"
        );
    }
}
