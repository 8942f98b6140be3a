use notion_gcal_core::{FailureKind, RemoteError};

/// Sort a google-calendar client error into a failure kind.
///
/// The client only exposes errors as text, so this looks for the HTTP status
/// and the few reasons Google spells out.
pub fn classify(message: &str) -> RemoteError {
    RemoteError::new(kind_of(message), message)
}

fn kind_of(message: &str) -> FailureKind {
    let lower = message.to_lowercase();

    if lower.contains("ratelimitexceeded") || has_status(message, 429) {
        return FailureKind::Transient;
    }
    if has_status(message, 401)
        || has_status(message, 403)
        || lower.contains("invalid_grant")
        || lower.contains("unauthorized")
    {
        return FailureKind::Auth;
    }
    if has_status(message, 404) || has_status(message, 410) || lower.contains("not found") {
        return FailureKind::NotFound;
    }
    if [500, 502, 503, 504].iter().any(|code| has_status(message, *code))
        || lower.contains("timed out")
        || lower.contains("connection")
    {
        return FailureKind::Transient;
    }
    FailureKind::Permanent
}

/// `code` appears as a number of its own, not inside a longer one.
fn has_status(message: &str, code: u16) -> bool {
    message
        .split(|c: char| !c.is_ascii_digit())
        .any(|token| token == code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors() {
        assert_eq!(classify("HTTP Error. Code: 401 Unauthorized").kind, FailureKind::Auth);
        assert_eq!(classify("code 403: insufficient permissions").kind, FailureKind::Auth);
        assert_eq!(classify("refresh failed: invalid_grant").kind, FailureKind::Auth);
    }

    #[test]
    fn test_rate_limit_is_transient_even_as_403() {
        assert_eq!(
            classify("code 403: userRateLimitExceeded").kind,
            FailureKind::Transient
        );
        assert_eq!(classify("status 429").kind, FailureKind::Transient);
    }

    #[test]
    fn test_gone_events() {
        assert_eq!(classify("code 404: Not Found").kind, FailureKind::NotFound);
        assert_eq!(classify("code 410: Gone").kind, FailureKind::NotFound);
    }

    #[test]
    fn test_server_and_network_errors_are_transient() {
        assert_eq!(classify("code 503: backendError").kind, FailureKind::Transient);
        assert_eq!(classify("operation timed out").kind, FailureKind::Transient);
    }

    #[test]
    fn test_status_must_stand_alone() {
        assert_eq!(classify("event 14045 invalid").kind, FailureKind::Permanent);
        assert_eq!(classify("code 400: bad request").kind, FailureKind::Permanent);
    }
}
