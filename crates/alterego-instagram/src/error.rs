//! Mapping of Instagram API failures onto [`ChannelError`].

use alterego_channels::ChannelError;

/// Default wait when a 429 carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Markers Instagram puts in the body when the session cookie is no longer valid.
const SESSION_MARKERS: &[&str] = &["login_required", "challenge_required", "checkpoint_required"];

/// Which operation failed; decides the fallback error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Send,
}

/// Classify a non-success HTTP response.
pub fn status_error(op: Op, status: u16, retry_after: Option<u64>, body: &str) -> ChannelError {
    if status == 429 {
        return ChannelError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        };
    }

    if status == 401 || status == 403 || SESSION_MARKERS.iter().any(|m| body.contains(m)) {
        return ChannelError::SessionExpired(format!("HTTP {status}"));
    }

    let message = format!("HTTP {status}: {}", snippet(body));
    match op {
        Op::Read => ChannelError::ConnectionFailed(message),
        Op::Send => ChannelError::SendFailed(message),
    }
}

/// Classify a transport-level failure.
pub fn transport_error(op: Op, err: reqwest::Error, timeout_ms: u64) -> ChannelError {
    if err.is_timeout() {
        return ChannelError::Timeout { ms: timeout_ms };
    }
    match op {
        Op::Read => ChannelError::ConnectionFailed(err.to_string()),
        Op::Send => ChannelError::SendFailed(err.to_string()),
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_uses_header_or_default() {
        assert!(matches!(
            status_error(Op::Read, 429, Some(12), ""),
            ChannelError::RateLimited { retry_after_secs: 12 }
        ));
        assert!(matches!(
            status_error(Op::Send, 429, None, ""),
            ChannelError::RateLimited { retry_after_secs: 60 }
        ));
    }

    #[test]
    fn auth_statuses_and_markers_expire_session() {
        assert!(matches!(
            status_error(Op::Read, 403, None, ""),
            ChannelError::SessionExpired(_)
        ));
        let body = r#"{"message":"login_required","status":"fail"}"#;
        assert!(matches!(
            status_error(Op::Read, 400, None, body),
            ChannelError::SessionExpired(_)
        ));
    }

    #[test]
    fn other_failures_depend_on_operation() {
        assert!(matches!(
            status_error(Op::Read, 500, None, "oops"),
            ChannelError::ConnectionFailed(_)
        ));
        assert!(matches!(
            status_error(Op::Send, 500, None, "oops"),
            ChannelError::SendFailed(_)
        ));
    }
}
