use std::time::Duration;

use hyper::StatusCode;

use crate::error::{ApplicationError, TransportError};

const MISSING_ERROR_FIELD: &str = "<no error field in response>";

/// Classified result of one request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success {
        latency: Duration,
    },
    ApplicationFailure {
        latency: Duration,
        reason: ApplicationError,
    },
    /// `latency` is the time spent until the failure was observed.
    TransportFailure {
        latency: Duration,
        reason: TransportError,
    },
}

impl RequestOutcome {
    #[inline]
    #[must_use]
    pub fn latency(&self) -> Duration {
        match self {
            Self::Success { latency }
            | Self::ApplicationFailure { latency, .. }
            | Self::TransportFailure { latency, .. } => *latency,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Maps a fully received response onto an outcome.
///
/// Any 2xx with a JSON body is a success. Error responses are expected to carry
/// a JSON object whose `error` field explains the rejection.
#[must_use]
pub fn classify(status: StatusCode, body: &[u8], latency: Duration) -> RequestOutcome {
    let parsed = serde_json::from_slice::<serde_json::Value>(body);
    if status.is_success() {
        return match parsed {
            Ok(_) => RequestOutcome::Success { latency },
            Err(e) => RequestOutcome::ApplicationFailure {
                latency,
                reason: ApplicationError::MalformedBody(e.to_string()),
            },
        };
    }
    let reason = match parsed {
        Ok(value) => ApplicationError::Rejected {
            status: status.as_u16(),
            message: value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(MISSING_ERROR_FIELD)
                .to_owned(),
        },
        Err(e) => ApplicationError::MalformedErrorBody {
            status: status.as_u16(),
            detail: e.to_string(),
        },
    };
    RequestOutcome::ApplicationFailure { latency, reason }
}
