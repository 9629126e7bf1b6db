use std::time::Duration;

use bytes::Bytes;
use hyper::Uri;

use crate::aggregator::MalformedBodyPolicy;
use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings of one run. The dispatcher takes ownership, so they cannot change mid-run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target_url: String,
    pub payload: Bytes,
    pub requests_per_second: u32,
    pub duration_secs: u64,
    pub per_request_timeout: Duration,
    /// Ceiling on concurrently running workers, unbounded when `None`.
    pub max_in_flight: Option<usize>,
    pub malformed_body_policy: MalformedBodyPolicy,
}

impl RunConfig {
    #[must_use]
    pub fn new(
        target_url: impl Into<String>,
        payload: impl Into<Bytes>,
        requests_per_second: u32,
        duration_secs: u64,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            payload: payload.into(),
            requests_per_second,
            duration_secs,
            per_request_timeout: DEFAULT_TIMEOUT,
            max_in_flight: None,
            malformed_body_policy: MalformedBodyPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    #[must_use]
    pub fn with_malformed_body_policy(mut self, policy: MalformedBodyPolicy) -> Self {
        self.malformed_body_policy = policy;
        self
    }

    /// Checks every setting and returns the parsed target.
    pub fn validate(&self) -> Result<Uri, ConfigError> {
        if self.requests_per_second == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if self.tick().is_zero() {
            return Err(ConfigError::RateTooHigh(self.requests_per_second));
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.per_request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_in_flight == Some(0) {
            return Err(ConfigError::ZeroMaxInFlight);
        }
        self.total_requests()?;
        self.target_uri()
    }

    /// `requests_per_second * duration_secs`.
    pub fn total_requests(&self) -> Result<u64, ConfigError> {
        u64::from(self.requests_per_second)
            .checked_mul(self.duration_secs)
            .ok_or(ConfigError::TooManyRequests {
                rate: self.requests_per_second,
                duration_secs: self.duration_secs,
            })
    }

    /// Interval between two launches. Zero when the rate is zero.
    #[must_use]
    pub fn tick(&self) -> Duration {
        if self.requests_per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(1) / self.requests_per_second
    }

    fn target_uri(&self) -> Result<Uri, ConfigError> {
        let uri = self
            .target_url
            .parse::<Uri>()
            .map_err(|e| ConfigError::InvalidUrl {
                url: self.target_url.clone(),
                reason: e.to_string(),
            })?;
        if uri.scheme_str() != Some("http") {
            return Err(ConfigError::UnsupportedScheme(self.target_url.clone()));
        }
        if uri.host().is_none() {
            return Err(ConfigError::InvalidUrl {
                url: self.target_url.clone(),
                reason: "missing host".to_owned(),
            });
        }
        Ok(uri)
    }
}

/// Parses a timeout given in (possibly fractional) seconds.
pub fn timeout_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    let timeout =
        Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidTimeout(e.to_string()))?;
    if timeout.is_zero() {
        return Err(ConfigError::ZeroTimeout);
    }
    Ok(timeout)
}

/// `http://{host}:{port}{path}`, adding the leading slash when missing.
#[must_use]
pub fn target_url(host: &str, port: u16, path: &str) -> String {
    if path.starts_with('/') {
        format!("http://{host}:{port}{path}")
    } else {
        format!("http://{host}:{port}/{path}")
    }
}
