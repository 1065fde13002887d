//! # Poll Policy

use super::predicate::SuccessPredicate;
use crate::constants::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_PROBE_TIMEOUT_MS,
    PROBE_TIMEOUT_INTERVAL_RATIO,
};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("poll timeout must be greater than zero")]
    ZeroTimeout,
}

/// HTTP method used by probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMethod {
    #[default]
    Get,
    Head,
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMethod::Get => f.write_str("GET"),
            ProbeMethod::Head => f.write_str("HEAD"),
        }
    }
}

impl FromStr for ProbeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(ProbeMethod::Get),
            "HEAD" => Ok(ProbeMethod::Head),
            other => Err(format!("unsupported probe method '{other}'")),
        }
    }
}

/// How long and how often to probe a route
#[derive(Debug, Clone)]
pub struct PollPolicy {
    interval: Duration,
    timeout: Duration,
    request_timeout: Duration,
    predicate: SuccessPredicate,
    method: ProbeMethod,
    path: Option<String>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            request_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            predicate: SuccessPredicate::default(),
            method: ProbeMethod::default(),
            path: None,
        }
    }
}

impl PollPolicy {
    /// Policy with the given cadence and deadline and default everything else
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when either duration is zero.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, PolicyError> {
        if interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }
        if timeout.is_zero() {
            return Err(PolicyError::ZeroTimeout);
        }
        Ok(Self {
            interval,
            timeout,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: SuccessPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: ProbeMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Effective per-probe timeout, always strictly shorter than the interval
    pub fn request_timeout(&self) -> Duration {
        if !self.request_timeout.is_zero() && self.request_timeout < self.interval {
            self.request_timeout
        } else {
            self.interval.mul_f64(PROBE_TIMEOUT_INTERVAL_RATIO)
        }
    }

    pub fn predicate(&self) -> &SuccessPredicate {
        &self.predicate
    }

    pub fn method(&self) -> ProbeMethod {
        self.method
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_durations_rejected() {
        assert_eq!(
            PollPolicy::new(Duration::ZERO, Duration::from_secs(1)).unwrap_err(),
            PolicyError::ZeroInterval
        );
        assert_eq!(
            PollPolicy::new(Duration::from_secs(1), Duration::ZERO).unwrap_err(),
            PolicyError::ZeroTimeout
        );
    }

    #[test]
    fn test_request_timeout_kept_when_shorter_than_interval() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(30))
            .unwrap()
            .with_request_timeout(Duration::from_millis(500));
        assert_eq!(policy.request_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_request_timeout_clamped_below_interval() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(30))
            .unwrap()
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(policy.request_timeout(), Duration::from_millis(1800));
        assert!(policy.request_timeout() < policy.interval());

        let equal = policy.clone().with_request_timeout(Duration::from_secs(2));
        assert!(equal.request_timeout() < equal.interval());
    }

    #[test]
    fn test_probe_method_parsing() {
        assert_eq!("get".parse::<ProbeMethod>().unwrap(), ProbeMethod::Get);
        assert_eq!("HEAD".parse::<ProbeMethod>().unwrap(), ProbeMethod::Head);
        assert!("POST".parse::<ProbeMethod>().is_err());
        assert_eq!(ProbeMethod::Head.to_string(), "HEAD");
    }
}
