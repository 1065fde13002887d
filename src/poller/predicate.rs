//! # Success Predicates
//!
//! Classify a probe response as ready or not yet ready. Transport failures
//! never reach a predicate; they are always "not yet ready".

use std::fmt;
use std::sync::Arc;

/// What a probe observed from the route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, only read when the predicate asks for it
    pub body: Option<String>,
}

impl ProbeResponse {
    pub fn new(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn with_body(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }
}

type CustomPredicate = Arc<dyn Fn(&ProbeResponse) -> bool + Send + Sync>;

/// Readiness rule applied to each probe response
#[derive(Clone, Default)]
pub enum SuccessPredicate {
    /// Any 2xx or 3xx status
    ///
    /// Only reachability is checked, so infrastructure readiness does not
    /// depend on the application answering correctly.
    #[default]
    SuccessOrRedirect,
    /// Status must be one of the listed codes
    StatusIn(Vec<u16>),
    /// Body must contain `needle`, and the status must match when given
    BodyContains { status: Option<u16>, needle: String },
    /// Caller supplied rule
    Custom(CustomPredicate),
}

impl fmt::Debug for SuccessPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl SuccessPredicate {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&ProbeResponse) -> bool + Send + Sync + 'static,
    {
        SuccessPredicate::Custom(Arc::new(predicate))
    }

    /// Whether probes must read the response body for this predicate
    pub fn needs_body(&self) -> bool {
        matches!(
            self,
            SuccessPredicate::BodyContains { .. } | SuccessPredicate::Custom(_)
        )
    }

    pub fn accepts(&self, response: &ProbeResponse) -> bool {
        match self {
            SuccessPredicate::SuccessOrRedirect => (200..400).contains(&response.status),
            SuccessPredicate::StatusIn(codes) => codes.contains(&response.status),
            SuccessPredicate::BodyContains { status, needle } => {
                status.is_none_or(|s| s == response.status)
                    && response
                        .body
                        .as_deref()
                        .is_some_and(|body| body.contains(needle.as_str()))
            }
            SuccessPredicate::Custom(predicate) => predicate(response),
        }
    }

    /// Human-readable form used in failure messages
    pub fn describe(&self) -> String {
        match self {
            SuccessPredicate::SuccessOrRedirect => "status 2xx/3xx".to_string(),
            SuccessPredicate::StatusIn(codes) => {
                let codes: Vec<String> = codes.iter().map(u16::to_string).collect();
                format!("status in [{}]", codes.join(", "))
            }
            SuccessPredicate::BodyContains {
                status: Some(status),
                needle,
            } => format!("status {status} with body containing {needle:?}"),
            SuccessPredicate::BodyContains { status: None, needle } => {
                format!("body containing {needle:?}")
            }
            SuccessPredicate::Custom(_) => "custom predicate".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accepts_success_and_redirect_only() {
        let predicate = SuccessPredicate::default();
        assert!(predicate.accepts(&ProbeResponse::new(200)));
        assert!(predicate.accepts(&ProbeResponse::new(204)));
        assert!(predicate.accepts(&ProbeResponse::new(302)));
        assert!(!predicate.accepts(&ProbeResponse::new(199)));
        assert!(!predicate.accepts(&ProbeResponse::new(404)));
        assert!(!predicate.accepts(&ProbeResponse::new(503)));
        assert!(!predicate.needs_body());
    }

    #[test]
    fn test_status_in() {
        let predicate = SuccessPredicate::StatusIn(vec![200, 401]);
        assert!(predicate.accepts(&ProbeResponse::new(401)));
        assert!(!predicate.accepts(&ProbeResponse::new(302)));
        assert_eq!(predicate.describe(), "status in [200, 401]");
    }

    #[test]
    fn test_body_contains_requires_body() {
        let predicate = SuccessPredicate::BodyContains {
            status: Some(200),
            needle: "Greetings from Spring Boot!".to_string(),
        };
        assert!(predicate.needs_body());
        assert!(predicate.accepts(&ProbeResponse::with_body(
            200,
            "Greetings from Spring Boot!"
        )));
        assert!(!predicate.accepts(&ProbeResponse::new(200)));
        assert!(!predicate.accepts(&ProbeResponse::with_body(
            500,
            "Greetings from Spring Boot!"
        )));
    }

    #[test]
    fn test_custom_predicate() {
        let predicate = SuccessPredicate::custom(|r| r.status == 418);
        assert!(predicate.accepts(&ProbeResponse::new(418)));
        assert!(!predicate.accepts(&ProbeResponse::new(200)));
        assert_eq!(format!("{predicate:?}"), "custom predicate");
    }
}
