//! Request guards run before authenticated handlers.
//!
//! A pipeline is an ordered list of guards. Each guard either lets the
//! request through or rejects it with an error; the first rejection wins and
//! the handler never runs.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, request::Parts, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::identity::{bearer_token, AuthenticatedUser, TokenVerifier};
use crate::utils::error::AppError;

#[derive(Debug)]
pub enum GuardOutcome {
    Pass,
    Reject(AppError),
}

pub trait RouteGuard: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, parts: &mut Parts) -> GuardOutcome;
}

/// Bodies of mutating requests must be JSON.
pub struct RequireJsonBody;

impl RouteGuard for RequireJsonBody {
    fn name(&self) -> &'static str {
        "require_json_body"
    }

    fn check(&self, parts: &mut Parts) -> GuardOutcome {
        if !matches!(parts.method, Method::POST | Method::PUT | Method::PATCH) {
            return GuardOutcome::Pass;
        }

        let is_json = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false);

        if is_json {
            GuardOutcome::Pass
        } else {
            GuardOutcome::Reject(AppError::bad_request(
                "Request body must be application/json",
            ))
        }
    }
}

/// Verifies the bearer token and records who the request acts for.
pub struct RequireIdentity {
    verifier: TokenVerifier,
}

impl RequireIdentity {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

impl RouteGuard for RequireIdentity {
    fn name(&self) -> &'static str {
        "require_identity"
    }

    fn check(&self, parts: &mut Parts) -> GuardOutcome {
        let user_id = match bearer_token(parts).and_then(|token| self.verifier.verify(token)) {
            Ok(user_id) => user_id,
            Err(err) => return GuardOutcome::Reject(err),
        };
        parts.extensions.insert(AuthenticatedUser { user_id });
        GuardOutcome::Pass
    }
}

#[derive(Clone, Default)]
pub struct GuardPipeline {
    guards: Vec<Arc<dyn RouteGuard>>,
}

impl GuardPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, guard: impl RouteGuard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn evaluate(&self, parts: &mut Parts) -> GuardOutcome {
        for guard in &self.guards {
            if let GuardOutcome::Reject(err) = guard.check(parts) {
                tracing::debug!(guard = guard.name(), path = %parts.uri.path(), "Request rejected by guard");
                return GuardOutcome::Reject(err);
            }
        }
        GuardOutcome::Pass
    }
}

/// Middleware running `pipeline` ahead of the wrapped routes.
pub async fn enforce_guards(
    State(pipeline): State<GuardPipeline>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    if let GuardOutcome::Reject(err) = pipeline.evaluate(&mut parts) {
        return err.into_response();
    }
    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, Request as HttpRequest};
    use uuid::Uuid;

    fn parts(method: Method, headers: &[(&str, &str)]) -> Parts {
        let mut builder = HttpRequest::builder().method(method).uri("/orders/free");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_json_guard_accepts_json_with_charset() {
        let mut parts = parts(Method::POST, &[("content-type", "application/json; charset=utf-8")]);
        assert!(matches!(RequireJsonBody.check(&mut parts), GuardOutcome::Pass));
    }

    #[test]
    fn test_json_guard_rejects_form_posts() {
        let mut parts = parts(
            Method::POST,
            &[("content-type", "application/x-www-form-urlencoded")],
        );
        assert!(matches!(
            RequireJsonBody.check(&mut parts),
            GuardOutcome::Reject(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_json_guard_ignores_reads() {
        let mut parts = parts(Method::GET, &[]);
        assert!(matches!(RequireJsonBody.check(&mut parts), GuardOutcome::Pass));
    }

    #[test]
    fn test_identity_guard_stores_user() {
        let verifier = TokenVerifier::new("secret");
        let user_id = Uuid::new_v4();
        let header = format!("Bearer {}", verifier.issue(user_id).unwrap());
        let mut parts = parts(Method::GET, &[(AUTHORIZATION.as_str(), header.as_str())]);

        let outcome = RequireIdentity::new(verifier).check(&mut parts);

        assert!(matches!(outcome, GuardOutcome::Pass));
        assert_eq!(
            parts.extensions.get::<AuthenticatedUser>(),
            Some(&AuthenticatedUser { user_id })
        );
    }

    #[test]
    fn test_pipeline_stops_at_first_rejection() {
        let pipeline = GuardPipeline::new()
            .with(RequireIdentity::new(TokenVerifier::new("secret")))
            .with(RequireJsonBody);
        let mut parts = parts(Method::POST, &[("content-type", "text/plain")]);

        match pipeline.evaluate(&mut parts) {
            GuardOutcome::Reject(err) => assert!(matches!(err, AppError::Unauthorized(_))),
            GuardOutcome::Pass => panic!("expected rejection"),
        }
    }
}
