pub mod guards;
pub mod identity;

pub use guards::{enforce_guards, GuardOutcome, GuardPipeline, RequireIdentity, RequireJsonBody, RouteGuard};
pub use identity::{AuthenticatedUser, TokenVerifier};
