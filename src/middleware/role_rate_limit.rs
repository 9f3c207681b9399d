use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::utils::jwt::Claims;

/// Keys requests by the authenticated subject, so riders sharing one NAT'd
/// address don't share a budget. Must sit inside `auth_middleware`.
#[derive(Debug, Clone, Copy)]
pub struct SubjectKeyExtractor;

impl KeyExtractor for SubjectKeyExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<Claims>()
            .map(|claims| claims.sub)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type UserGovernorLayer = GovernorLayer<
    SubjectKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Per-user budgets for authenticated routes. Admin routes are only covered by
/// the global per-IP limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTier {
    /// Browsing own bookings, reserving, cancelling, profile
    Passenger,
    /// Image uploads
    Upload,
}

impl RateLimitTier {
    /// Milliseconds per replenished token and bucket size.
    pub fn quota(self) -> (u64, u32) {
        match self {
            RateLimitTier::Passenger => (600, 100), // 100 per minute
            RateLimitTier::Upload => (3000, 20),    // 20 per minute
        }
    }
}

pub fn create_user_governor(tier: RateLimitTier) -> UserGovernorLayer {
    let (per_ms, burst) = tier.quota();

    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(SubjectKeyExtractor)
            .finish()
            .expect("user governor config is valid"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}
