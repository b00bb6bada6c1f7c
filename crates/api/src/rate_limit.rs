//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-client-IP limiting with tower_governor. The Generic Cell Rate
//! Algorithm needs no background task to refill quotas.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config keyed by peer IP, reporting quota headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Seconds between quota replenishments
    pub per_second: u64,
    /// Requests a client may make back to back
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 20,
        }
    }
}

/// Build the governor config, or `None` when limiting is disabled or the
/// quota is degenerate.
///
/// Peer IPs come from `ConnectInfo`, so the router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`. Responses carry
/// `X-RateLimit-*` headers.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    if !config.enabled {
        return None;
    }
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.per_second, 1);
        assert_eq!(config.burst_size, 20);
    }

    #[test]
    fn test_create_governor_config() {
        let governor = create_governor_config(&RateLimitConfig::default());
        assert!(governor.is_some());
    }

    #[test]
    fn test_disabled_or_zero_quota() {
        let disabled = RateLimitConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(create_governor_config(&disabled).is_none());

        let zero_burst = RateLimitConfig {
            burst_size: 0,
            ..Default::default()
        };
        assert!(create_governor_config(&zero_burst).is_none());
    }
}
