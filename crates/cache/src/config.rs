use std::time::Duration;

use crate::DegradationReason;

#[derive(Debug, Clone, bon::Builder)]
pub struct CacheConfig {
    /// Max number of entries before least recently used ones are evicted
    #[builder(default = 10_000)]
    pub capacity: usize,
    #[builder(default = Duration::from_secs(30))]
    pub default_ttl: Duration,
    #[builder(default = Duration::from_secs(5 * 60))]
    pub default_max_stale_age: Duration,
    /// Trailing window of [`crate::DegradationManager::degradation_status`]
    #[builder(default = Duration::from_secs(5 * 60))]
    pub status_window: Duration,
    /// Max number of degraded operation records kept
    #[builder(default = 100)]
    pub history_len: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Ttl presets by how quickly the underlying data changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Balances, resource credits
    Realtime,
    /// Accounts, posts
    Standard,
    /// Community metadata, chain config
    Static,
}

impl CacheTier {
    pub fn ttl(self) -> Duration {
        match self {
            CacheTier::Realtime => Duration::from_secs(5),
            CacheTier::Standard => Duration::from_secs(30),
            CacheTier::Static => Duration::from_secs(5 * 60),
        }
    }

    pub fn max_stale_age(self) -> Duration {
        match self {
            CacheTier::Realtime => Duration::from_secs(60),
            CacheTier::Standard => Duration::from_secs(5 * 60),
            CacheTier::Static => Duration::from_secs(60 * 60),
        }
    }
}

/// Which failure reasons may be answered with stale data
///
/// Allows everything by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StalePolicy {
    denied: u8,
}

impl StalePolicy {
    pub const SERVE_STALE: Self = Self { denied: 0 };
    pub const NEVER_STALE: Self = Self { denied: u8::MAX };

    pub fn deny(self, reason: DegradationReason) -> Self {
        Self {
            denied: self.denied | reason.bit(),
        }
    }

    pub fn allow(self, reason: DegradationReason) -> Self {
        Self {
            denied: self.denied & !reason.bit(),
        }
    }

    pub fn allows(self, reason: DegradationReason) -> bool {
        self.denied & reason.bit() == 0
    }
}

/// Per-call caching options
///
/// Unset durations fall back to [`CacheConfig`] defaults.
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct FetchOptions {
    pub ttl: Option<Duration>,
    pub max_stale_age: Option<Duration>,
    #[builder(default)]
    pub tags: Vec<String>,
    #[builder(default)]
    pub stale_policy: StalePolicy,
}

impl From<CacheTier> for FetchOptions {
    fn from(tier: CacheTier) -> Self {
        FetchOptions::builder()
            .ttl(tier.ttl())
            .max_stale_age(tier.max_stale_age())
            .build()
    }
}

impl FetchOptions {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_stale_policy(mut self, stale_policy: StalePolicy) -> Self {
        self.stale_policy = stale_policy;
        self
    }
}

#[test]
fn stale_policy_deny_and_allow() {
    let policy = StalePolicy::default().deny(DegradationReason::CircuitOpen);

    assert!(!policy.allows(DegradationReason::CircuitOpen));
    assert!(policy.allows(DegradationReason::Timeout));
    assert!(policy.allow(DegradationReason::CircuitOpen).allows(DegradationReason::CircuitOpen));
    for reason in DegradationReason::ALL {
        assert!(!StalePolicy::NEVER_STALE.allows(reason));
        assert!(StalePolicy::SERVE_STALE.allows(reason));
    }
}

#[test]
fn tiers_get_longer_ttls_for_slower_data() {
    let opts = FetchOptions::from(CacheTier::Static).with_tag("community:hive-1");
    assert_eq!(opts.ttl, Some(Duration::from_secs(300)));
    assert_eq!(opts.tags, vec!["community:hive-1".to_string()]);
    assert!(CacheTier::Realtime.ttl() < CacheTier::Standard.ttl());
}
