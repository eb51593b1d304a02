pub const FACEGATE_STATUS_HEADER: &str = "X-Facegate-Status";
pub const FACEGATE_STATUS_HEALTHY: &str = "healthy";
pub const FACEGATE_STATUS_READY: &str = "ready";
pub const FACEGATE_STATUS_NOT_READY: &str = "not_ready";
pub const FACEGATE_STATUS_MATCH: &str = "match";
pub const FACEGATE_STATUS_NO_MATCH: &str = "no_match";
pub const FACEGATE_STATUS_EVICTED: &str = "evicted";

/// How the reference embedding for a verification was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Served from the cache with a matching fingerprint.
    Hit,
    /// Nothing cached; computed and stored.
    Miss,
    /// Cached entry was built from an older image; recomputed and replaced.
    Stale,
    /// Computed fresh but could not be persisted.
    Degraded,
}

impl CacheStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Stale => "stale",
            CacheStatus::Degraded => "degraded",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for CacheStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
