use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Buckets are swept for expired entries once every this many requests.
const SWEEP_INTERVAL: u64 = 1024;

/// Sliding-window limiter keyed by principal and matched route.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    trust_forwarded_for: bool,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
    requests: Arc<AtomicU64>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            trust_forwarded_for: false,
            buckets: Arc::new(DashMap::new()),
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Key anonymous callers on `X-Forwarded-For` instead of the peer address.
    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    /// Record a request; returns whether it is allowed and how many slots remain.
    ///
    /// `route` should be the route template, not the raw path, so that the
    /// number of buckets stays bounded by principals times routes.
    pub fn allow(&self, key: &str, route: &str) -> (bool, u32) {
        let now = Instant::now();
        if self.requests.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep(now);
        }

        let bucket_key = format!("{key}:{route}");
        let window = self.window;

        let mut entry = self.buckets.entry(bucket_key).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        let used = u32::try_from(entry.len()).unwrap_or(u32::MAX);
        let remaining = self.max_requests.saturating_sub(used);
        if remaining == 0 {
            return (false, 0);
        }

        entry.push(now);
        (true, remaining - 1)
    }

    /// Drop buckets whose every request has left the window.
    pub fn sweep(&self, now: Instant) {
        let window = self.window;
        self.buckets.retain(|_, instants| {
            instants.retain(|instant| now.duration_since(*instant) < window);
            !instants.is_empty()
        });
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_per_key_and_route() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);
        assert_eq!(limiter.allow("staff:a", "/api/v1/blogs"), (true, 1));
        assert_eq!(limiter.allow("staff:a", "/api/v1/blogs"), (true, 0));
        assert_eq!(limiter.allow("staff:a", "/api/v1/blogs"), (false, 0));
        assert!(limiter.allow("staff:a", "/api/v1/grants").0);
        assert!(limiter.allow("anon:10.0.0.1", "/api/v1/blogs").0);
    }

    #[test]
    fn window_expiry_frees_slots() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(20), 1);
        assert!(limiter.allow("k", "/r").0);
        assert!(!limiter.allow("k", "/r").0);
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow("k", "/r").0);
    }

    #[test]
    fn expired_buckets_are_swept() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(10), 5);
        for n in 0..50 {
            limiter.allow(&format!("anon:{n}"), "/api/v1/blogs");
        }
        assert_eq!(limiter.bucket_count(), 50);

        std::thread::sleep(Duration::from_millis(20));
        limiter.sweep(Instant::now());
        assert_eq!(limiter.bucket_count(), 0);
    }

    #[test]
    fn periodic_sweep_bounds_idle_buckets() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(1), 5);
        let total = SWEEP_INTERVAL * 3;
        for n in 0..total {
            if n % 64 == 0 {
                std::thread::sleep(Duration::from_millis(2));
            }
            limiter.allow(&format!("anon:{n}"), "/api/v1/blogs");
        }
        let bound = usize::try_from(SWEEP_INTERVAL).expect("small interval");
        assert!(limiter.bucket_count() < bound);
    }

    #[test]
    fn retry_after_is_at_least_one_second() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(200), 1);
        assert_eq!(limiter.retry_after_secs(), 1);
        assert_eq!(limiter.limit(), 1);
        assert!(!limiter.trusts_forwarded_for());
        assert!(limiter.trusting_forwarded_for(true).trusts_forwarded_for());
    }
}
