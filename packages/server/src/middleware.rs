use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-IP token-bucket rate limiter.
///
/// The bucket map is read-biased: the common case (bucket exists) takes the
/// read lock only; creation takes the write lock and re-checks under it.
pub struct IpRateLimiter {
    buckets: RwLock<HashMap<IpAddr, Arc<Mutex<TokenBucket>>>>,
    rate: f64,
    burst: f64,
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(burst: f64) -> Self {
        Self {
            tokens: burst,
            last_refill: Instant::now(),
        }
    }

    fn try_take(&mut self, rate: f64, burst: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(burst);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl IpRateLimiter {
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            rate: requests_per_second,
            burst: burst as f64,
        }
    }

    pub fn allow(&self, ip: IpAddr) -> bool {
        if self.rate <= 0.0 {
            return true;
        }

        let bucket = {
            let buckets = self.buckets.read().unwrap();
            buckets.get(&ip).cloned()
        };

        let bucket = match bucket {
            Some(bucket) => bucket,
            None => {
                let mut buckets = self.buckets.write().unwrap();
                // Double-check after acquiring the write lock
                buckets
                    .entry(ip)
                    .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::new(self.burst))))
                    .clone()
            }
        };

        let mut bucket = bucket.lock().unwrap();
        bucket.try_take(self.rate, self.burst)
    }
}

/// Reject requests from IPs that exceed the configured rate.
pub async fn ip_rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if !state.ip_limiter.allow(addr.ip()) {
        return AppError::RateLimited.into_response();
    }
    next.run(req).await
}

/// Propagate or assign a request id, and echo it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&id) {
        req.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value.clone());

        let mut response = next.run(req).await;
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        response
    } else {
        next.run(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[test]
    fn test_burst_is_honored_then_exhausted() {
        // 1 req/s with burst 3: three immediate requests pass, the fourth
        // is rejected.
        let limiter = IpRateLimiter::new(1.0, 3);
        assert!(limiter.allow(ip(1)));
        assert!(limiter.allow(ip(1)));
        assert!(limiter.allow(ip(1)));
        assert!(!limiter.allow(ip(1)));
    }

    #[test]
    fn test_ips_are_limited_independently() {
        let limiter = IpRateLimiter::new(1.0, 1);
        assert!(limiter.allow(ip(1)));
        assert!(!limiter.allow(ip(1)));
        assert!(limiter.allow(ip(2)));
    }

    #[test]
    fn test_zero_rate_disables_limiting() {
        let limiter = IpRateLimiter::new(0.0, 0);
        for _ in 0..100 {
            assert!(limiter.allow(ip(1)));
        }
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let limiter = IpRateLimiter::new(1000.0, 1);
        assert!(limiter.allow(ip(1)));
        assert!(!limiter.allow(ip(1)));

        // At 1000 tokens/s a few milliseconds are enough to refill.
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(limiter.allow(ip(1)));
    }
}
