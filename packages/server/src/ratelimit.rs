use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use common::contracts::RecipientRateLimiter;
use common::NotifyError;

/// Per-recipient sliding-window rate limiter on Redis sorted sets.
///
/// Each admission is a member scored by its timestamp; entries older than
/// the window are trimmed lazily on every check. The bucket TTL outlives
/// the window slightly so idle recipients clean themselves up.
pub struct RedisRecipientLimiter {
    conn: redis::aio::ConnectionManager,
    max_per_window: u32,
    window: Duration,
}

impl RedisRecipientLimiter {
    pub async fn connect(url: &str, max_per_window: u32) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;

        Ok(Self {
            conn,
            max_per_window,
            window: Duration::from_secs(3600),
        })
    }

    fn bucket_key(recipient: &str) -> String {
        format!("notifly:ratelimit:{recipient}")
    }
}

#[async_trait]
impl RecipientRateLimiter for RedisRecipientLimiter {
    async fn allow(&self, recipient: &str) -> Result<bool, NotifyError> {
        let key = Self::bucket_key(recipient);
        let mut conn = self.conn.clone();

        let now_ns = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let window_start = now_ns - self.window.as_nanos() as i64;

        // Trim expired entries and count the remainder atomically, so two
        // concurrent admissions of the same recipient observe a consistent
        // window.
        let (_removed, count): (i64, i64) = redis::pipe()
            .atomic()
            .zrembyscore(&key, "-inf", window_start)
            .zcard(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| NotifyError::RateLimit(format!("checking recipient rate limit: {e}")))?;

        // At or over the limit: deny without recording the attempt.
        if count >= self.max_per_window as i64 {
            return Ok(false);
        }

        // The nonce keeps concurrent same-instant admissions from
        // colliding on the member value.
        let member = format!("{now_ns}:{:08x}", rand::rng().random::<u32>());
        let ttl_secs = self.window.as_secs() as i64 + 60;

        let (_added, _expired): (i64, i64) = redis::pipe()
            .atomic()
            .zadd(&key, member, now_ns)
            .expire(&key, ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| NotifyError::RateLimit(format!("recording rate limit entry: {e}")))?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_key_format() {
        assert_eq!(
            RedisRecipientLimiter::bucket_key("a@b.com"),
            "notifly:ratelimit:a@b.com"
        );
    }
}
