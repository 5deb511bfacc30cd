use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::gateway_trait::AccessToken;
use crate::core::Result;

/// Tokens are dropped this long before their computed expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    valid_until: Instant,
}

/// Single-slot access-token cache
///
/// A token is served only while `now < acquired + min(expires_in, cap) - 60s`.
/// Concurrent callers on a cold cache are serialized behind the lock so only
/// one of them hits the OAuth endpoint.
#[derive(Debug)]
pub struct TokenCache {
    ttl_cap: Duration,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(ttl_cap: Duration) -> Self {
        Self {
            ttl_cap,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached token or acquire a fresh one with `acquire`
    pub async fn get_or_acquire<F, Fut>(&self, acquire: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.valid_until {
                return Ok(cached.value.clone());
            }
        }

        let acquired_at = Instant::now();
        let token = acquire().await?;

        let lifetime = token.expires_in.min(self.ttl_cap);
        match lifetime.checked_sub(EXPIRY_MARGIN) {
            Some(usable) if !usable.is_zero() => {
                *slot = Some(CachedToken {
                    value: token.value.clone(),
                    valid_until: acquired_at + usable,
                });
            }
            // Too short-lived to cache safely
            _ => *slot = None,
        }

        Ok(token.value)
    }

    /// Forget the cached token, e.g. after the gateway rejected it
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
