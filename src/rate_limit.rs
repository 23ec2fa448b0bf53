use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};

use crate::{config::RateLimitConfig, error::AppError};

type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Per-client-IP request ceiling over a window, held in process memory.
#[derive(Clone)]
pub struct ClientRateLimiter {
    limiter: Arc<KeyedLimiter>,
}

impl ClientRateLimiter {
    /// `max_requests` per `window_secs`; both are clamped to at least 1.
    pub fn new(cfg: &RateLimitConfig) -> Self {
        let max = NonZeroU32::new(cfg.max_requests.max(1)).unwrap_or(NonZeroU32::MIN);
        let window = Duration::from_secs(cfg.window_secs.max(1));
        let period = (window / max.get()).max(Duration::from_nanos(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(max))
            .allow_burst(max);
        Self {
            limiter: Arc::new(RateLimiter::dashmap(quota)),
        }
    }

    /// Drops buckets that have refilled completely; they are indistinguishable
    /// from a client never seen before.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    /// Prunes every `every` on the current runtime until the limiter is dropped.
    /// Does nothing outside a tokio runtime.
    pub fn spawn_pruning(&self, every: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let limiter = Arc::downgrade(&self.limiter);
        handle.spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.tick().await;
            loop {
                tick.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                limiter.retain_recent();
                limiter.shrink_to_fit();
                tracing::debug!(clients = limiter.len(), "rate limit buckets pruned");
            }
        });
    }

    pub fn check(&self, key: &str) -> Result<(), AppError> {
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            AppError::RateLimited {
                retry_after: wait.as_secs().max(1),
            }
        })
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<ClientRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_ip(&request).unwrap_or_else(|| "unknown".to_string());
    if let Err(e) = limiter.check(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return e.into_response();
    }
    next.run(request).await
}

/// Address seen by the single trusted proxy hop: the last `X-Forwarded-For`
/// entry, then `X-Real-IP`, then the socket peer. Earlier forwarded entries
/// are client-supplied and never used.
fn client_ip(request: &Request) -> Option<String> {
    let headers = request.headers();
    if let Some(last) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(last.to_string());
    }
    if let Some(real) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(real.to_string());
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
