//! Per-route, per-client rate limiting.
//!
//! Every request is charged to a bucket keyed by the route's limit key and the
//! client's network address. Buckets are GCRA limiters from `governor` with a
//! per-minute quota, so a client can spend the full quota at once and then
//! regains one request every `60s / quota`. Runs before authentication.

use crate::domain::config::RateLimitConfig;
use crate::domain::error::GatewayError;
use crate::domain::operations::{find_route, RouteInfo};
use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath},
    http::Request,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Limit key for requests that match no listed route.
pub const UNLISTED_KEY: &str = "*";

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

struct Bucket {
    limiter: Limiter,
    last_access: Instant,
}

impl Bucket {
    fn new(per_minute: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            last_access: Instant::now(),
        }
    }

    fn check(&mut self, clock: &DefaultClock) -> Result<(), Duration> {
        self.last_access = Instant::now();
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(clock.now()))
    }
}

/// Shared limiter state.
pub struct RateLimitState {
    buckets: DashMap<(&'static str, IpAddr), Bucket>,
    config: RateLimitConfig,
    clock: DefaultClock,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
            clock: DefaultClock::default(),
        }
    }

    /// Limit key and per-minute quota for a route, `None` when exempt.
    ///
    /// A configured override wins over the route's built-in quota. Requests
    /// outside the route table share the default quota.
    pub fn quota_for(&self, route: Option<&RouteInfo>) -> Option<(&'static str, u32)> {
        match route {
            Some(route) => {
                let key = route.limit_key();
                let per_minute = self
                    .config
                    .overrides
                    .get(key)
                    .copied()
                    .or(route.per_minute)?;
                Some((key, per_minute))
            }
            None => Some((UNLISTED_KEY, self.config.default_per_minute)),
        }
    }

    /// Charge one request. `Err` carries the wait until the next one is allowed.
    pub fn check(&self, route: Option<&RouteInfo>, ip: IpAddr) -> Result<(), Duration> {
        if !self.config.enabled || self.config.whitelist.contains(&ip) {
            return Ok(());
        }
        let Some((key, per_minute)) = self.quota_for(route) else {
            return Ok(());
        };
        // Zero quotas are rejected at config validation; treat one as exempt here.
        let Some(per_minute) = NonZeroU32::new(per_minute) else {
            return Ok(());
        };

        let mut bucket = self.buckets.entry((key, ip)).or_insert_with(|| {
            debug!(limit_key = key, ip = %ip, per_minute, "Creating rate limit bucket");
            Bucket::new(per_minute)
        });
        bucket.check(&self.clock)
    }

    /// Drop buckets idle for longer than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_access) <= max_age);
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            debug!(removed, "Removed stale rate limit buckets");
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate limit layer
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_state(Arc::new(RateLimitState::new(config)))
    }

    pub fn with_state(state: Arc<RateLimitState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Arc<RateLimitState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req);
            let route = req
                .extensions()
                .get::<MatchedPath>()
                .and_then(|matched| find_route(req.method(), matched.as_str()));

            match state.check(route, ip) {
                Ok(()) => inner.call(req).await,
                Err(retry_after) => {
                    let retry_after_secs = retry_after.as_millis().div_ceil(1000) as u64;
                    warn!(
                        ip = %ip,
                        limit_key = route.map_or(UNLISTED_KEY, |r| r.limit_key()),
                        retry_after_secs,
                        "Rate limit exceeded"
                    );
                    Ok(GatewayError::RateLimited { retry_after_secs }.into_response())
                }
            }
        })
    }
}

/// Client address as seen on the connection.
///
/// Forwarding headers are ignored: a client could set them to pick its own
/// bucket.
pub fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Background task to clean up stale rate limit buckets
pub async fn cleanup_task(state: Arc<RateLimitState>, interval: Duration, max_age: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        state.cleanup(max_age);
    }
}
