//! Per-client-IP rate limiting, grounded on the original's point-cost
//! `RouteMeta.points` model in `src/server/routes.py`: every endpoint here
//! is charged a flat 1 point against a per-minute quota rather than a
//! per-endpoint weighted cost, since the query API this crate exposes is
//! a small, uniformly-cheap subset of the original's full surface.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use poem::{Endpoint, IntoResponse, Middleware, Request, Response, Result};

type Limiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<Limiter>,
}

impl RateLimit {
    pub fn per_minute(limit: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(limit.max(1)).expect("limit > 0"));
        RateLimit {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }
}

impl<E: Endpoint> Middleware<E> for RateLimit {
    type Output = RateLimitEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        RateLimitEndpoint { ep, limiter: self.limiter.clone() }
    }
}

pub struct RateLimitEndpoint<E> {
    ep: E,
    limiter: Arc<Limiter>,
}

impl<E: Endpoint> Endpoint for RateLimitEndpoint<E> {
    type Output = Response;

    async fn call(&self, req: Request) -> Result<Self::Output> {
        let ip = req
            .remote_addr()
            .as_socket_addr()
            .map(|a| a.ip())
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));

        if self.limiter.check_key(&ip).is_err() {
            return Ok(poem::http::StatusCode::TOO_MANY_REQUESTS.into_response());
        }

        match self.ep.call(req).await {
            Ok(resp) => Ok(resp.into_response()),
            Err(e) => Err(e),
        }
    }
}
