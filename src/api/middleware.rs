//! Optional protection for when the API is reachable beyond localhost.
//!
//! Configured from the environment:
//! - `LANTERN_API_KEY`: bearer token required on every route except health
//! - `LANTERN_CORS_ORIGINS`: comma-separated allow list (default: any origin)
//! - `LANTERN_RATE_LIMIT`: requests per minute per client (default 120 once
//!   an API key is set)

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

const DEFAULT_RATE_LIMIT: u32 = 120;
const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    pub api_key: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("LANTERN_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let cors_origins = std::env::var("LANTERN_CORS_ORIGINS").ok().map(|s| {
            s.split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        });

        let explicit_limit = std::env::var("LANTERN_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok());

        let rate_limiter = match (explicit_limit, &api_key) {
            (Some(0), _) => None,
            (Some(limit), _) => Some(RateLimiter::new(limit, RATE_WINDOW)),
            (None, Some(_)) => Some(RateLimiter::new(DEFAULT_RATE_LIMIT, RATE_WINDOW)),
            (None, None) => None,
        };

        if api_key.is_some() {
            tracing::info!("API key authentication enabled");
        }

        Self {
            api_key,
            cors_origins,
            rate_limiter,
        }
    }

    /// No authentication, no rate limit, any origin.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn with_rate_limit(max_requests: u32) -> Self {
        Self {
            rate_limiter: Some(RateLimiter::new(max_requests, RATE_WINDOW)),
            ..Self::default()
        }
    }
}

/// Sliding-window request counter per client address.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    requests: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a request from `ip`. Returns false once the window is full.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.lock().expect("rate limiter lock poisoned");
        let seen = requests.entry(ip).or_default();

        seen.retain(|&t| now.duration_since(t) < self.window);

        if seen.len() < self.max_requests as usize {
            seen.push(now);
            true
        } else {
            false
        }
    }

    /// Forget clients with no requests in the current window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.lock().expect("rate limiter lock poisoned");
        requests.retain(|_, seen| {
            seen.retain(|&t| now.duration_since(t) < self.window);
            !seen.is_empty()
        });
    }

    /// Run `cleanup` once per window for as long as the runtime lives.
    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window);
            loop {
                interval.tick().await;
                limiter.cleanup();
            }
        })
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests
            .lock()
            .expect("rate limiter lock poisoned")
            .len()
    }
}

pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = &config.api_key else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected request with wrong API key");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Rejected request without bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = client_ip(&request);

    if limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(%ip, "Rate limit exceeded");
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Forwarding headers first, then the socket peer, then loopback.
fn client_ip(request: &Request<Body>) -> IpAddr {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    header("X-Forwarded-For")
        .or_else(|| header("X-Real-IP"))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn limiter_blocks_once_window_is_full() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check(ip("10.0.0.1")));
        }
        assert!(!limiter.check(ip("10.0.0.1")));
        assert!(limiter.check(ip("10.0.0.2")));
    }

    #[test]
    fn cleanup_forgets_idle_clients() {
        let limiter = RateLimiter::new(5, Duration::from_millis(1));
        limiter.check(ip("10.0.0.1"));
        std::thread::sleep(Duration::from_millis(5));
        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), ip("203.0.113.7"));
    }

    #[test]
    fn client_ip_defaults_to_loopback() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), ip("127.0.0.1"));
    }

    mod auth {
        use super::*;
        use axum::{middleware::from_fn_with_state, routing::get, Router};
        use tower::ServiceExt;

        fn guarded(config: SecurityConfig) -> Router {
            Router::new()
                .route("/", get(|| async { "ok" }))
                .route_layer(from_fn_with_state(config, auth_middleware))
        }

        async fn status_with(config: SecurityConfig, auth: Option<&str>) -> StatusCode {
            let mut request = Request::builder().uri("/");
            if let Some(auth) = auth {
                request = request.header("Authorization", auth);
            }
            guarded(config)
                .oneshot(request.body(Body::empty()).unwrap())
                .await
                .unwrap()
                .status()
        }

        #[tokio::test]
        async fn passes_everything_without_a_key() {
            assert_eq!(status_with(SecurityConfig::disabled(), None).await, StatusCode::OK);
        }

        #[tokio::test]
        async fn checks_the_bearer_token() {
            let config = SecurityConfig::with_api_key("secret");
            assert_eq!(status_with(config.clone(), None).await, StatusCode::UNAUTHORIZED);
            assert_eq!(
                status_with(config.clone(), Some("Bearer nope")).await,
                StatusCode::UNAUTHORIZED
            );
            assert_eq!(status_with(config, Some("Bearer secret")).await, StatusCode::OK);
        }
    }

    #[test]
    fn disabled_config_is_open() {
        let config = SecurityConfig::disabled();
        assert!(config.api_key.is_none());
        assert!(config.rate_limiter.is_none());
    }
}
