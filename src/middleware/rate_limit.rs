use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Routes that call the language model are counted apart from the interview
/// flow, so a burst of uploads cannot starve answer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Interview,
    Model,
}

impl Bucket {
    pub fn for_path(path: &str) -> Self {
        match path {
            "/api/generate-questions" | "/api/evaluate-answers" | "/api/resume/parse" => Bucket::Model,
            _ => Bucket::Interview,
        }
    }
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    used: u32,
}

/// One-second windows per [`Bucket`], each allowing `rps` requests.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    windows: Arc<Mutex<HashMap<Bucket, Window>>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Takes a slot in the bucket's current window. When the window is full,
    /// returns how long until it reopens.
    pub fn acquire(&self, bucket: Bucket) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = windows.entry(bucket).or_insert(Window { opened: now, used: 0 });
        if now.duration_since(window.opened) >= WINDOW {
            *window = Window { opened: now, used: 0 };
        }
        if window.used >= self.rps {
            return Err(WINDOW.saturating_sub(now.duration_since(window.opened)));
        }
        window.used += 1;
        Ok(())
    }
}

pub async fn limit_requests(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let bucket = Bucket::for_path(req.uri().path());
    if let Err(reopens_in) = limiter.acquire(bucket) {
        tracing::warn!(path = %req.uri().path(), ?bucket, "Rate limit exceeded");
        let retry_after = reopens_in.as_secs_f64().ceil().max(1.0) as u64;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(json!({ "error": "rate_limit_exceeded" })),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn window_reopens_after_a_second() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.acquire(Bucket::Interview).is_ok());
        assert!(limiter.acquire(Bucket::Interview).is_ok());

        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(
            limiter.acquire(Bucket::Interview),
            Err(Duration::from_millis(600))
        );

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(limiter.acquire(Bucket::Interview).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn buckets_are_counted_separately() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.acquire(Bucket::Model).is_ok());
        assert!(limiter.acquire(Bucket::Model).is_err());
        assert!(limiter.acquire(Bucket::Interview).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_is_treated_as_one() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.acquire(Bucket::Interview).is_ok());
        assert!(limiter.acquire(Bucket::Interview).is_err());
    }

    #[test]
    fn model_routes_share_a_bucket() {
        assert_eq!(Bucket::for_path("/api/resume/parse"), Bucket::Model);
        assert_eq!(Bucket::for_path("/api/evaluate-answers"), Bucket::Model);
        assert_eq!(Bucket::for_path("/api/interview/answer"), Bucket::Interview);
    }
}
