use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{RateLimiter, clock::DefaultClock};
use reqwest::{Client as ReqwestClient, Request, Response};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, NotifierResult};
use crate::network::RateLimitWindow;
use crate::network::http::transport_error;
use error_stack::ResultExt;

#[derive(Debug, Clone)]
pub enum Client {
    RateLimited(RateLimitedClient),
    Unrestricted(ReqwestClient),
}

impl Client {
    /// Plain reqwest client with the given request timeout.
    pub fn unrestricted(timeout: Duration) -> NotifierResult<Self> {
        Ok(Client::Unrestricted(build_reqwest_client(timeout)?))
    }

    pub async fn execute(&self, req: Request) -> NotifierResult<Response> {
        match self {
            Client::RateLimited(rate_limited_client) => rate_limited_client.execute(req).await,
            Client::Unrestricted(unrestricted_client) => {
                unrestricted_client.execute(req).await.map_err(transport_error)
            }
        }
    }

    pub fn inner_client(&self) -> &ReqwestClient {
        match self {
            Client::RateLimited(rate_limited_client) => rate_limited_client.inner_client(),
            Client::Unrestricted(unrestricted_client) => unrestricted_client,
        }
    }
}

fn build_reqwest_client(timeout: Duration) -> NotifierResult<ReqwestClient> {
    ReqwestClient::builder()
        .timeout(timeout)
        .user_agent(concat!("slack_notifier/", env!("CARGO_PKG_VERSION")))
        .build()
        .change_context(Error::ConfigError("Failed to build HTTP client".to_string()))
}

#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    inner: ReqwestClient,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimitedClient {
    pub fn new(
        limit: RateLimitWindow,
        burst: Option<NonZeroU32>,
        timeout: Duration,
    ) -> NotifierResult<Self> {
        let quota = limit.quota(burst)?;
        let limiter = Arc::new(RateLimiter::direct(quota));
        let inner = build_reqwest_client(timeout)?;
        Ok(Self { inner, limiter })
    }

    /// Reference to the underlying client, for building requests.
    pub fn inner_client(&self) -> &ReqwestClient {
        &self.inner
    }

    pub async fn execute(&self, req: Request) -> NotifierResult<Response> {
        self.limiter.until_ready().await;
        self.inner.execute(req).await.map_err(transport_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_rate_limited_client_spaces_requests() {
        let client = RateLimitedClient::new(
            RateLimitWindow::PerSecond(NonZeroU32::new(5).unwrap()),
            NonZeroU32::new(1),
            Duration::from_secs(1),
        )
        .unwrap();

        // Bind and drop to get a port nothing listens on; the limiter still gates every attempt.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            let req = client
                .inner_client()
                .get(format!("http://{addr}/"))
                .build()
                .unwrap();
            let result = client.execute(req).await;
            assert!(matches!(
                result.unwrap_err().current_context(),
                Error::TransportError(_)
            ));
        }
        // 5/s with burst 1: the 2nd and 3rd attempts wait ~200ms each.
        assert!(start.elapsed() >= Duration::from_millis(350));
    }

    #[test]
    fn test_zero_period_is_config_error() {
        let result = RateLimitedClient::new(
            RateLimitWindow::Custom {
                period: Duration::ZERO,
            },
            None,
            Duration::from_secs(1),
        );
        assert!(matches!(
            result.unwrap_err().current_context(),
            Error::ConfigError(_)
        ));
    }
}
