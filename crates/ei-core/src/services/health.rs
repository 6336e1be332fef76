use std::time::Duration;

use crate::error::{InstallerError, Result};

/// One readiness check against the application's health endpoint.
#[allow(async_fn_in_trait)]
pub trait HealthProbe {
    async fn check(&self, url: &str) -> bool;
}

/// HTTP GET probe. Any response below 400 counts as healthy, redirects
/// included; connection errors and timeouts do not.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| InstallerError::Process(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl HealthProbe for HttpProbe {
    async fn check(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(url, status = status.as_u16(), "health_probe_response");
                !status.is_client_error() && !status.is_server_error()
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "health_probe_error");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe() -> HttpProbe {
        HttpProbe::new(Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn ok_response_is_healthy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/up")
            .with_status(200)
            .create_async()
            .await;

        assert!(probe().check(&format!("{}/up", server.url())).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn redirect_is_healthy_without_being_followed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/up")
            .with_status(301)
            .with_header("location", "https://127.0.0.1:1/up")
            .create_async()
            .await;

        assert!(probe().check(&format!("{}/up", server.url())).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_unhealthy() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/up")
            .with_status(503)
            .create_async()
            .await;

        assert!(!probe().check(&format!("{}/up", server.url())).await);
    }

    #[tokio::test]
    async fn unmatched_route_is_unhealthy() {
        let server = mockito::Server::new_async().await;
        assert!(!probe().check(&format!("{}/up", server.url())).await);
    }

    #[tokio::test]
    async fn refused_connection_is_unhealthy() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(!probe().check(&format!("http://127.0.0.1:{port}/up")).await);
    }
}
