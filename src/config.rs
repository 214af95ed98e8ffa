use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, Url, redirect};
use std::time::Duration;

use crate::http::{ReqwestTransport, RequestClient};

/// Redirects followed before the exchange fails.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

pub fn default_user_agent() -> String {
    format!("fetchr/{}", env!("FETCHR_VERSION"))
}

/// Settings for a [`RequestClient`] backed by reqwest.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL that relative request paths resolve against.
    pub base_url: Option<Url>,
    /// Deadline for requests that don't carry their own.
    pub default_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    /// 0 disables following redirects; 3xx responses are then reported as-is.
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            default_timeout: None,
            connect_timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn with_timeout_ms(mut self, millis: Option<u64>) -> Self {
        self.default_timeout = millis.map(Duration::from_millis);
        self
    }

    /// Builds the client.
    ///
    /// The underlying reqwest client keeps no idle connections and no cookie
    /// store, so nothing carries over from one call to the next.
    pub fn build_client(&self) -> Result<RequestClient<ReqwestTransport>> {
        let policy = if self.max_redirects == 0 {
            redirect::Policy::none()
        } else {
            redirect::Policy::limited(self.max_redirects)
        };

        let mut builder = Client::builder()
            .user_agent(&self.user_agent)
            .redirect(policy)
            .pool_max_idle_per_host(0);
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        debug!(
            "Client ready (base_url={:?}, timeout={:?}, max_redirects={})",
            self.base_url.as_ref().map(Url::as_str),
            self.default_timeout,
            self.max_redirects
        );

        let mut transport = ReqwestTransport::new(client);
        if let Some(connect_timeout) = self.connect_timeout {
            transport = transport.with_timeout_limit(connect_timeout);
        }
        let mut request_client = RequestClient::new(transport);
        if let Some(base_url) = &self.base_url {
            request_client = request_client.with_base_url(base_url.clone());
        }
        if let Some(timeout) = self.default_timeout {
            request_client = request_client.with_default_timeout(timeout);
        }
        Ok(request_client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestSpec;
    use crate::response::{Body, ErrorKind};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, None);
        assert_eq!(config.default_timeout, None);
        assert_eq!(config.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert!(config.user_agent.starts_with("fetchr/"));
    }

    #[test]
    fn test_with_base_url_rejects_garbage() {
        assert!(Config::default().with_base_url("not a url").is_err());
        let config = Config::default()
            .with_base_url("https://my-app.vercel.app")
            .unwrap();
        assert_eq!(
            config.base_url.unwrap().as_str(),
            "https://my-app.vercel.app/"
        );
    }

    #[tokio::test]
    async fn test_user_agent_is_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", "fetchr-test")
            .with_status(200)
            .create_async()
            .await;

        let config = Config {
            user_agent: "fetchr-test".to_string(),
            ..Config::default()
        };
        let client = config.build_client().unwrap();
        let result = client.send(RequestSpec::get(server.url()).unwrap()).await;

        mock.assert_async().await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_redirects_are_followed() {
        let mut server = mockito::Server::new_async().await;
        let _old = server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", "/new")
            .create_async()
            .await;
        let _new = server
            .mock("GET", "/new")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("moved here")
            .create_async()
            .await;

        let client = Config::default().build_client().unwrap();
        let success = client
            .send(RequestSpec::get(format!("{}/old", server.url())).unwrap())
            .await
            .into_result()
            .unwrap();

        assert_eq!(success.status_code, 200);
        assert_eq!(success.body, Body::Text("moved here".to_string()));
    }

    #[tokio::test]
    async fn test_redirects_disabled_surface_3xx() {
        let mut server = mockito::Server::new_async().await;
        let _old = server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", "/new")
            .create_async()
            .await;

        let config = Config {
            max_redirects: 0,
            ..Config::default()
        };
        let result = config
            .build_client()
            .unwrap()
            .send(RequestSpec::get(format!("{}/old", server.url())).unwrap())
            .await;

        let failure = result.into_result().unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::HttpStatus);
        assert_eq!(failure.status_code(), Some(301));
    }

    #[tokio::test]
    async fn test_base_url_and_default_timeout_are_applied() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/getData")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items":[1,2]}"#)
            .create_async()
            .await;

        let config = Config::default()
            .with_base_url(&server.url())
            .unwrap()
            .with_timeout_ms(Some(5_000));
        let client = config.build_client().unwrap();
        let result = client.send(RequestSpec::get("/api/getData").unwrap()).await;

        mock.assert_async().await;
        assert_eq!(
            result.into_result().unwrap().body.as_json().unwrap()["items"][1],
            2
        );
    }

    #[tokio::test]
    async fn test_redirect_limit_exceeded_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let _loop = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .create_async()
            .await;

        let config = Config {
            max_redirects: 2,
            ..Config::default()
        };
        let result = config
            .build_client()
            .unwrap()
            .send(RequestSpec::get(format!("{}/loop", server.url())).unwrap())
            .await;

        let failure = result.into_result().unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::Transport);
        assert_eq!(failure.status_code(), None);
        assert!(failure.message().contains("Redirect failed"), "{}", failure);
    }
}
