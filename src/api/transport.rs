//! Purpose: Issue authenticated JSON requests against one backend service.
//! Exports: `ServiceClient`.
//! Role: HTTP access layer shared by the typed service clients.
//! Invariants: Every request carries exactly the configured credential header.
//! Invariants: Non-2xx responses become `Transport` errors carrying status and body.
//! Invariants: Timeouts and connection failures are `Transport` errors without a status.
//! Invariants: Nothing here retries; one call is one request.
#![allow(clippy::result_large_err)]

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::config::{Credentials, ServiceConfig};
use crate::core::error::{Error, ErrorKind};

type ApiResult<T> = Result<T, Error>;

#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<ServiceClientInner>,
}

struct ServiceClientInner {
    base_url: Url,
    credentials: Credentials,
    agent: ureq::Agent,
}

impl ServiceClient {
    pub fn new(config: &ServiceConfig) -> ApiResult<Self> {
        let base_url = config.base_url()?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(ServiceClientInner {
                base_url,
                credentials: config.credentials.clone(),
                agent,
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn get_json<R>(&self, segments: &[&str], timeout: Duration) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        let url = build_url(&self.inner.base_url, segments)?;
        self.request_json::<(), _>("GET", &url, None, timeout)
    }

    pub fn post_json<T, R>(&self, segments: &[&str], body: &T, timeout: Duration) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = build_url(&self.inner.base_url, segments)?;
        self.request_json("POST", &url, Some(body), timeout)
    }

    pub fn put_json<T, R>(&self, segments: &[&str], body: &T, timeout: Duration) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = build_url(&self.inner.base_url, segments)?;
        self.request_json("PUT", &url, Some(body), timeout)
    }

    /// Issues a DELETE and discards whatever body the service sends back.
    pub fn delete(&self, segments: &[&str], timeout: Duration) -> ApiResult<()> {
        let url = build_url(&self.inner.base_url, segments)?;
        let response = self.send::<()>("DELETE", &url, None, timeout)?;
        if let Err(err) = response.into_string() {
            tracing::debug!(url = %url, error = %err, "ignored unreadable delete response body");
        }
        Ok(())
    }

    fn request_json<T, R>(
        &self,
        method: &str,
        url: &Url,
        body: Option<&T>,
        timeout: Duration,
    ) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send(method, url, body, timeout)?;
        read_json_response(response, url)
    }

    fn send<T>(
        &self,
        method: &str,
        url: &Url,
        body: Option<&T>,
        timeout: Duration,
    ) -> ApiResult<ureq::Response>
    where
        T: Serialize,
    {
        tracing::debug!(method, url = %url, timeout_ms = timeout.as_millis() as u64, "service request");
        let request = self.request(method, url, timeout);
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };

        match response {
            Ok(resp) if (200..300).contains(&resp.status()) => Ok(resp),
            Ok(resp) => Err(status_error(method, url, resp.status(), resp)),
            Err(ureq::Error::Status(code, resp)) => Err(status_error(method, url, code, resp)),
            Err(ureq::Error::Transport(err)) => {
                tracing::debug!(method, url = %url, error = %err, "service request failed");
                Err(Error::new(ErrorKind::Transport)
                    .with_message(format!("{method} request failed"))
                    .with_resource(url.as_str())
                    .with_source(err))
            }
        }
    }

    fn request(&self, method: &str, url: &Url, timeout: Duration) -> ureq::Request {
        let mut request = self
            .inner
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json")
            .timeout(timeout);
        if let Some((name, value)) = self.inner.credentials.header() {
            request = request.set(name, &value);
        }
        request
    }
}

/// Appends `segments` to the base path, each encoded as exactly one path segment.
fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("service url cannot be a base")
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn read_json_response<R>(response: ureq::Response, url: &Url) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Transport)
            .with_message("failed to read response body")
            .with_resource(url.as_str())
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_resource(url.as_str())
            .with_body(body)
            .with_source(err)
    })
}

fn status_error(method: &str, url: &Url, status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    tracing::debug!(method, url = %url, status, "service returned error status");
    Error::new(ErrorKind::Transport)
        .with_message(format!("got {status} while calling {method} {}", url.path()))
        .with_resource(url.as_str())
        .with_status(status)
        .with_hint(status_hint(status))
        .with_body(body)
}

fn status_hint(status: u16) -> &'static str {
    match status {
        401 | 403 => "Check the bearer token or API key for this environment.",
        404 => "The selected tags do not exist for this identity.",
        409 => "A tag with this resource name already exists.",
        500..=599 => "The tagging service failed; try again later.",
        _ => "The tagging service rejected the request.",
    }
}
