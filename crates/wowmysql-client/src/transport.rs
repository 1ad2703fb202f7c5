//! Shared HTTP transport for the data, storage and auth clients

use crate::{ClientError, Result};
use bytes::Bytes;
use reqwest::{header, multipart::Form, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;

/// Which error classifier applies to non-2xx responses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ApiSurface {
    Data,
    Storage,
}

/// Credential attached to every request through the default headers
pub(crate) enum Credential<'a> {
    Bearer(&'a str),
    PublicKey(Option<&'a str>),
}

/// A pooled HTTP client bound to one base URL
///
/// The underlying `reqwest::Client` is shared by all requests issued
/// through one SDK client and is safe to use from many tasks at once.
#[derive(Clone, Debug)]
pub(crate) struct Transport {
    http: Client,
    base_url: String,
    // parsed copy of `base_url`, used to percent-encode path segments
    base: url::Url,
    surface: ApiSurface,
}

impl Transport {
    pub(crate) fn new(
        base_url: &str,
        credential: Credential<'_>,
        user_agent: &str,
        timeout: Duration,
        surface: ApiSurface,
    ) -> Result<Self> {
        let parsed = url::Url::parse(base_url.trim())
            .map_err(|e| ClientError::Config(format!("Invalid URL {:?}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header_value(user_agent)?);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        match credential {
            Credential::Bearer(key) => {
                headers.insert(header::AUTHORIZATION, header_value(&format!("Bearer {}", key))?);
            }
            Credential::PublicKey(Some(key)) if !key.is_empty() => {
                headers.insert("X-Wow-Public-Key", header_value(key)?);
            }
            Credential::PublicKey(_) => {}
        }

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            base: parsed,
            surface,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join `segments` into a path, percent-encoding each one
    ///
    /// Caller-supplied names such as tables or OAuth providers go through
    /// here so that `/`, `?` or `#` stay inside their segment.
    pub(crate) fn path(&self, segments: &[&str]) -> Result<String> {
        let mut url = self.base.clone();
        url.set_path("");
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("URL cannot take a path: {}", self.base)))?
            .clear()
            .extend(segments);
        Ok(url.path().to_string())
    }

    /// Start a request against `path`, relative to the base URL
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a JSON body and decode the JSON response
    pub(crate) async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = with_json(self.request(method, path), body)?;
        let bytes = self.dispatch(req).await?;
        decode(&bytes)
    }

    /// Send a request without a body and decode the JSON response
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let req = self.request(Method::GET, path).query(query);
        let bytes = self.dispatch(req).await?;
        decode(&bytes)
    }

    /// Send a multipart form and decode the JSON response
    pub(crate) async fn send_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let req = self.request(Method::POST, path).multipart(form);
        let bytes = self.dispatch(req).await?;
        decode(&bytes)
    }

    /// Send, read the full body and map non-2xx statuses to typed errors
    pub(crate) async fn dispatch(&self, req: RequestBuilder) -> Result<Bytes> {
        let req = req.build()?;
        debug!("Sending {} request to {}", req.method(), req.url());
        let response = self.http.execute(req).await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "Request failed");
            return Err(match self.surface {
                ApiSurface::Data => ClientError::from_response(status.as_u16(), &body),
                ApiSurface::Storage => ClientError::from_storage_response(status.as_u16(), &body),
            });
        }

        Ok(body)
    }
}

/// Attach a JSON body, surfacing serialization failures as `Encoding`
pub(crate) fn with_json<B: Serialize + ?Sized>(req: RequestBuilder, body: &B) -> Result<RequestBuilder> {
    let payload = serde_json::to_vec(body).map_err(ClientError::Encoding)?;
    Ok(req
        .header(header::CONTENT_TYPE, "application/json")
        .body(payload))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(ClientError::Decoding)
}

fn header_value(value: &str) -> Result<header::HeaderValue> {
    header::HeaderValue::from_str(value)
        .map_err(|e| ClientError::Config(format!("Invalid header value: {}", e)))
}
