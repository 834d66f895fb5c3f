//! `HttpBackend`: the [`Backend`] trait over the administrative REST API.

use std::future::Future;

use anyhow::Context as _;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use roster_core::{
  backend::{Backend, BackendError, Resource, server_message},
  id::EntityId,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::settings::Settings;

/// Async HTTP client for the administrative backend.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpBackend {
  client: Client,
  root:   String,
  token:  Option<String>,
}

impl HttpBackend {
  pub fn new(settings: &Settings) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(settings.timeout())
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      root: settings.api_root(),
      token: settings.token.clone().filter(|t| !t.trim().is_empty()),
    })
  }

  fn url(&self, resource: Resource, id: Option<&EntityId>) -> String {
    match id {
      Some(id) => format!("{}/{resource}/{id}", self.root),
      None => format!("{}/{resource}", self.root),
    }
  }

  fn request(&self, method: Method, url: &str) -> RequestBuilder {
    let req = self.client.request(method, url);
    match &self.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  /// Send one request and classify the response. An empty body reads as
  /// `null`.
  async fn send(&self, method: Method, url: String, body: Option<Value>) -> Result<Value, BackendError> {
    debug!(%method, %url, "backend request");
    let mut req = self.request(method.clone(), &url);
    if let Some(body) = &body {
      req = req.json(body);
    }

    let resp = req
      .send()
      .await
      .map_err(|e| BackendError::Transport(e.to_string()))?;
    let status = resp.status();
    let bytes = resp
      .bytes()
      .await
      .map_err(|e| BackendError::Transport(e.to_string()))?;

    let parsed = if bytes.is_empty() {
      Ok(Value::Null)
    } else {
      serde_json::from_slice::<Value>(&bytes)
    };

    if status.is_success() {
      // A delete only reports success; whatever it says is ignored.
      if method == Method::DELETE {
        return Ok(parsed.unwrap_or(Value::Null));
      }
      return parsed.map_err(|e| BackendError::Decode(e.to_string()));
    }

    // Error bodies are best-effort: plain text is kept as the message.
    let body = parsed.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    let message = match &body {
      Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
      other => server_message(other),
    };
    warn!(%method, %url, status = status.as_u16(), ?message, "backend request failed");

    if status == StatusCode::CONFLICT {
      return Err(BackendError::Conflict {
        message:  message.unwrap_or_default(),
        existing: body,
      });
    }
    Err(BackendError::Status {
      status: status.as_u16(),
      message,
    })
  }
}

impl Backend for HttpBackend {
  fn list(&self, resource: Resource) -> impl Future<Output = Result<Value, BackendError>> + Send + '_ {
    self.send(Method::GET, self.url(resource, None), None)
  }

  fn get<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + 'a {
    self.send(Method::GET, self.url(resource, Some(id)), None)
  }

  fn create(
    &self,
    resource: Resource,
    body: Value,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + '_ {
    self.send(Method::POST, self.url(resource, None), Some(body))
  }

  fn update<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
    body: Value,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + 'a {
    self.send(Method::PUT, self.url(resource, Some(id)), Some(body))
  }

  fn delete<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
  ) -> impl Future<Output = Result<(), BackendError>> + Send + 'a {
    let sent = self.send(Method::DELETE, self.url(resource, Some(id)), None);
    async move { sent.await.map(|_| ()) }
  }
}
