//! Connection settings, layered from `roster.toml`, `ROSTER_*` environment
//! variables and command-line flags (in increasing precedence).

use std::{path::Path, time::Duration};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  /// Path prefix every resource lives under.
  #[serde(default = "default_api_prefix")]
  pub api_prefix:   String,
  /// Sent as `Authorization: Bearer <token>` when present.
  #[serde(default)]
  pub token:        Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_base_url() -> String { "http://localhost:8080".into() }

fn default_api_prefix() -> String { "/api".into() }

fn default_timeout_secs() -> u64 { 30 }

impl Default for Settings {
  fn default() -> Self {
    Self {
      base_url:     default_base_url(),
      api_prefix:   default_api_prefix(),
      token:        None,
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl Settings {
  /// Read `file` (optional on disk) and the `ROSTER_*` environment.
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("ROSTER"))
      .build()
      .context("failed to read settings")?
      .try_deserialize()
      .context("failed to deserialise Settings")
  }

  /// Apply command-line overrides.
  pub fn with_overrides(mut self, url: Option<String>, token: Option<String>) -> Self {
    if let Some(url) = url {
      self.base_url = url;
    }
    if token.is_some() {
      self.token = token;
    }
    self
  }

  /// `base_url` joined with `api_prefix`, without a trailing slash.
  pub fn api_root(&self) -> String {
    let base = self.base_url.trim_end_matches('/');
    let prefix = self.api_prefix.trim_matches('/');
    if prefix.is_empty() {
      base.to_owned()
    } else {
      format!("{base}/{prefix}")
    }
  }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}
