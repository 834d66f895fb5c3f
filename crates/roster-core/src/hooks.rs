//! Callbacks from the core back into its UI caller.

use crate::{Error, id::EntityId, person::PersonRecord, person::Role};

/// Severity of a transient message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Info,
  Warning,
  Error,
}

/// A transient, toast-style message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level:   Level,
  pub message: String,
}

impl Notice {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      level:   Level::Success,
      message: message.into(),
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self {
      level:   Level::Info,
      message: message.into(),
    }
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      level:   Level::Warning,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level:   Level::Error,
      message: message.into(),
    }
  }
}

/// Lifecycle callbacks, all optional. Payloads are role-tagged.
///
/// Implementations must be cheap and non-blocking; they run inline on the
/// event path.
pub trait Hooks: Send + Sync {
  fn notify(&self, _notice: Notice) {}

  fn on_created(&self, _record: &PersonRecord) {}

  fn on_updated(&self, _record: &PersonRecord) {}

  fn on_deleted(&self, _role: Role, _id: &EntityId) {}

  fn on_error(&self, _role: Role, _error: &Error) {}
}

/// Hooks that ignore everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}
