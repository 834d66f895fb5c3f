//! Error types for `roster-core`.

use thiserror::Error;

use crate::{
  backend::{BackendError, Resource},
  dispatch::Operation,
  field::ErrorMap,
  person::Role,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Backend(#[from] BackendError),

  #[error("could not decode {resource} response: {message}")]
  Decode {
    resource: Resource,
    message:  String,
  },

  /// A single-record operation was requested without an identifier. Never
  /// reaches the transport or the notification hooks.
  #[error("{operation} on {role} requires an id")]
  MissingId { role: Role, operation: Operation },

  #[error("record failed validation ({} field(s))", .0.len())]
  InvalidRecord(ErrorMap),

  #[error("a submission is already in flight")]
  SubmitInFlight,

  #[error("{0} cannot be selected")]
  NotSelectable(String),

  #[error("form role is {expected}, record role is {found}")]
  RoleMismatch { expected: Role, found: Role },
}

impl Error {
  /// The human-readable text surfaced in a notification. Server-supplied
  /// messages win; everything else gets a generic line.
  pub fn user_message(&self) -> String {
    match self {
      Error::Backend(e) => e.user_message(),
      Error::InvalidRecord(_) => "Please correct the highlighted fields.".into(),
      Error::SubmitInFlight => "Please wait for the current request.".into(),
      Error::NotSelectable(_) => "That option is not available.".into(),
      _ => GENERIC_FAILURE.into(),
    }
  }
}

pub(crate) const GENERIC_FAILURE: &str = "The request failed. Please try again.";

pub type Result<T, E = Error> = std::result::Result<T, E>;
