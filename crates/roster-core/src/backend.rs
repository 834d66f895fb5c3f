//! The `Backend` trait, the entity families it serves, and response
//! envelope normalisation.
//!
//! The trait is implemented by transports (e.g. `roster-cli`'s
//! `HttpBackend`). Everything in this crate talks to the backend only
//! through it.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter};
use thiserror::Error;

use crate::{Error, Result, error::GENERIC_FAILURE, id::EntityId, person::json_kind};

// ─── Resources ───────────────────────────────────────────────────────────────

/// A backend entity family. The string form is the collection path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Resource {
  Administrators,
  Teachers,
  Psychologists,
  Parents,
  Students,
  Addresses,
  Subjects,
  Schedules,
  Courses,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A failure reported by (or on the way to) the backend.
#[derive(Debug, Error)]
pub enum BackendError {
  /// The backend refused a create because an equal entity exists. `existing`
  /// is the error body, which carries that entity.
  #[error("conflict: {message}")]
  Conflict { message: String, existing: Value },

  #[error("backend returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
  Status {
    status:  u16,
    /// Server-supplied explanation, if the error body had one.
    message: Option<String>,
  },

  #[error("transport error: {0}")]
  Transport(String),

  #[error("malformed response: {0}")]
  Decode(String),
}

impl BackendError {
  pub fn user_message(&self) -> String {
    match self {
      BackendError::Conflict { message, .. } if !message.is_empty() => message.clone(),
      BackendError::Status {
        message: Some(m), ..
      } if !m.trim().is_empty() => m.clone(),
      _ => GENERIC_FAILURE.into(),
    }
  }
}

/// Pull a human-readable message out of an error body. Looks at `message`,
/// then `error`, then `detail`.
pub fn server_message(body: &Value) -> Option<String> {
  ["message", "error", "detail"]
    .into_iter()
    .find_map(|key| body.get(key).and_then(Value::as_str))
    .map(str::to_owned)
    .filter(|m| !m.trim().is_empty())
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the remote administrative backend.
///
/// Bodies are passed as raw JSON; shape normalisation happens in this crate,
/// not in transports. All methods return `Send` futures so implementations
/// can be driven from a multi-threaded runtime.
pub trait Backend: Send + Sync {
  /// `GET /{resource}`: either a bare array or a `{data: [...]}` envelope.
  fn list(
    &self,
    resource: Resource,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + '_;

  /// `GET /{resource}/{id}`
  fn get<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + 'a;

  /// `POST /{resource}`, returning the created entity.
  fn create(
    &self,
    resource: Resource,
    body: Value,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + '_;

  /// `PUT /{resource}/{id}` (full replacement).
  fn update<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
    body: Value,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + 'a;

  /// `DELETE /{resource}/{id}`
  fn delete<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
  ) -> impl Future<Output = Result<(), BackendError>> + Send + 'a;
}

// ─── Envelope normalisation ──────────────────────────────────────────────────

/// Accept a bare array, a `{data: [...]}` envelope, or `null` (empty).
pub fn collection(body: Value) -> Result<Vec<Value>, String> {
  match body {
    Value::Array(items) => Ok(items),
    Value::Null => Ok(Vec::new()),
    Value::Object(mut map) => match map.remove("data") {
      Some(Value::Array(items)) => Ok(items),
      Some(Value::Null) => Ok(Vec::new()),
      Some(other) => Err(format!("`data` is {}, expected an array", json_kind(&other))),
      None => Err("object without a `data` array".into()),
    },
    other => Err(format!("expected an array, found {}", json_kind(&other))),
  }
}

/// Accept a bare object or a `{data: {...}}` envelope.
pub fn entity(body: Value) -> Result<Value, String> {
  match body {
    Value::Object(mut map) => match map.remove("data") {
      Some(inner @ Value::Object(_)) => Ok(inner),
      Some(other) => {
        map.insert("data".into(), other);
        Ok(Value::Object(map))
      }
      None => Ok(Value::Object(map)),
    },
    other => Err(format!("expected an object, found {}", json_kind(&other))),
  }
}

/// Normalise and deserialise a collection response.
pub fn decode_list<T: DeserializeOwned>(resource: Resource, body: Value) -> Result<Vec<T>> {
  let decode_err = |message: String| Error::Decode { resource, message };
  collection(body)
    .map_err(decode_err)?
    .into_iter()
    .map(|item| serde_json::from_value(item).map_err(|e| decode_err(e.to_string())))
    .collect()
}

/// Normalise and deserialise a single-entity response.
pub fn decode_one<T: DeserializeOwned>(resource: Resource, body: Value) -> Result<T> {
  let decode_err = |message: String| Error::Decode { resource, message };
  let value = entity(body).map_err(decode_err)?;
  serde_json::from_value(value).map_err(|e| decode_err(e.to_string()))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::reference::Course;

  #[test]
  fn bare_and_wrapped_collections_normalise_identically() {
    let bare = json!([{ "id": 1, "name": "1A" }]);
    let wrapped = json!({ "data": [{ "id": 1, "name": "1A" }] });
    let a: Vec<Course> = decode_list(Resource::Courses, bare).unwrap();
    let b: Vec<Course> = decode_list(Resource::Courses, wrapped).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn null_collection_is_empty() {
    assert!(collection(Value::Null).unwrap().is_empty());
    assert!(collection(json!({ "data": null })).unwrap().is_empty());
  }

  #[test]
  fn non_array_collections_are_rejected() {
    assert!(collection(json!("nope")).is_err());
    assert!(collection(json!({ "items": [] })).is_err());
  }

  #[test]
  fn entity_unwraps_data_object_only() {
    let wrapped = entity(json!({ "data": { "id": 1 } })).unwrap();
    assert_eq!(wrapped, json!({ "id": 1 }));
    let scalar_data = entity(json!({ "id": 2, "data": "x" })).unwrap();
    assert_eq!(scalar_data, json!({ "id": 2, "data": "x" }));
  }

  #[test]
  fn server_messages_are_preferred() {
    let err = BackendError::Status {
      status:  400,
      message: server_message(&json!({ "error": "Email already registered" })),
    };
    assert_eq!(err.user_message(), "Email already registered");

    let err = BackendError::Status {
      status:  500,
      message: None,
    };
    assert_eq!(err.user_message(), GENERIC_FAILURE);
    assert_eq!(err.to_string(), "backend returned 500");
  }
}
