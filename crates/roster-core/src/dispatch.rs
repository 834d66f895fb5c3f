//! Role-to-endpoint dispatch and the entity lifecycle operations.
//!
//! [`dispatch`] is the only place a role is mapped to a backend resource.
//! Call sites obtain a [`RoleOperations`] handle from
//! [`Orchestrator::dispatch`] and never branch on the role themselves.

use std::sync::Arc;

use serde_json::Value;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::{
  Error, Result,
  backend::{Backend, Resource, collection, decode_one, entity},
  hooks::{Hooks, Notice},
  id::EntityId,
  person::{PersonRecord, Role, RoleDetails, id_key},
  reference::{Course, Schedule},
};

// ─── Dispatch table ──────────────────────────────────────────────────────────

/// Operations that address a single record by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
  FetchOne,
  Update,
  Delete,
}

/// The endpoint group bound to one role. Every group serves the full
/// [`Operation`] set.
#[derive(Debug, PartialEq, Eq)]
pub struct OperationSet {
  pub role:     Role,
  pub resource: Resource,
  /// Name of the role-specific primary key in response bodies.
  pub id_key:   &'static str,
}

static DISPATCH: [OperationSet; 5] = [
  OperationSet {
    role:     Role::Administrator,
    resource: Resource::Administrators,
    id_key:   "administrator_id",
  },
  OperationSet {
    role:     Role::Teacher,
    resource: Resource::Teachers,
    id_key:   "teacher_id",
  },
  OperationSet {
    role:     Role::Psychologist,
    resource: Resource::Psychologists,
    id_key:   "psychologist_id",
  },
  OperationSet {
    role:     Role::Parent,
    resource: Resource::Parents,
    id_key:   "parent_id",
  },
  OperationSet {
    role:     Role::Student,
    resource: Resource::Students,
    id_key:   "student_id",
  },
];

/// Resolve the operation set for `role`.
pub fn dispatch(role: Role) -> &'static OperationSet {
  let set = match role {
    Role::Administrator => &DISPATCH[0],
    Role::Teacher => &DISPATCH[1],
    Role::Psychologist => &DISPATCH[2],
    Role::Parent => &DISPATCH[3],
    Role::Student => &DISPATCH[4],
  };
  debug_assert_eq!(set.id_key, id_key(role));
  set
}

// ─── Detail view ─────────────────────────────────────────────────────────────

/// A second-round-trip field of a detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependent<T> {
  /// The record has no reference to follow.
  NotApplicable,
  Loaded(T),
  /// The follow-up fetch failed; the rest of the view is still valid.
  Unavailable(String),
}

impl<T> Dependent<T> {
  pub fn loaded(&self) -> Option<&T> {
    match self {
      Self::Loaded(t) => Some(t),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonDetail {
  pub record:   PersonRecord,
  pub schedule: Dependent<Schedule>,
  pub course:   Dependent<Course>,
}

/// Evidence that the caller ran its confirm step before a delete.
#[derive(Debug, Clone, Copy)]
pub struct Confirmation(());

impl Confirmation {
  pub fn granted() -> Self { Self(()) }
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

/// Uniform lifecycle operations over the five person families.
///
/// Cheap to clone; backend and hooks are shared.
pub struct Orchestrator<B, H> {
  backend: Arc<B>,
  hooks:   Arc<H>,
}

impl<B, H> Clone for Orchestrator<B, H> {
  fn clone(&self) -> Self {
    Self {
      backend: self.backend.clone(),
      hooks:   self.hooks.clone(),
    }
  }
}

impl<B: Backend, H: Hooks> Orchestrator<B, H> {
  pub fn new(backend: Arc<B>, hooks: Arc<H>) -> Self { Self { backend, hooks } }

  pub fn backend(&self) -> &B { &self.backend }

  pub fn hooks(&self) -> &H { &self.hooks }

  /// The bound operation set for `role`.
  pub fn dispatch(&self, role: Role) -> RoleOperations<'_, B, H> {
    RoleOperations {
      orchestrator: self,
      set:          dispatch(role),
    }
  }
}

/// Operations for one role, bound to its endpoint group.
pub struct RoleOperations<'o, B, H> {
  orchestrator: &'o Orchestrator<B, H>,
  set:          &'static OperationSet,
}

impl<B: Backend, H: Hooks> RoleOperations<'_, B, H> {
  pub fn role(&self) -> Role { self.set.role }

  pub fn operation_set(&self) -> &'static OperationSet { self.set }

  fn backend(&self) -> &B { &self.orchestrator.backend }

  fn hooks(&self) -> &H { &self.orchestrator.hooks }

  fn require_id(&self, id: &EntityId, operation: Operation) -> Result<()> {
    if id.is_blank() {
      error!(role = %self.role(), %operation, "called without an id; aborting");
      return Err(Error::MissingId {
        role: self.role(),
        operation,
      });
    }
    Ok(())
  }

  /// Surface a failure to the caller's hooks and pass it on.
  fn report<T>(&self, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
      warn!(role = %self.role(), error = %e, "operation failed");
      self.hooks().on_error(self.role(), e);
      self.hooks().notify(Notice::error(e.user_message()));
    }
    result
  }

  fn decode(&self, body: Value) -> Result<PersonRecord> {
    let resource = self.set.resource;
    let value = entity(body).map_err(|message| Error::Decode { resource, message })?;
    PersonRecord::from_wire(self.role(), &value).map_err(|message| Error::Decode { resource, message })
  }

  fn check_role(&self, record: &PersonRecord) -> Result<()> {
    if record.role() != self.role() {
      return Err(Error::RoleMismatch {
        expected: self.role(),
        found:    record.role(),
      });
    }
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Every record of this role.
  pub async fn list(&self) -> Result<Vec<PersonRecord>> {
    let result: Result<Vec<PersonRecord>> = async {
      let body = self.backend().list(self.set.resource).await?;
      let resource = self.set.resource;
      collection(body)
        .map_err(|message| Error::Decode { resource, message })?
        .iter()
        .map(|item| {
          PersonRecord::from_wire(self.role(), item)
            .map_err(|message| Error::Decode { resource, message })
        })
        .collect()
    }
    .await;
    self.report(result)
  }

  pub async fn fetch_one(&self, id: &EntityId) -> Result<PersonRecord> {
    self.require_id(id, Operation::FetchOne)?;
    let result: Result<PersonRecord> = async {
      debug!(role = %self.role(), %id, "fetch one");
      let body = self.backend().get(self.set.resource, id).await?;
      let mut record = self.decode(body)?;
      record.id.get_or_insert_with(|| id.clone());
      Ok(record)
    }
    .await;
    self.report(result)
  }

  /// The record plus its dependent reference, fetched strictly in sequence.
  /// A failed second fetch marks that field unavailable instead of failing
  /// the view.
  pub async fn fetch_detail(&self, id: &EntityId) -> Result<PersonDetail> {
    let record = self.fetch_one(id).await?;

    let mut detail = PersonDetail {
      record,
      schedule: Dependent::NotApplicable,
      course: Dependent::NotApplicable,
    };

    if let Some(schedule_id) = detail.record.details.schedule_id().cloned() {
      detail.schedule = self.follow::<Schedule>(Resource::Schedules, &schedule_id).await;
    }
    if let RoleDetails::Student {
      course_id: Some(course_id),
      ..
    } = &detail.record.details
    {
      let course_id = course_id.clone();
      detail.course = self.follow::<Course>(Resource::Courses, &course_id).await;
    }
    Ok(detail)
  }

  async fn follow<T: serde::de::DeserializeOwned>(
    &self,
    resource: Resource,
    id: &EntityId,
  ) -> Dependent<T> {
    let result = match self.backend().get(resource, id).await {
      Ok(body) => decode_one::<T>(resource, body),
      Err(e) => Err(e.into()),
    };
    match result {
      Ok(value) => Dependent::Loaded(value),
      Err(e) => {
        warn!(%resource, %id, error = %e, "dependent fetch failed");
        Dependent::Unavailable(e.user_message())
      }
    }
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Create `record`. The returned record carries the backend-assigned id.
  pub async fn create(&self, record: &PersonRecord) -> Result<PersonRecord> {
    let result: Result<PersonRecord> = async {
      self.check_role(record)?;
      info!(role = %self.role(), "creating record");
      let body = self.backend().create(self.set.resource, record.to_wire()).await?;
      Ok(self.echo(record, &body, None))
    }
    .await;
    let created = self.report(result)?;
    self.hooks().on_created(&created);
    self
      .hooks()
      .notify(Notice::success(format!("{} created.", capitalised(self.role()))));
    Ok(created)
  }

  /// Replace the record at `id` with `record`.
  pub async fn update(&self, id: &EntityId, record: &PersonRecord) -> Result<PersonRecord> {
    self.require_id(id, Operation::Update)?;
    let result: Result<PersonRecord> = async {
      self.check_role(record)?;
      info!(role = %self.role(), %id, "updating record");
      let body = self
        .backend()
        .update(self.set.resource, id, record.to_wire())
        .await?;
      Ok(self.echo(record, &body, Some(id)))
    }
    .await;
    let updated = self.report(result)?;
    self.hooks().on_updated(&updated);
    self
      .hooks()
      .notify(Notice::success(format!("{} updated.", capitalised(self.role()))));
    Ok(updated)
  }

  /// Issue exactly one delete for `id`. Nothing is removed locally first.
  pub async fn delete(&self, id: &EntityId, _confirmed: Confirmation) -> Result<()> {
    self.require_id(id, Operation::Delete)?;
    let result: Result<()> = async {
      info!(role = %self.role(), %id, "deleting record");
      self.backend().delete(self.set.resource, id).await?;
      Ok(())
    }
    .await;
    self.report(result)?;
    self.hooks().on_deleted(self.role(), id);
    self
      .hooks()
      .notify(Notice::success(format!("{} deleted.", capitalised(self.role()))));
    Ok(())
  }

  /// What was sent, stamped with the id from the response (or `known_id`).
  /// Passwords never leave this function.
  fn echo(&self, sent: &PersonRecord, response: &Value, known_id: Option<&EntityId>) -> PersonRecord {
    let body = entity(response.clone()).unwrap_or(Value::Null);
    let id = ["id", self.set.id_key]
      .into_iter()
      .find_map(|key| body.get(key).and_then(EntityId::from_json))
      .or_else(|| known_id.cloned());

    let mut record = sent.clone();
    record.id = id;
    if let Some(contact) = record.details.contact_mut() {
      contact.password = None;
    }
    record
  }
}

fn capitalised(role: Role) -> String {
  let name = role.to_string();
  let mut chars = name.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => name,
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn every_role_has_a_distinct_operation_set() {
    let mut resources = HashSet::new();
    let mut id_keys = HashSet::new();
    for role in Role::iter() {
      let set = dispatch(role);
      assert_eq!(set.role, role);
      assert!(resources.insert(set.resource), "{role} shares a resource");
      assert!(id_keys.insert(set.id_key), "{role} shares an id key");
    }
    assert_eq!(resources.len(), 5);
  }

  #[test]
  fn role_names_capitalise() {
    assert_eq!(capitalised(Role::Psychologist), "Psychologist");
  }
}
