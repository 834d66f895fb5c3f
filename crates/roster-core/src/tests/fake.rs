//! In-memory `Backend` that records every call.

use std::{
  collections::{HashMap, HashSet},
  future::Future,
  sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use serde_json::{Value, json};

use crate::{
  backend::{Backend, BackendError, Resource},
  dispatch::Orchestrator,
  hooks::{Hooks, Level, Notice},
  id::EntityId,
  person::{PersonRecord, Role},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  List(Resource),
  Get(Resource, EntityId),
  Create(Resource, Value),
  Update(Resource, EntityId, Value),
  Delete(Resource, EntityId),
}

impl Call {
  pub fn is_write(&self) -> bool {
    matches!(self, Call::Create(..) | Call::Update(..) | Call::Delete(..))
  }
}

#[derive(Default)]
struct State {
  collections:   HashMap<Resource, Vec<Value>>,
  failing_lists: HashSet<Resource>,
  failing_gets:  HashSet<Resource>,
  failing_create: Option<(u16, Option<String>)>,
  wrap_lists:    bool,
  calls:         Vec<Call>,
  next_id:       u64,
}

#[derive(Default)]
pub struct FakeBackend {
  state: Mutex<State>,
}

impl FakeBackend {
  pub fn new() -> Self {
    let backend = Self::default();
    backend.state.lock().unwrap().next_id = 100;
    backend
  }

  pub fn with(self, resource: Resource, items: Vec<Value>) -> Self {
    self.state.lock().unwrap().collections.insert(resource, items);
    self
  }

  pub fn failing_list(self, resource: Resource) -> Self {
    self.state.lock().unwrap().failing_lists.insert(resource);
    self
  }

  pub fn failing_get(self, resource: Resource) -> Self {
    self.state.lock().unwrap().failing_gets.insert(resource);
    self
  }

  pub fn failing_create(self, status: u16, message: Option<&str>) -> Self {
    self.state.lock().unwrap().failing_create = Some((status, message.map(str::to_owned)));
    self
  }

  /// Serve lists as `{data: [...]}` instead of bare arrays.
  pub fn wrapped(self) -> Self {
    self.state.lock().unwrap().wrap_lists = true;
    self
  }

  pub fn calls(&self) -> Vec<Call> { self.state.lock().unwrap().calls.clone() }

  pub fn writes(&self) -> Vec<Call> { self.calls().into_iter().filter(Call::is_write).collect() }

  pub fn items(&self, resource: Resource) -> Vec<Value> {
    self
      .state
      .lock()
      .unwrap()
      .collections
      .get(&resource)
      .cloned()
      .unwrap_or_default()
  }

  fn record(&self, call: Call) { self.state.lock().unwrap().calls.push(call); }

  fn do_list(&self, resource: Resource) -> Result<Value, BackendError> {
    self.record(Call::List(resource));
    let state = self.state.lock().unwrap();
    if state.failing_lists.contains(&resource) {
      return Err(BackendError::Status {
        status:  500,
        message: Some(format!("{resource} exploded")),
      });
    }
    let items = Value::Array(state.collections.get(&resource).cloned().unwrap_or_default());
    Ok(if state.wrap_lists { json!({ "data": items }) } else { items })
  }

  fn do_get(&self, resource: Resource, id: &EntityId) -> Result<Value, BackendError> {
    self.record(Call::Get(resource, id.clone()));
    let state = self.state.lock().unwrap();
    if state.failing_gets.contains(&resource) {
      return Err(BackendError::Transport("connection reset".into()));
    }
    state
      .collections
      .get(&resource)
      .and_then(|items| items.iter().find(|v| has_id(v, id)).cloned())
      .ok_or(BackendError::Status {
        status:  404,
        message: Some(format!("{resource} {id} not found")),
      })
  }

  fn do_create(&self, resource: Resource, body: Value) -> Result<Value, BackendError> {
    self.record(Call::Create(resource, body.clone()));
    let mut state = self.state.lock().unwrap();
    if let Some((status, message)) = state.failing_create.clone() {
      return Err(BackendError::Status { status, message });
    }

    if resource == Resource::Addresses {
      let same_triple = |v: &&Value| {
        ["zone", "street", "door_number"]
          .into_iter()
          .all(|k| v.get(k) == body.get(k))
      };
      if let Some(existing) = state
        .collections
        .get(&resource)
        .and_then(|items| items.iter().find(same_triple))
      {
        return Err(BackendError::Conflict {
          message:  "Address already exists".into(),
          existing: json!({ "message": "Address already exists", "existing": existing }),
        });
      }
    }

    state.next_id += 1;
    let id = state.next_id;
    let mut stored = body;
    stored["id"] = json!(id);
    state
      .collections
      .entry(resource)
      .or_default()
      .push(stored.clone());
    Ok(stored)
  }

  fn do_update(&self, resource: Resource, id: &EntityId, body: Value) -> Result<Value, BackendError> {
    self.record(Call::Update(resource, id.clone(), body.clone()));
    let mut state = self.state.lock().unwrap();
    let items = state.collections.entry(resource).or_default();
    let Some(slot) = items.iter_mut().find(|v| has_id(v, id)) else {
      return Err(BackendError::Status {
        status:  404,
        message: None,
      });
    };
    let mut stored = body;
    stored["id"] = json!(id.as_str());
    *slot = stored.clone();
    Ok(stored)
  }

  fn do_delete(&self, resource: Resource, id: &EntityId) -> Result<(), BackendError> {
    self.record(Call::Delete(resource, id.clone()));
    let mut state = self.state.lock().unwrap();
    if let Some(items) = state.collections.get_mut(&resource) {
      items.retain(|v| !has_id(v, id));
    }
    Ok(())
  }
}

fn has_id(value: &Value, id: &EntityId) -> bool {
  value.get("id").and_then(EntityId::from_json).as_ref() == Some(id)
}

impl Backend for FakeBackend {
  fn list(&self, resource: Resource) -> impl Future<Output = Result<Value, BackendError>> + Send + '_ {
    async move { self.do_list(resource) }
  }

  fn get<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + 'a {
    async move { self.do_get(resource, id) }
  }

  fn create(
    &self,
    resource: Resource,
    body: Value,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + '_ {
    async move { self.do_create(resource, body) }
  }

  fn update<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
    body: Value,
  ) -> impl Future<Output = Result<Value, BackendError>> + Send + 'a {
    async move { self.do_update(resource, id, body) }
  }

  fn delete<'a>(
    &'a self,
    resource: Resource,
    id: &'a EntityId,
  ) -> impl Future<Output = Result<(), BackendError>> + Send + 'a {
    async move { self.do_delete(resource, id) }
  }
}

// ─── Hooks ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingHooks {
  pub notices: Mutex<Vec<Notice>>,
  pub created: Mutex<Vec<PersonRecord>>,
  pub updated: Mutex<Vec<PersonRecord>>,
  pub deleted: Mutex<Vec<(Role, EntityId)>>,
  pub errors:  Mutex<Vec<(Role, String)>>,
}

impl RecordingHooks {
  pub fn levels(&self) -> Vec<Level> {
    self.notices.lock().unwrap().iter().map(|n| n.level).collect()
  }

  pub fn last_notice(&self) -> Option<Notice> { self.notices.lock().unwrap().last().cloned() }
}

impl Hooks for RecordingHooks {
  fn notify(&self, notice: Notice) { self.notices.lock().unwrap().push(notice); }

  fn on_created(&self, record: &PersonRecord) { self.created.lock().unwrap().push(record.clone()); }

  fn on_updated(&self, record: &PersonRecord) { self.updated.lock().unwrap().push(record.clone()); }

  fn on_deleted(&self, role: Role, id: &EntityId) {
    self.deleted.lock().unwrap().push((role, id.clone()));
  }

  fn on_error(&self, role: Role, error: &crate::Error) {
    self.errors.lock().unwrap().push((role, error.to_string()));
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub type TestOrchestrator = Orchestrator<FakeBackend, RecordingHooks>;

pub fn orchestrator(backend: FakeBackend) -> (TestOrchestrator, Arc<FakeBackend>, Arc<RecordingHooks>) {
  let backend = Arc::new(backend);
  let hooks = Arc::new(RecordingHooks::default());
  (Orchestrator::new(backend.clone(), hooks.clone()), backend, hooks)
}

pub fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 15).unwrap() }

pub fn subjects() -> Vec<Value> {
  vec![
    json!({ "id": 1, "name": "Math", "occupied": false }),
    json!({ "id": 2, "name": "Art", "occupied": true }),
    json!({ "id": 3, "name": "Music", "occupied": 0 }),
  ]
}

pub fn schedules() -> Vec<Value> {
  vec![
    json!({ "id": 10, "subject_id": 1, "day": "Monday", "start_time": "08:00", "end_time": "09:30" }),
    json!({ "id": 11, "subject_id": 1, "day": "Wednesday", "start_time": "08:00", "end_time": "09:30" }),
    json!({ "id": 30, "subject_id": 3, "day": "Friday", "start_time": "10:00", "end_time": "11:00" }),
  ]
}

pub fn addresses() -> Vec<Value> {
  vec![json!({ "id": 5, "zone": "Sopocachi", "street": "Calle 5", "door_number": "12" })]
}
