//! Loads auxiliary lists for a form and answers the
//! cascading and exclusivity questions the selectors ask.
//!
//! Lists are fetched concurrently and folded in one by one: a failed list
//! degrades to empty with a warning and never takes the others down with it.
//! Every load carries a [`LoadTicket`]; once the owning form is torn down the
//! ticket goes stale and its result is dropped on the floor.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use strum::{AsRefStr, Display, EnumIter};
use tracing::{debug, warn};

use crate::{
  Result,
  backend::{Backend, Resource, decode_list},
  field::Slot,
  hooks::{Hooks, Notice},
  id::EntityId,
  reference::{Address, Course, Labeled, PersonSummary, Schedule, Subject},
};

// ─── Kinds & state ───────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ReferenceKind {
  Addresses,
  Courses,
  Schedules,
  Subjects,
  Parents,
}

impl ReferenceKind {
  pub fn resource(self) -> Resource {
    match self {
      Self::Addresses => Resource::Addresses,
      Self::Courses => Resource::Courses,
      Self::Schedules => Resource::Schedules,
      Self::Subjects => Resource::Subjects,
      Self::Parents => Resource::Parents,
    }
  }
}

/// Per-list loading flag exposed to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
  #[default]
  Idle,
  Loading,
  Ready,
  /// Load failed; the list is empty.
  Failed(String),
}

/// Proof that a load was started against a particular form lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
  epoch: u64,
  kinds: Vec<ReferenceKind>,
}

impl LoadTicket {
  pub fn kinds(&self) -> &[ReferenceKind] { &self.kinds }
}

/// Results of one round of reference fetches. `None` means "not requested".
#[derive(Debug, Default)]
pub struct ReferenceSnapshot {
  pub addresses: Option<Result<Vec<Address>>>,
  pub courses:   Option<Result<Vec<Course>>>,
  pub schedules: Option<Result<Vec<Schedule>>>,
  pub subjects:  Option<Result<Vec<Subject>>>,
  pub parents:   Option<Result<Vec<PersonSummary>>>,
}

// ─── Fetching ────────────────────────────────────────────────────────────────

async fn load<B, T>(backend: &B, kinds: &[ReferenceKind], kind: ReferenceKind) -> Option<Result<Vec<T>>>
where
  B: Backend,
  T: DeserializeOwned,
{
  if !kinds.contains(&kind) {
    return None;
  }
  let resource = kind.resource();
  let result = match backend.list(resource).await {
    Ok(body) => decode_list(resource, body),
    Err(e) => Err(e.into()),
  };
  Some(result)
}

/// Issue every requested list fetch at once and wait for each individually.
/// Does not touch any form state, so it may outlive the form that asked.
pub async fn fetch_references<B: Backend>(backend: &B, kinds: &[ReferenceKind]) -> ReferenceSnapshot {
  let (addresses, courses, schedules, subjects, parents) = tokio::join!(
    load::<_, Address>(backend, kinds, ReferenceKind::Addresses),
    load::<_, Course>(backend, kinds, ReferenceKind::Courses),
    load::<_, Schedule>(backend, kinds, ReferenceKind::Schedules),
    load::<_, Subject>(backend, kinds, ReferenceKind::Subjects),
    load::<_, PersonSummary>(backend, kinds, ReferenceKind::Parents),
  );
  ReferenceSnapshot {
    addresses,
    courses,
    schedules,
    subjects,
    parents,
  }
}

// ─── ReferenceLists ──────────────────────────────────────────────────────────

/// The in-memory reference lists owned by one form instance.
#[derive(Debug, Default)]
pub struct ReferenceLists {
  pub addresses: Vec<Address>,
  pub courses:   Vec<Course>,
  pub schedules: Vec<Schedule>,
  pub subjects:  Vec<Subject>,
  pub parents:   Vec<PersonSummary>,
  states:        BTreeMap<ReferenceKind, LoadState>,
  epoch:         u64,
}

impl ReferenceLists {
  pub fn new() -> Self { Self::default() }

  pub fn state(&self, kind: ReferenceKind) -> &LoadState {
    static IDLE: LoadState = LoadState::Idle;
    self.states.get(&kind).unwrap_or(&IDLE)
  }

  pub fn is_loading(&self, kind: ReferenceKind) -> bool {
    matches!(self.state(kind), LoadState::Loading)
  }

  pub fn is_ready(&self, kind: ReferenceKind) -> bool {
    matches!(self.state(kind), LoadState::Ready)
  }

  /// Mark `kinds` as loading and hand out a ticket for the current epoch.
  pub fn begin_load(&mut self, kinds: &[ReferenceKind]) -> LoadTicket {
    for kind in kinds {
      self.states.insert(*kind, LoadState::Loading);
    }
    LoadTicket {
      epoch: self.epoch,
      kinds: kinds.to_vec(),
    }
  }

  /// Invalidate every outstanding ticket. Lists already applied are kept.
  pub fn invalidate(&mut self) {
    self.epoch += 1;
    self
      .states
      .values_mut()
      .filter(|s| **s == LoadState::Loading)
      .for_each(|s| *s = LoadState::Idle);
  }

  /// Fold a snapshot into the lists. Returns `false` (and changes nothing)
  /// when the ticket is stale.
  pub fn apply<H: Hooks + ?Sized>(
    &mut self,
    ticket: LoadTicket,
    snapshot: ReferenceSnapshot,
    hooks: &H,
  ) -> bool {
    if ticket.epoch != self.epoch {
      debug!(ticket = ticket.epoch, current = self.epoch, "discarding stale reference load");
      return false;
    }

    let ReferenceSnapshot {
      addresses,
      courses,
      schedules,
      subjects,
      parents,
    } = snapshot;

    fold(&mut self.states, ReferenceKind::Addresses, addresses, &mut self.addresses, hooks);
    fold(&mut self.states, ReferenceKind::Courses, courses, &mut self.courses, hooks);
    fold(&mut self.states, ReferenceKind::Schedules, schedules, &mut self.schedules, hooks);
    fold(&mut self.states, ReferenceKind::Subjects, subjects, &mut self.subjects, hooks);
    fold(&mut self.states, ReferenceKind::Parents, parents, &mut self.parents, hooks);
    true
  }

  // ── Cascades ──────────────────────────────────────────────────────────────

  /// Schedules owned by `subject_id`, and only those.
  pub fn schedules_for(&self, subject_id: &EntityId) -> Vec<&Schedule> {
    self
      .schedules
      .iter()
      .filter(|s| &s.subject_id == subject_id)
      .collect()
  }

  pub fn subject(&self, id: &EntityId) -> Option<&Subject> {
    self.subjects.iter().find(|s| &s.id == id)
  }

  /// Can `subject_id` be placed in slot `slot` given the other `slots` of the
  /// same form? `retained` is the subject the edited record already holds,
  /// which stays selectable even though the backend reports it occupied.
  pub fn is_selectable_subject(
    &self,
    subject_id: &EntityId,
    slot: usize,
    slots: &[Slot],
    retained: Option<&EntityId>,
  ) -> bool {
    let Some(subject) = self.subject(subject_id) else {
      return false;
    };
    if subject.occupied && retained != Some(subject_id) {
      return false;
    }
    !slots
      .iter()
      .enumerate()
      .any(|(i, s)| i != slot && s.subject_id.as_ref() == Some(subject_id))
  }

  /// Put an address at the front of the list, or move an equal-id entry
  /// there. Used by the lookup-or-create protocol.
  pub fn prepend_address(&mut self, address: Address) {
    self.addresses.retain(|a| a.id != address.id);
    self.addresses.insert(0, address);
  }
}

fn fold<T, H: Hooks + ?Sized>(
  states: &mut BTreeMap<ReferenceKind, LoadState>,
  kind: ReferenceKind,
  result: Option<Result<Vec<T>>>,
  list: &mut Vec<T>,
  hooks: &H,
) {
  match result {
    None => {}
    Some(Ok(items)) => {
      debug!(%kind, count = items.len(), "reference list loaded");
      *list = items;
      states.insert(kind, LoadState::Ready);
    }
    Some(Err(e)) => {
      warn!(%kind, error = %e, "reference list unavailable");
      list.clear();
      states.insert(kind, LoadState::Failed(e.to_string()));
      hooks.notify(Notice::warning(format!("Could not load {kind}; the list is empty.")));
    }
  }
}

// ─── Picker search ───────────────────────────────────────────────────────────

/// Case-insensitive substring match over each item's label. The selected
/// item is always kept so a control never silently drops its value.
pub fn filter_options<'a, T: Labeled>(
  items: &'a [T],
  query: &str,
  selected: Option<&EntityId>,
) -> Vec<&'a T> {
  let needle = query.trim().to_lowercase();
  items
    .iter()
    .filter(|item| {
      needle.is_empty()
        || item.label().to_lowercase().contains(&needle)
        || selected == Some(item.id())
    })
    .collect()
}
