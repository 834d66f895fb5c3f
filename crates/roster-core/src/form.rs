//! `PersonForm`: one in-flight create or edit form, and the place where
//! backend results are folded back into UI state.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{
  Error, Result,
  address::{AddressDialog, DismissReason},
  backend::Backend,
  dispatch::Orchestrator,
  events::{Listeners, UiEvent},
  field::{ErrorMap, Field, FormValues, Slot},
  hooks::Hooks,
  id::EntityId,
  person::{PersonRecord, Role},
  policy::{RolePolicy, policy_for},
  reference::{Address, Schedule, Subject},
  resolver::{ReferenceLists, fetch_references, filter_options},
  rules::normalize_phone_input,
  validate::{FormMode, ValidationContext, validate},
};

// ─── Submission guard ────────────────────────────────────────────────────────

/// Shared "a submit is in flight" flag. Clone it into the UI to disable the
/// submit control while a request is pending.
#[derive(Debug, Clone, Default)]
pub struct SubmitFlag(Arc<AtomicBool>);

impl SubmitFlag {
  pub fn is_set(&self) -> bool { self.0.load(Ordering::Acquire) }

  /// Claim the flag, or `None` if someone already holds it.
  pub fn try_acquire(&self) -> Option<SubmitGuard> {
    self
      .0
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| SubmitGuard(self.0.clone()))
  }
}

/// Releases the [`SubmitFlag`] on drop, whatever the outcome.
#[derive(Debug)]
pub struct SubmitGuard(Arc<AtomicBool>);

impl Drop for SubmitGuard {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

// ─── Address selector ────────────────────────────────────────────────────────

/// What the user picked in the address selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressChoice {
  Existing(EntityId),
  /// The sentinel "create new address" option.
  CreateNew,
  None,
}

// ─── PersonForm ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PersonForm {
  role:             Role,
  mode:             FormMode,
  today:            NaiveDate,
  values:           FormValues,
  errors:           ErrorMap,
  references:       ReferenceLists,
  address_dialog:   AddressDialog,
  events:           Listeners<UiEvent>,
  retained_subject: Option<EntityId>,
  submitting:       SubmitFlag,
}

impl PersonForm {
  /// A blank create form for `role`. `today` anchors the birth-date windows.
  pub fn new(role: Role, today: NaiveDate) -> Self { Self::with_mode(role, FormMode::Create, today) }

  /// An edit form for the record `id`; call [`Self::load_existing`] next.
  pub fn editing(role: Role, id: EntityId, today: NaiveDate) -> Self {
    Self::with_mode(role, FormMode::Edit(id), today)
  }

  fn with_mode(role: Role, mode: FormMode, today: NaiveDate) -> Self {
    Self {
      role,
      mode,
      today,
      values: blank_values(policy_for(role)),
      errors: ErrorMap::new(),
      references: ReferenceLists::new(),
      address_dialog: AddressDialog::new(),
      events: Listeners::new(),
      retained_subject: None,
      submitting: SubmitFlag::default(),
    }
  }

  pub fn role(&self) -> Role { self.role }

  pub fn mode(&self) -> &FormMode { &self.mode }

  pub fn values(&self) -> &FormValues { &self.values }

  pub fn errors(&self) -> &ErrorMap { &self.errors }

  pub fn references(&self) -> &ReferenceLists { &self.references }

  pub fn address_dialog(&self) -> &AddressDialog { &self.address_dialog }

  pub fn address_dialog_mut(&mut self) -> &mut AddressDialog { &mut self.address_dialog }

  /// Window-level event bus. The UI emits into it via
  /// [`Self::handle_ui_event`].
  pub fn events(&self) -> &Listeners<UiEvent> { &self.events }

  pub fn submit_flag(&self) -> SubmitFlag { self.submitting.clone() }

  pub fn is_submitting(&self) -> bool { self.submitting.is_set() }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  /// Preload the reference lists this role needs.
  pub async fn mount<B: Backend, H: Hooks>(&mut self, orchestrator: &Orchestrator<B, H>) {
    let kinds = policy_for(self.role).references;
    let ticket = self.references.begin_load(kinds);
    let snapshot = fetch_references(orchestrator.backend(), kinds).await;
    self.references.apply(ticket, snapshot, orchestrator.hooks());
  }

  /// Edit flow: fetch the current record and populate the values.
  pub async fn load_existing<B: Backend, H: Hooks>(
    &mut self,
    orchestrator: &Orchestrator<B, H>,
  ) -> Result<()> {
    let FormMode::Edit(id) = &self.mode else {
      return Ok(());
    };
    let record = orchestrator.dispatch(self.role).fetch_one(id).await?;
    self.values = FormValues::from_record(&record);
    pad_slots(&mut self.values, policy_for(self.role));
    self.retained_subject = self.values.slots.first().and_then(|s| s.subject_id.clone());
    self.errors.clear();
    Ok(())
  }

  /// The view is going away: drop any outstanding reference load and close
  /// the dialog.
  pub fn teardown(&mut self) {
    self.references.invalidate();
    self.address_dialog.dismiss(DismissReason::Cancel);
  }

  // ── Edits ─────────────────────────────────────────────────────────────────

  /// Store raw input for `field`. Phone input is truncated to eight digits;
  /// subject and schedule go to the first slot.
  pub fn set(&mut self, field: Field, value: impl Into<String>) {
    let value = value.into();
    match field {
      Field::Phone => self.values.set(field, normalize_phone_input(&value)),
      Field::SubjectId | Field::ScheduleId if policy_for(self.role).subject_slots > 0 => {
        let id = Some(EntityId::new(value)).filter(|id| !id.is_blank());
        let slot = self.slot_mut(0);
        if field == Field::SubjectId {
          if slot.subject_id != id {
            slot.schedule_id = None;
          }
          slot.subject_id = id;
        } else {
          slot.schedule_id = id;
        }
      }
      _ => self.values.set(field, value),
    }
    self.errors.remove(field.as_ref());
  }

  fn slot_mut(&mut self, slot: usize) -> &mut Slot {
    if self.values.slots.len() <= slot {
      self.values.slots.resize_with(slot + 1, Slot::default);
    }
    &mut self.values.slots[slot]
  }

  /// Subjects that may go into `slot` right now.
  pub fn selectable_subjects(&self, slot: usize) -> Vec<&Subject> {
    self
      .references
      .subjects
      .iter()
      .filter(|s| {
        self.references.is_selectable_subject(
          &s.id,
          slot,
          &self.values.slots,
          self.retained_subject.as_ref(),
        )
      })
      .collect()
  }

  /// Choose (or clear) the subject of `slot`. A different subject always
  /// clears that slot's schedule.
  pub fn choose_subject(&mut self, slot: usize, subject_id: Option<EntityId>) -> Result<()> {
    if let Some(id) = &subject_id {
      let selectable = self.references.is_selectable_subject(
        id,
        slot,
        &self.values.slots,
        self.retained_subject.as_ref(),
      );
      if !selectable {
        return Err(Error::NotSelectable(format!("subject {id}")));
      }
    }
    let entry = self.slot_mut(slot);
    if entry.subject_id != subject_id {
      debug!(slot, "subject changed; clearing schedule");
      entry.schedule_id = None;
    }
    entry.subject_id = subject_id;
    self.errors.remove(&Field::SubjectId.slot_key(slot));
    Ok(())
  }

  /// Schedules offered for `slot`: empty until a subject is chosen.
  pub fn available_schedules(&self, slot: usize) -> Vec<&Schedule> {
    self
      .values
      .slots
      .get(slot)
      .and_then(|s| s.subject_id.as_ref())
      .map(|subject| self.references.schedules_for(subject))
      .unwrap_or_default()
  }

  pub fn choose_schedule(&mut self, slot: usize, schedule_id: Option<EntityId>) -> Result<()> {
    if let Some(id) = &schedule_id
      && !self.available_schedules(slot).iter().any(|s| &s.id == id)
    {
      return Err(Error::NotSelectable(format!("schedule {id}")));
    }
    self.slot_mut(slot).schedule_id = schedule_id;
    self.errors.remove(&Field::ScheduleId.slot_key(slot));
    Ok(())
  }

  /// Address options matching `query`, always including the current one.
  pub fn address_options(&self, query: &str) -> Vec<&Address> {
    let selected = self.values.trimmed(Field::AddressId).map(EntityId::new);
    filter_options(&self.references.addresses, query, selected.as_ref())
  }

  pub fn choose_address(&mut self, choice: AddressChoice) {
    match choice {
      AddressChoice::Existing(id) => self.set(Field::AddressId, id.to_string()),
      AddressChoice::None => self.set(Field::AddressId, ""),
      AddressChoice::CreateNew => {
        self.set(Field::AddressId, "");
        self.address_dialog.open(&self.events);
      }
    }
  }

  /// Deliver a window-level event (Escape, overlay click).
  pub fn handle_ui_event(&mut self, event: UiEvent) {
    self.events.emit(&event);
    self.address_dialog.pump();
  }

  /// Submit the address dialog; on either success path the address becomes
  /// the form's selection.
  pub async fn submit_address<B: Backend, H: Hooks>(&mut self, orchestrator: &Orchestrator<B, H>) {
    let selected = self
      .address_dialog
      .submit(orchestrator.backend(), &mut self.references, orchestrator.hooks())
      .await;
    if let Some(id) = selected {
      self.set(Field::AddressId, id.to_string());
    }
  }

  // ── Validation & submit ───────────────────────────────────────────────────

  /// Re-run validation and store the result.
  pub fn validate(&mut self) -> &ErrorMap {
    let ctx = ValidationContext {
      today:            self.today,
      mode:             &self.mode,
      references:       Some(&self.references),
      retained_subject: self.retained_subject.as_ref(),
    };
    self.errors = validate(&self.values, self.role, &ctx);
    &self.errors
  }

  /// Validate, then create or update exactly once. On success a create form
  /// is cleared; on failure every value is kept for a retry.
  pub async fn submit<B: Backend, H: Hooks>(
    &mut self,
    orchestrator: &Orchestrator<B, H>,
  ) -> Result<PersonRecord> {
    let Some(_guard) = self.submitting.try_acquire() else {
      return Err(Error::SubmitInFlight);
    };

    if !self.validate().is_empty() {
      debug!(role = %self.role, errors = self.errors.len(), "submit blocked by validation");
      return Err(Error::InvalidRecord(self.errors.clone()));
    }

    let ops = orchestrator.dispatch(self.role);
    match &self.mode {
      FormMode::Create => {
        let record = self.values.to_record(self.role, None);
        let created = ops.create(&record).await?;
        info!(role = %self.role, id = ?created.id, "record created; clearing form");
        self.reset();
        Ok(created)
      }
      FormMode::Edit(id) => {
        let id = id.clone();
        let record = self.values.to_record(self.role, Some(id.clone()));
        ops.update(&id, &record).await
      }
    }
  }

  /// Back to a blank form. Reference lists are kept.
  pub fn reset(&mut self) {
    self.values = blank_values(policy_for(self.role));
    self.errors.clear();
    self.retained_subject = None;
  }
}

fn blank_values(policy: &RolePolicy) -> FormValues {
  let mut values = FormValues::default();
  pad_slots(&mut values, policy);
  values
}

fn pad_slots(values: &mut FormValues, policy: &RolePolicy) {
  if values.slots.len() < policy.subject_slots {
    values.slots.resize_with(policy.subject_slots, Slot::default);
  }
}
