//! Address Lookup-or-Create Protocol.
//!
//! Addresses are unique by `(zone, street, door_number)` on the backend and
//! users re-enter the same one all the time. A create that collides is
//! therefore not an error: the backend answers `409 Conflict` with the
//! existing entity, and the protocol selects that entity exactly as it would
//! a freshly created one.
//!
//! ```text
//! Closed ──open──▶ Open ──submit──▶ Submitting ──Created────────▶ Closed
//!   ▲               │  ▲                        ──AlreadyExists──▶ Closed
//!   └──dismiss──────┘  └────────── Failed ◀─────
//! ```

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
  Error,
  backend::{Backend, BackendError, Resource, entity},
  events::{Listeners, Subscription, UiEvent},
  hooks::{Hooks, Notice},
  id::EntityId,
  reference::{Address, NewAddress},
  resolver::ReferenceLists,
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Result of one lookup-or-create attempt. The first two variants share the
/// success path.
#[derive(Debug)]
pub enum CreateAddressOutcome {
  Created(Address),
  AlreadyExists(Address),
  Failed(Error),
}

impl CreateAddressOutcome {
  /// The address to select, for both success variants.
  pub fn address(&self) -> Option<&Address> {
    match self {
      Self::Created(a) | Self::AlreadyExists(a) => Some(a),
      Self::Failed(_) => None,
    }
  }
}

/// Create `input`, treating a uniqueness conflict as a successful lookup.
pub async fn lookup_or_create<B: Backend>(backend: &B, input: &NewAddress) -> CreateAddressOutcome {
  let input = input.trimmed();
  let body = serde_json::json!({
    "zone": input.zone,
    "street": input.street,
    "door_number": input.door_number,
  });

  match backend.create(Resource::Addresses, body).await {
    Ok(body) => {
      let created = entity(body)
        .ok()
        .and_then(|v| address_from_value(&v, &input));
      match created {
        Some(address) => CreateAddressOutcome::Created(address),
        None => CreateAddressOutcome::Failed(Error::Decode {
          resource: Resource::Addresses,
          message:  "created address has no id".into(),
        }),
      }
    }
    Err(BackendError::Conflict { message, existing }) => {
      match conflicting_address(&existing, &input) {
        Some(address) => {
          debug!(id = %address.id, "address already exists; selecting it");
          CreateAddressOutcome::AlreadyExists(address)
        }
        None => CreateAddressOutcome::Failed(BackendError::Conflict { message, existing }.into()),
      }
    }
    Err(e) => CreateAddressOutcome::Failed(e.into()),
  }
}

/// Locate the existing entity in a conflict body. Backends nest it under
/// `existing`, `data`, or `address`, or put its fields at the top level.
fn conflicting_address(body: &Value, input: &NewAddress) -> Option<Address> {
  ["existing", "data", "address"]
    .into_iter()
    .filter_map(|key| body.get(key))
    .chain(std::iter::once(body))
    .find_map(|candidate| address_from_value(candidate, input))
}

/// Build an address from an object carrying an id; missing fields fall back
/// to what the user entered.
fn address_from_value(value: &Value, input: &NewAddress) -> Option<Address> {
  let map = value.as_object()?;
  let id = ["id", "address_id", "existing_id"]
    .into_iter()
    .find_map(|key| map.get(key).and_then(EntityId::from_json))?;
  let text = |key: &str, fallback: &str| {
    map
      .get(key)
      .and_then(Value::as_str)
      .unwrap_or(fallback)
      .to_owned()
  };
  Some(Address {
    id,
    zone: text("zone", &input.zone),
    street: text("street", &input.street),
    door_number: text("door_number", &input.door_number),
  })
}

// ─── Dialog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DialogState {
  #[default]
  Closed,
  Open {
    /// Message from the last failed attempt.
    error: Option<String>,
  },
  Submitting,
}

/// Why an open dialog was dismissed without saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
  Cancel,
  OverlayClick,
  EscapeKey,
}

/// The "new address" dialog. While open it listens for window-level escape
/// and overlay events; the listener is released on close.
#[derive(Debug, Default)]
pub struct AddressDialog {
  state:        DialogState,
  pub draft:    NewAddress,
  subscription: Option<(Subscription, mpsc::UnboundedReceiver<DismissReason>)>,
}

impl AddressDialog {
  pub fn new() -> Self { Self::default() }

  pub fn state(&self) -> &DialogState { &self.state }

  pub fn is_open(&self) -> bool { !matches!(self.state, DialogState::Closed) }

  /// `Closed → Open`. Subscribes to `events` for the lifetime of the dialog.
  pub fn open(&mut self, events: &Listeners<UiEvent>) {
    if self.is_open() {
      return;
    }
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = events.subscribe(move |event| {
      let reason = match event {
        UiEvent::EscapeKey => DismissReason::EscapeKey,
        UiEvent::OverlayClick => DismissReason::OverlayClick,
      };
      // The receiver only disappears together with the subscription.
      let _ = tx.send(reason);
    });
    self.draft = NewAddress::default();
    self.state = DialogState::Open { error: None };
    self.subscription = Some((subscription, rx));
  }

  /// Apply dismiss events delivered since the last call.
  pub fn pump(&mut self) {
    let reason = self
      .subscription
      .as_mut()
      .and_then(|(_, rx)| rx.try_recv().ok());
    if let Some(reason) = reason {
      self.dismiss(reason);
    }
  }

  /// `Open → Closed`, discarding the draft. Ignored while submitting.
  pub fn dismiss(&mut self, reason: DismissReason) {
    if !matches!(self.state, DialogState::Open { .. }) {
      return;
    }
    debug!(?reason, "address dialog dismissed");
    self.close();
  }

  fn close(&mut self) {
    self.state = DialogState::Closed;
    self.draft = NewAddress::default();
    self.subscription = None;
  }

  /// `Open → Submitting`. Returns the trimmed draft, or stays open with an
  /// error when any part of the triple is blank.
  pub fn begin_submit(&mut self) -> Option<NewAddress> {
    if !matches!(self.state, DialogState::Open { .. }) {
      return None;
    }
    let draft = self.draft.trimmed();
    if draft.zone.is_empty() || draft.street.is_empty() || draft.door_number.is_empty() {
      self.state = DialogState::Open {
        error: Some("Zone, street and door number are all required.".into()),
      };
      return None;
    }
    self.state = DialogState::Submitting;
    Some(draft)
  }

  /// Fold an outcome into the dialog and the reference list. Returns the id
  /// to auto-select on either success variant.
  pub fn finish<H: Hooks + ?Sized>(
    &mut self,
    outcome: CreateAddressOutcome,
    lists: &mut ReferenceLists,
    hooks: &H,
  ) -> Option<EntityId> {
    if self.state != DialogState::Submitting {
      return None;
    }
    match outcome {
      CreateAddressOutcome::Created(address) => {
        info!(id = %address.id, "address created");
        let id = address.id.clone();
        lists.prepend_address(address);
        self.close();
        hooks.notify(Notice::success("Address created and selected."));
        Some(id)
      }
      CreateAddressOutcome::AlreadyExists(address) => {
        let id = address.id.clone();
        if !lists.addresses.iter().any(|a| a.id == id) {
          lists.prepend_address(address);
        }
        self.close();
        hooks.notify(Notice::info("That address already existed; it has been selected."));
        Some(id)
      }
      CreateAddressOutcome::Failed(e) => {
        self.state = DialogState::Open {
          error: Some(e.user_message()),
        };
        None
      }
    }
  }

  /// Run one full submission against `backend`.
  pub async fn submit<B: Backend, H: Hooks + ?Sized>(
    &mut self,
    backend: &B,
    lists: &mut ReferenceLists,
    hooks: &H,
  ) -> Option<EntityId> {
    let draft = self.begin_submit()?;
    let outcome = lookup_or_create(backend, &draft).await;
    self.finish(outcome, lists, hooks)
  }
}
