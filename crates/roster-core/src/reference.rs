//! Reference entities: the auxiliary collections that populate selectors.
//!
//! All of these are owned by other modules of the backend and are only read
//! here, with the single exception of [`Address`], which the lookup-or-create
//! protocol may create.

use serde::{Deserialize, Deserializer, Serialize};

use crate::id::EntityId;

/// Anything shown in a picker: an id plus a synthesized display label.
pub trait Labeled {
  fn id(&self) -> &EntityId;
  fn label(&self) -> String;
}

// ─── Address ─────────────────────────────────────────────────────────────────

/// A postal address. The backend enforces uniqueness of
/// `(zone, street, door_number)`; the client never assumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireAddress")]
pub struct Address {
  pub id:          EntityId,
  pub zone:        String,
  pub street:      String,
  pub door_number: String,
}

#[derive(Deserialize)]
struct WireAddress {
  id:          Option<EntityId>,
  address_id:  Option<EntityId>,
  #[serde(default)]
  zone:        String,
  #[serde(default)]
  street:      String,
  #[serde(default)]
  door_number: String,
}

impl TryFrom<WireAddress> for Address {
  type Error = String;

  fn try_from(wire: WireAddress) -> Result<Self, Self::Error> {
    Ok(Self {
      id:          pick_id(wire.id, wire.address_id, "address_id")?,
      zone:        wire.zone,
      street:      wire.street,
      door_number: wire.door_number,
    })
  }
}

impl Labeled for Address {
  fn id(&self) -> &EntityId { &self.id }

  fn label(&self) -> String {
    format!("{}, {} #{}", self.zone, self.street, self.door_number)
  }
}

/// Input to the address lookup-or-create protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
  pub zone:        String,
  pub street:      String,
  pub door_number: String,
}

impl NewAddress {
  pub fn trimmed(&self) -> Self {
    Self {
      zone:        self.zone.trim().to_owned(),
      street:      self.street.trim().to_owned(),
      door_number: self.door_number.trim().to_owned(),
    }
  }

  pub fn with_id(self, id: EntityId) -> Address {
    Address {
      id,
      zone: self.zone,
      street: self.street,
      door_number: self.door_number,
    }
  }
}

// ─── Subject ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireSubject")]
pub struct Subject {
  pub id:       EntityId,
  pub name:     String,
  /// Snapshot: `true` if an active teacher already holds this subject.
  pub occupied: bool,
}

#[derive(Deserialize)]
struct WireSubject {
  id:         Option<EntityId>,
  subject_id: Option<EntityId>,
  #[serde(default)]
  name:       String,
  #[serde(default, deserialize_with = "lenient_bool")]
  occupied:   bool,
}

impl TryFrom<WireSubject> for Subject {
  type Error = String;

  fn try_from(wire: WireSubject) -> Result<Self, Self::Error> {
    Ok(Self {
      id:       pick_id(wire.id, wire.subject_id, "subject_id")?,
      name:     wire.name,
      occupied: wire.occupied,
    })
  }
}

impl Labeled for Subject {
  fn id(&self) -> &EntityId { &self.id }

  fn label(&self) -> String { self.name.clone() }
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// A time slot. Belongs to exactly one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireSchedule")]
pub struct Schedule {
  pub id:         EntityId,
  pub subject_id: EntityId,
  pub day:        String,
  pub start_time: String,
  pub end_time:   String,
}

#[derive(Deserialize)]
struct WireSchedule {
  id:          Option<EntityId>,
  schedule_id: Option<EntityId>,
  subject_id:  EntityId,
  #[serde(default)]
  day:         String,
  #[serde(default)]
  start_time:  String,
  #[serde(default)]
  end_time:    String,
}

impl TryFrom<WireSchedule> for Schedule {
  type Error = String;

  fn try_from(wire: WireSchedule) -> Result<Self, Self::Error> {
    Ok(Self {
      id:         pick_id(wire.id, wire.schedule_id, "schedule_id")?,
      subject_id: wire.subject_id,
      day:        wire.day,
      start_time: wire.start_time,
      end_time:   wire.end_time,
    })
  }
}

impl Labeled for Schedule {
  fn id(&self) -> &EntityId { &self.id }

  fn label(&self) -> String {
    format!("{} {}-{}", self.day, self.start_time, self.end_time)
  }
}

// ─── Course ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireCourse")]
pub struct Course {
  pub id:   EntityId,
  pub name: String,
}

#[derive(Deserialize)]
struct WireCourse {
  id:        Option<EntityId>,
  course_id: Option<EntityId>,
  #[serde(default)]
  name:      String,
}

impl TryFrom<WireCourse> for Course {
  type Error = String;

  fn try_from(wire: WireCourse) -> Result<Self, Self::Error> {
    Ok(Self { id: pick_id(wire.id, wire.course_id, "course_id")?, name: wire.name })
  }
}

impl Labeled for Course {
  fn id(&self) -> &EntityId { &self.id }

  fn label(&self) -> String { self.name.clone() }
}

// ─── Parent (for selection) ──────────────────────────────────────────────────

/// The slice of a parent record a student form needs for its picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireSummary")]
pub struct PersonSummary {
  pub id:               EntityId,
  pub given_names:      String,
  pub paternal_surname: String,
  pub maternal_surname: String,
}

#[derive(Deserialize)]
struct WireSummary {
  id:               Option<EntityId>,
  parent_id:        Option<EntityId>,
  #[serde(default)]
  given_names:      String,
  #[serde(default)]
  paternal_surname: String,
  #[serde(default)]
  maternal_surname: String,
}

impl TryFrom<WireSummary> for PersonSummary {
  type Error = String;

  fn try_from(wire: WireSummary) -> Result<Self, Self::Error> {
    Ok(Self {
      id:               pick_id(wire.id, wire.parent_id, "parent_id")?,
      given_names:      wire.given_names,
      paternal_surname: wire.paternal_surname,
      maternal_surname: wire.maternal_surname,
    })
  }
}

impl Labeled for PersonSummary {
  fn id(&self) -> &EntityId { &self.id }

  fn label(&self) -> String {
    [&self.given_names, &self.paternal_surname, &self.maternal_surname]
      .into_iter()
      .filter(|s| !s.is_empty())
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Rows carry their id under `id`, under a type-specific key, or under both.
/// The first non-blank one wins.
fn pick_id(
  id: Option<EntityId>,
  keyed: Option<EntityId>,
  key: &str,
) -> Result<EntityId, String> {
  id.into_iter()
    .chain(keyed)
    .find(|id| !id.is_blank())
    .ok_or_else(|| format!("missing field `id` or `{key}`"))
}

/// Some backends report flags as `0`/`1` or `"true"`.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Bool(bool),
    Int(i64),
    Str(String),
  }

  Ok(match Option::<Raw>::deserialize(deserializer)? {
    None => false,
    Some(Raw::Bool(b)) => b,
    Some(Raw::Int(n)) => n != 0,
    Some(Raw::Str(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
  })
}
