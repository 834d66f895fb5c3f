//! Person records: the five role-specific shapes over a shared identity.
//!
//! The role of a record is not a field; it is the variant of
//! [`RoleDetails`]. A record therefore cannot change role after creation
//! without being rebuilt from scratch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::id::EntityId;

// ─── Role ────────────────────────────────────────────────────────────────────

/// The discriminator selecting policy, fields, and endpoints.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
  Administrator,
  Teacher,
  Psychologist,
  Parent,
  Student,
}

// ─── Shared shape ────────────────────────────────────────────────────────────

/// Identity fields every role carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonBase {
  pub given_names:      String,
  pub paternal_surname: String,
  pub maternal_surname: String,
  pub birth_date:       Option<NaiveDate>,
}

impl PersonBase {
  pub fn full_name(&self) -> String {
    [&self.given_names, &self.paternal_surname, &self.maternal_surname]
      .into_iter()
      .map(|s| s.trim())
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Contact data held by every role except students.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
  pub email:      String,
  pub phone:      String,
  pub address_id: Option<EntityId>,
  /// Write-only. Read responses never carry it; `None` on an update means
  /// "leave unchanged".
  pub password:   Option<String>,
}

/// Role-specific extension. The variant is the record's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleDetails {
  Administrator(ContactDetails),
  Teacher {
    contact:     ContactDetails,
    subject_id:  Option<EntityId>,
    schedule_id: Option<EntityId>,
  },
  Psychologist {
    contact:     ContactDetails,
    schedule_id: Option<EntityId>,
  },
  Parent(ContactDetails),
  Student {
    parent_id: Option<EntityId>,
    course_id: Option<EntityId>,
  },
}

impl RoleDetails {
  pub fn role(&self) -> Role {
    match self {
      Self::Administrator(_) => Role::Administrator,
      Self::Teacher { .. } => Role::Teacher,
      Self::Psychologist { .. } => Role::Psychologist,
      Self::Parent(_) => Role::Parent,
      Self::Student { .. } => Role::Student,
    }
  }

  pub fn contact(&self) -> Option<&ContactDetails> {
    match self {
      Self::Administrator(c) | Self::Parent(c) => Some(c),
      Self::Teacher { contact, .. } | Self::Psychologist { contact, .. } => Some(contact),
      Self::Student { .. } => None,
    }
  }

  pub fn contact_mut(&mut self) -> Option<&mut ContactDetails> {
    match self {
      Self::Administrator(c) | Self::Parent(c) => Some(c),
      Self::Teacher { contact, .. } | Self::Psychologist { contact, .. } => Some(contact),
      Self::Student { .. } => None,
    }
  }

  /// The schedule reference, for roles that may carry one.
  pub fn schedule_id(&self) -> Option<&EntityId> {
    match self {
      Self::Teacher { schedule_id, .. } | Self::Psychologist { schedule_id, .. } => {
        schedule_id.as_ref()
      }
      _ => None,
    }
  }
}

// ─── PersonRecord ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
  /// `None` until the backend has assigned one.
  pub id:      Option<EntityId>,
  pub base:    PersonBase,
  pub details: RoleDetails,
}

impl PersonRecord {
  pub fn role(&self) -> Role { self.details.role() }

  /// Serialise into the flat JSON body the backend expects for this role.
  /// The id travels in the URL, never in the body.
  pub fn to_wire(&self) -> Value {
    let mut wire = WireRecord {
      given_names: Some(self.base.given_names.clone()),
      paternal_surname: Some(self.base.paternal_surname.clone()),
      maternal_surname: Some(self.base.maternal_surname.clone()),
      birth_date: self.base.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
      ..WireRecord::default()
    };

    if let Some(c) = self.details.contact() {
      wire.email = Some(c.email.clone());
      wire.phone = Some(c.phone.clone());
      wire.address_id = c.address_id.clone();
      wire.password = c.password.clone();
    }

    match &self.details {
      RoleDetails::Teacher {
        subject_id,
        schedule_id,
        ..
      } => {
        wire.subject_id = subject_id.clone();
        wire.schedule_id = schedule_id.clone();
      }
      RoleDetails::Psychologist { schedule_id, .. } => {
        wire.schedule_id = schedule_id.clone();
      }
      RoleDetails::Student {
        parent_id,
        course_id,
      } => {
        wire.parent_id = parent_id.clone();
        wire.course_id = course_id.clone();
      }
      RoleDetails::Administrator(_) | RoleDetails::Parent(_) => {}
    }

    // A struct of strings and ids cannot fail to serialise.
    serde_json::to_value(wire).unwrap_or(Value::Null)
  }

  /// Decode a backend entity for `role`. The id is accepted under `id` or
  /// under the role-specific key (`teacher_id`, …).
  pub fn from_wire(role: Role, value: &Value) -> Result<Self, String> {
    let Value::Object(map) = value else {
      return Err(format!("expected an object, found {}", json_kind(value)));
    };

    let id = map
      .get("id")
      .or_else(|| map.get(id_key(role)))
      .and_then(EntityId::from_json);

    let wire: WireRecord =
      serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;

    let birth_date = match wire.birth_date.as_deref() {
      None | Some("") => None,
      Some(raw) => Some(parse_wire_date(raw)?),
    };

    let base = PersonBase {
      given_names: wire.given_names.unwrap_or_default(),
      paternal_surname: wire.paternal_surname.unwrap_or_default(),
      maternal_surname: wire.maternal_surname.unwrap_or_default(),
      birth_date,
    };

    let contact = ContactDetails {
      email:      wire.email.unwrap_or_default(),
      phone:      wire.phone.unwrap_or_default(),
      address_id: wire.address_id,
      password:   None,
    };

    let details = match role {
      Role::Administrator => RoleDetails::Administrator(contact),
      Role::Teacher => RoleDetails::Teacher {
        contact,
        subject_id: wire.subject_id,
        schedule_id: wire.schedule_id,
      },
      Role::Psychologist => RoleDetails::Psychologist {
        contact,
        schedule_id: wire.schedule_id,
      },
      Role::Parent => RoleDetails::Parent(contact),
      Role::Student => RoleDetails::Student {
        parent_id: wire.parent_id,
        course_id: wire.course_id,
      },
    };

    Ok(Self { id, base, details })
  }
}

/// The role-specific primary-key name used by the backend.
pub fn id_key(role: Role) -> &'static str {
  match role {
    Role::Administrator => "administrator_id",
    Role::Teacher => "teacher_id",
    Role::Psychologist => "psychologist_id",
    Role::Parent => "parent_id",
    Role::Student => "student_id",
  }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time component.
fn parse_wire_date(raw: &str) -> Result<NaiveDate, String> {
  let date_part = raw.get(..10).unwrap_or(raw);
  NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
    .map_err(|e| format!("invalid birth_date {raw:?}: {e}"))
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

// ─── Wire shape ──────────────────────────────────────────────────────────────

/// Flat JSON body shared by all five person families. Unknown keys are
/// ignored; absent keys are skipped on output.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireRecord {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  given_names:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  paternal_surname: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  maternal_surname: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  birth_date:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  email:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  phone:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  address_id:       Option<EntityId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  password:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  subject_id:       Option<EntityId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  schedule_id:      Option<EntityId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  parent_id:        Option<EntityId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  course_id:        Option<EntityId>,
}
