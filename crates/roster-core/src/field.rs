//! Form fields, raw form values, and the per-field error map.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  id::EntityId,
  person::{ContactDetails, PersonBase, PersonRecord, Role, RoleDetails},
};

/// A bindable form field. The string form is the key used in [`ErrorMap`]
/// and in the wire body.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
  GivenNames,
  PaternalSurname,
  MaternalSurname,
  BirthDate,
  Email,
  Phone,
  AddressId,
  Password,
  SubjectId,
  ScheduleId,
  ParentId,
  CourseId,
}

impl Field {
  /// The error-map key for this field in subject/schedule slot `slot`.
  /// Slot 0 uses the bare field name.
  pub fn slot_key(self, slot: usize) -> String {
    if slot == 0 {
      self.to_string()
    } else {
      format!("{self}.{slot}")
    }
  }
}

// ─── Slots ───────────────────────────────────────────────────────────────────

/// One `(subject, schedule)` assignment in a teacher form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
  pub subject_id:  Option<EntityId>,
  pub schedule_id: Option<EntityId>,
}

// ─── FormValues ──────────────────────────────────────────────────────────────

/// Raw, untrimmed user input for one in-progress form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValues {
  #[serde(default)]
  pub fields: BTreeMap<Field, String>,
  #[serde(default)]
  pub slots:  Vec<Slot>,
}

impl FormValues {
  pub fn get(&self, field: Field) -> &str {
    self.fields.get(&field).map(String::as_str).unwrap_or_default()
  }

  pub fn set(&mut self, field: Field, value: impl Into<String>) {
    self.fields.insert(field, value.into());
  }

  pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
    self.set(field, value);
    self
  }

  /// The trimmed value, or `None` when blank.
  pub fn trimmed(&self, field: Field) -> Option<&str> {
    Some(self.get(field).trim()).filter(|s| !s.is_empty())
  }

  fn id(&self, field: Field) -> Option<EntityId> { self.trimmed(field).map(EntityId::new) }

  /// Populate from an existing record (edit flow). The password is left
  /// blank: a blank password in edit mode means "unchanged".
  pub fn from_record(record: &PersonRecord) -> Self {
    let mut values = Self::default()
      .with(Field::GivenNames, record.base.given_names.clone())
      .with(Field::PaternalSurname, record.base.paternal_surname.clone())
      .with(Field::MaternalSurname, record.base.maternal_surname.clone());
    if let Some(d) = record.base.birth_date {
      values.set(Field::BirthDate, d.format("%Y-%m-%d").to_string());
    }

    if let Some(c) = record.details.contact() {
      values.set(Field::Email, c.email.clone());
      values.set(Field::Phone, c.phone.clone());
      if let Some(a) = &c.address_id {
        values.set(Field::AddressId, a.to_string());
      }
    }

    match &record.details {
      RoleDetails::Teacher {
        subject_id,
        schedule_id,
        ..
      } => {
        values.slots = vec![Slot {
          subject_id:  subject_id.clone(),
          schedule_id: schedule_id.clone(),
        }];
      }
      RoleDetails::Psychologist {
        schedule_id: Some(s),
        ..
      } => values.set(Field::ScheduleId, s.to_string()),
      RoleDetails::Student {
        parent_id,
        course_id,
      } => {
        if let Some(p) = parent_id {
          values.set(Field::ParentId, p.to_string());
        }
        if let Some(c) = course_id {
          values.set(Field::CourseId, c.to_string());
        }
      }
      _ => {}
    }
    values
  }

  /// Build the trimmed record for `role`. Callers validate first; this
  /// conversion does not reject anything.
  pub fn to_record(&self, role: Role, id: Option<EntityId>) -> PersonRecord {
    let text = |f: Field| self.get(f).trim().to_owned();
    let base = PersonBase {
      given_names:      text(Field::GivenNames),
      paternal_surname: text(Field::PaternalSurname),
      maternal_surname: text(Field::MaternalSurname),
      birth_date:       self
        .trimmed(Field::BirthDate)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
    };
    let contact = ContactDetails {
      email:      text(Field::Email),
      phone:      text(Field::Phone),
      address_id: self.id(Field::AddressId),
      password:   self.trimmed(Field::Password).map(str::to_owned),
    };
    let first_slot = self.slots.first().cloned().unwrap_or_default();

    let details = match role {
      Role::Administrator => RoleDetails::Administrator(contact),
      Role::Teacher => RoleDetails::Teacher {
        contact,
        subject_id: first_slot.subject_id,
        schedule_id: first_slot.schedule_id,
      },
      Role::Psychologist => RoleDetails::Psychologist {
        contact,
        schedule_id: self.id(Field::ScheduleId),
      },
      Role::Parent => RoleDetails::Parent(contact),
      Role::Student => RoleDetails::Student {
        parent_id: self.id(Field::ParentId),
        course_id: self.id(Field::CourseId),
      },
    };

    PersonRecord { id, base, details }
  }
}

// ─── ErrorMap ────────────────────────────────────────────────────────────────

/// Field-keyed validation messages. Empty iff the form is submittable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, String>);

impl ErrorMap {
  pub fn new() -> Self { Self::default() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  /// Record `message` under `key` unless that key already has an error; the
  /// first failing rule wins.
  pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
    self.0.entry(key.into()).or_insert_with(|| message.into());
  }

  pub fn get(&self, field: Field) -> Option<&str> { self.get_key(field.as_ref()) }

  pub fn get_key(&self, key: &str) -> Option<&str> { self.0.get(key).map(String::as_str) }

  pub fn contains(&self, field: Field) -> bool { self.get(field).is_some() }

  pub fn remove(&mut self, key: &str) { self.0.remove(key); }

  pub fn clear(&mut self) { self.0.clear(); }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slot_keys_distinguish_later_slots() {
    assert_eq!(Field::SubjectId.slot_key(0), "subject_id");
    assert_eq!(Field::SubjectId.slot_key(2), "subject_id.2");
  }

  #[test]
  fn to_record_trims_and_drops_blank_password() {
    let values = FormValues::default()
      .with(Field::GivenNames, "  Ana María ")
      .with(Field::Email, " ana@example.com")
      .with(Field::Password, "   ")
      .with(Field::AddressId, "4");
    let record = values.to_record(Role::Parent, None);
    assert_eq!(record.base.given_names, "Ana María");
    let contact = record.details.contact().unwrap();
    assert_eq!(contact.email, "ana@example.com");
    assert_eq!(contact.password, None);
    assert_eq!(contact.address_id, Some(EntityId::from("4")));
  }

  #[test]
  fn first_error_for_a_field_wins() {
    let mut errors = ErrorMap::new();
    errors.insert("phone", "required");
    errors.insert("phone", "too short");
    assert_eq!(errors.get(Field::Phone), Some("required"));
    assert_eq!(errors.len(), 1);
  }
}
