//! The validation pass run in front of every submit.
//!
//! `validate` never mutates its input and returns an empty map iff the form
//! may be submitted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  field::{ErrorMap, Field, FormValues, Slot},
  id::EntityId,
  person::Role,
  policy::policy_for,
  resolver::{ReferenceKind, ReferenceLists},
  rules::{RuleContext, validate_field},
};

/// Whether a form creates a new record or replaces an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormMode {
  Create,
  Edit(EntityId),
}

impl FormMode {
  pub fn is_edit(&self) -> bool { matches!(self, Self::Edit(_)) }
}

/// Everything besides the values that validation depends on.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
  pub today:            NaiveDate,
  pub mode:             &'a FormMode,
  /// When present, subject/schedule choices are checked against the lists.
  pub references:       Option<&'a ReferenceLists>,
  /// Subject already held by the record being edited.
  pub retained_subject: Option<&'a EntityId>,
}

const REQUIRED: &str = "This field is required.";

/// Validate `values` for `role`. Errors are keyed by field name; subject
/// slots after the first are keyed `subject_id.N` / `schedule_id.N`.
pub fn validate(values: &FormValues, role: Role, ctx: &ValidationContext<'_>) -> ErrorMap {
  let policy = policy_for(role);
  let rule_ctx = RuleContext {
    role,
    today: ctx.today,
  };
  let mut errors = ErrorMap::new();

  for &field in policy.required {
    if matches!(field, Field::SubjectId | Field::ScheduleId) {
      continue;
    }
    match values.trimmed(field) {
      // Editing keeps the stored password unless a new one is typed.
      None if field == Field::Password && ctx.mode.is_edit() => {}
      None => errors.insert(field.as_ref(), REQUIRED),
      Some(value) => {
        if let Some(message) = validate_field(field, value, &rule_ctx) {
          errors.insert(field.as_ref(), message);
        }
      }
    }
  }

  for slot in 0..policy.subject_slots {
    let current = values.slots.get(slot).cloned().unwrap_or_default();
    validate_slot(&mut errors, slot, &current, &values.slots, ctx);
  }

  errors
}

fn validate_slot(
  errors: &mut ErrorMap,
  slot: usize,
  current: &Slot,
  slots: &[Slot],
  ctx: &ValidationContext<'_>,
) {
  let subject_key = Field::SubjectId.slot_key(slot);
  let schedule_key = Field::ScheduleId.slot_key(slot);

  let Some(subject_id) = current.subject_id.as_ref().filter(|s| !s.is_blank()) else {
    errors.insert(subject_key, REQUIRED);
    if current.schedule_id.is_none() {
      errors.insert(schedule_key, REQUIRED);
    }
    return;
  };

  let duplicated = slots
    .iter()
    .enumerate()
    .any(|(i, s)| i != slot && s.subject_id.as_ref() == Some(subject_id));
  if duplicated {
    errors.insert(subject_key.clone(), "This subject is already chosen in another slot.");
  }

  // Only lists that finished loading are consulted.
  if let Some(lists) = ctx.references.filter(|l| l.is_ready(ReferenceKind::Subjects)) {
    match lists.subject(subject_id) {
      None => errors.insert(subject_key.clone(), "Selected subject is not available."),
      Some(s) if s.occupied && ctx.retained_subject != Some(subject_id) => {
        errors.insert(subject_key.clone(), "This subject is already assigned to a teacher.")
      }
      Some(_) => {}
    }
  }

  let Some(schedule_id) = current.schedule_id.as_ref().filter(|s| !s.is_blank()) else {
    errors.insert(schedule_key, REQUIRED);
    return;
  };

  if let Some(lists) = ctx.references.filter(|l| l.is_ready(ReferenceKind::Schedules)) {
    let belongs = lists
      .schedules_for(subject_id)
      .iter()
      .any(|s| &s.id == schedule_id);
    if !belongs {
      errors.insert(schedule_key, "Schedule does not belong to the selected subject.");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    hooks::NoopHooks,
    reference::{Schedule, Subject},
    resolver::ReferenceSnapshot,
  };

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 15).unwrap() }

  fn ctx<'a>(mode: &'a FormMode, references: Option<&'a ReferenceLists>) -> ValidationContext<'a> {
    ValidationContext {
      today: today(),
      mode,
      references,
      retained_subject: None,
    }
  }

  fn staff_values() -> FormValues {
    FormValues::default()
      .with(Field::GivenNames, "Ana")
      .with(Field::PaternalSurname, "Rojas")
      .with(Field::MaternalSurname, "Vera")
      .with(Field::BirthDate, "1985-03-04")
      .with(Field::Email, "ana@example.com")
      .with(Field::Phone, "71234567")
      .with(Field::AddressId, "3")
      .with(Field::Password, "Abcdef1!")
  }

  fn lists() -> ReferenceLists {
    let mut lists = ReferenceLists::new();
    let ticket = lists.begin_load(&[ReferenceKind::Subjects, ReferenceKind::Schedules]);
    let subjects = vec![
      Subject {
        id:       "1".into(),
        name:     "Math".into(),
        occupied: false,
      },
      Subject {
        id:       "2".into(),
        name:     "Art".into(),
        occupied: true,
      },
    ];
    let schedules = vec![
      Schedule {
        id:         "10".into(),
        subject_id: "1".into(),
        day:        "Monday".into(),
        start_time: "08:00".into(),
        end_time:   "09:00".into(),
      },
      Schedule {
        id:         "20".into(),
        subject_id: "2".into(),
        day:        "Friday".into(),
        start_time: "10:00".into(),
        end_time:   "11:00".into(),
      },
    ];
    let snapshot = ReferenceSnapshot {
      subjects: Some(Ok(subjects)),
      schedules: Some(Ok(schedules)),
      ..Default::default()
    };
    assert!(lists.apply(ticket, snapshot, &NoopHooks));
    lists
  }

  #[test]
  fn complete_staff_forms_pass() {
    let mode = FormMode::Create;
    for role in [Role::Administrator, Role::Psychologist, Role::Parent] {
      let errors = validate(&staff_values(), role, &ctx(&mode, None));
      assert!(errors.is_empty(), "{role}: {errors:?}");
    }
  }

  #[test]
  fn weak_password_is_flagged_for_every_contact_role() {
    let mode = FormMode::Create;
    let values = staff_values().with(Field::Password, "abc123");
    for role in [Role::Administrator, Role::Teacher, Role::Psychologist, Role::Parent] {
      let errors = validate(&values, role, &ctx(&mode, None));
      assert!(errors.contains(Field::Password), "{role}");
    }
  }

  #[test]
  fn blank_password_is_allowed_only_when_editing() {
    let values = staff_values().with(Field::Password, "");
    let create = FormMode::Create;
    assert!(validate(&values, Role::Parent, &ctx(&create, None)).contains(Field::Password));
    let edit = FormMode::Edit("4".into());
    assert!(validate(&values, Role::Parent, &ctx(&edit, None)).is_empty());
  }

  #[test]
  fn whitespace_only_fields_count_as_missing() {
    let mode = FormMode::Create;
    let values = staff_values().with(Field::GivenNames, "   ");
    let errors = validate(&values, Role::Administrator, &ctx(&mode, None));
    assert_eq!(errors.get(Field::GivenNames), Some(REQUIRED));
  }

  #[test]
  fn student_birth_window_is_applied() {
    let mode = FormMode::Create;
    let base = FormValues::default()
      .with(Field::GivenNames, "Juan Carlos")
      .with(Field::PaternalSurname, "Perez")
      .with(Field::MaternalSurname, "Gomez")
      .with(Field::ParentId, "12")
      .with(Field::CourseId, "5");

    for (date, ok) in [("2020-01-01", false), ("2004-01-01", false), ("2010-01-01", true)] {
      let values = base.clone().with(Field::BirthDate, date);
      let errors = validate(&values, Role::Student, &ctx(&mode, None));
      assert_eq!(errors.is_empty(), ok, "{date}: {errors:?}");
    }
  }

  #[test]
  fn students_ignore_contact_fields() {
    let mode = FormMode::Create;
    let values = FormValues::default()
      .with(Field::GivenNames, "Juan")
      .with(Field::PaternalSurname, "Perez")
      .with(Field::MaternalSurname, "Gomez")
      .with(Field::BirthDate, "2010-01-01")
      .with(Field::ParentId, "12")
      .with(Field::CourseId, "5")
      .with(Field::Email, "not an email");
    assert!(validate(&values, Role::Student, &ctx(&mode, None)).is_empty());
  }

  #[test]
  fn teacher_slot_requires_subject_and_schedule() {
    let mode = FormMode::Create;
    let errors = validate(&staff_values(), Role::Teacher, &ctx(&mode, None));
    assert!(errors.contains(Field::SubjectId));
    assert!(errors.contains(Field::ScheduleId));
  }

  #[test]
  fn occupied_subject_and_foreign_schedule_are_rejected() {
    let mode = FormMode::Create;
    let refs = lists();
    let mut values = staff_values();
    values.slots = vec![Slot {
      subject_id:  Some("2".into()),
      schedule_id: Some("20".into()),
    }];
    let errors = validate(&values, Role::Teacher, &ctx(&mode, Some(&refs)));
    assert!(errors.contains(Field::SubjectId));
    assert!(!errors.contains(Field::ScheduleId));

    values.slots[0] = Slot {
      subject_id:  Some("1".into()),
      schedule_id: Some("20".into()),
    };
    let errors = validate(&values, Role::Teacher, &ctx(&mode, Some(&refs)));
    assert!(!errors.contains(Field::SubjectId));
    assert!(errors.contains(Field::ScheduleId));

    values.slots[0].schedule_id = Some("10".into());
    assert!(validate(&values, Role::Teacher, &ctx(&mode, Some(&refs))).is_empty());
  }

  #[test]
  fn unloaded_lists_skip_membership_checks() {
    let mode = FormMode::Create;
    let mut values = staff_values();
    values.slots = vec![Slot {
      subject_id:  Some("1".into()),
      schedule_id: Some("10".into()),
    }];

    let idle = ReferenceLists::new();
    assert!(validate(&values, Role::Teacher, &ctx(&mode, Some(&idle))).is_empty());

    let mut failed = ReferenceLists::new();
    let ticket = failed.begin_load(&[ReferenceKind::Subjects, ReferenceKind::Schedules]);
    let snapshot = ReferenceSnapshot {
      subjects: Some(Err(crate::Error::Backend(crate::backend::BackendError::Transport(
        "connection refused".into(),
      )))),
      schedules: Some(Ok(Vec::new())),
      ..Default::default()
    };
    failed.apply(ticket, snapshot, &NoopHooks);
    let errors = validate(&values, Role::Teacher, &ctx(&mode, Some(&failed)));
    assert!(!errors.contains(Field::SubjectId));
    assert!(errors.contains(Field::ScheduleId));
  }

  #[test]
  fn retained_subject_passes_when_editing() {
    let mode = FormMode::Edit("9".into());
    let refs = lists();
    let retained = EntityId::from("2");
    let mut values = staff_values().with(Field::Password, "");
    values.slots = vec![Slot {
      subject_id:  Some("2".into()),
      schedule_id: Some("20".into()),
    }];
    let context = ValidationContext {
      retained_subject: Some(&retained),
      ..ctx(&mode, Some(&refs))
    };
    assert!(validate(&values, Role::Teacher, &context).is_empty());
  }

  #[test]
  fn duplicate_subject_across_slots_is_flagged() {
    let mode = FormMode::Create;
    let slot = Slot {
      subject_id:  Some("1".into()),
      schedule_id: Some("10".into()),
    };
    let slots = vec![slot.clone(), slot.clone()];
    let mut errors = ErrorMap::new();
    validate_slot(&mut errors, 1, &slot, &slots, &ctx(&mode, None));
    assert!(errors.get_key("subject_id.1").is_some());
  }

  #[test]
  fn validate_does_not_mutate_input() {
    let mode = FormMode::Create;
    let values = staff_values().with(Field::Email, "  ana@example.com  ");
    let before = values.clone();
    let _ = validate(&values, Role::Parent, &ctx(&mode, None));
    assert_eq!(values, before);
  }
}
