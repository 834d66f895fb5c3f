//! Per-role required fields, birth-date windows, and the
//! reference lists a form for that role must preload.
//!
//! The endpoint half of the policy lives in [`crate::dispatch`].

use chrono::{Months, NaiveDate};

use crate::{field::Field, person::Role, resolver::ReferenceKind};

/// Latest birth date accepted for staff roles.
pub const STAFF_BIRTH_CUTOFF: NaiveDate = match NaiveDate::from_ymd_opt(2006, 12, 31) {
  Some(d) => d,
  None => panic!("invalid staff cutoff"),
};

pub const PARENT_MIN_AGE: u32 = 18;
pub const STUDENT_MIN_AGE: u32 = 11;
pub const STUDENT_MAX_AGE: u32 = 19;

// ─── Birth-date window ───────────────────────────────────────────────────────

/// Whether a window edge itself is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
  Inclusive,
  Exclusive,
}

/// Acceptable birth dates. `min` is the earliest (oldest person), `max` the
/// latest (youngest person).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthWindow {
  pub min:  Option<NaiveDate>,
  pub max:  Option<NaiveDate>,
  pub edge: Edge,
}

impl BirthWindow {
  pub fn check(&self, date: NaiveDate) -> Result<(), String> {
    let inclusive = self.edge == Edge::Inclusive;
    if let Some(min) = self.min {
      let ok = if inclusive { date >= min } else { date > min };
      if !ok {
        return Err(format!("Too old for this role (earliest birth date: {min})."));
      }
    }
    if let Some(max) = self.max {
      let ok = if inclusive { date <= max } else { date < max };
      if !ok {
        return Err(format!("Too young for this role (latest birth date: {max})."));
      }
    }
    Ok(())
  }
}

/// The same calendar day `years` years earlier; 29 February falls back to
/// the 28th.
pub fn years_before(today: NaiveDate, years: u32) -> NaiveDate {
  today
    .checked_sub_months(Months::new(years * 12))
    .unwrap_or(NaiveDate::MIN)
}

/// Birth-date window for `role` as of `today`.
pub fn limits_for(role: Role, today: NaiveDate) -> BirthWindow {
  match role {
    Role::Administrator | Role::Teacher | Role::Psychologist => BirthWindow {
      min:  None,
      max:  Some(STAFF_BIRTH_CUTOFF),
      edge: Edge::Inclusive,
    },
    Role::Parent => BirthWindow {
      min:  None,
      max:  Some(years_before(today, PARENT_MIN_AGE)),
      edge: Edge::Inclusive,
    },
    Role::Student => BirthWindow {
      min:  Some(years_before(today, STUDENT_MAX_AGE)),
      max:  Some(years_before(today, STUDENT_MIN_AGE)),
      edge: Edge::Inclusive,
    },
  }
}

// ─── Role policy ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RolePolicy {
  pub role:          Role,
  /// Fields that must be non-blank. Slot fields are listed here but checked
  /// per slot.
  pub required:      &'static [Field],
  /// Reference lists loaded when a form for this role mounts.
  pub references:    &'static [ReferenceKind],
  /// Number of `(subject, schedule)` slots the form carries.
  pub subject_slots: usize,
}

impl RolePolicy {
  pub fn requires(&self, field: Field) -> bool { self.required.contains(&field) }

  pub fn has_contact(&self) -> bool { self.requires(Field::Email) }
}

const CONTACT_FIELDS: [Field; 8] = [
  Field::GivenNames,
  Field::PaternalSurname,
  Field::MaternalSurname,
  Field::BirthDate,
  Field::Email,
  Field::Phone,
  Field::AddressId,
  Field::Password,
];

static POLICIES: [RolePolicy; 5] = [
  RolePolicy {
    role:          Role::Administrator,
    required:      &CONTACT_FIELDS,
    references:    &[ReferenceKind::Addresses],
    subject_slots: 0,
  },
  RolePolicy {
    role:          Role::Teacher,
    required:      &[
      Field::GivenNames,
      Field::PaternalSurname,
      Field::MaternalSurname,
      Field::BirthDate,
      Field::Email,
      Field::Phone,
      Field::AddressId,
      Field::Password,
      Field::SubjectId,
      Field::ScheduleId,
    ],
    references:    &[
      ReferenceKind::Addresses,
      ReferenceKind::Subjects,
      ReferenceKind::Schedules,
    ],
    subject_slots: 1,
  },
  RolePolicy {
    role:          Role::Psychologist,
    required:      &CONTACT_FIELDS,
    references:    &[ReferenceKind::Addresses],
    subject_slots: 0,
  },
  RolePolicy {
    role:          Role::Parent,
    required:      &CONTACT_FIELDS,
    references:    &[ReferenceKind::Addresses],
    subject_slots: 0,
  },
  RolePolicy {
    role:          Role::Student,
    required:      &[
      Field::GivenNames,
      Field::PaternalSurname,
      Field::MaternalSurname,
      Field::BirthDate,
      Field::ParentId,
      Field::CourseId,
    ],
    references:    &[ReferenceKind::Parents, ReferenceKind::Courses],
    subject_slots: 0,
  },
];

pub fn policy_for(role: Role) -> &'static RolePolicy {
  match role {
    Role::Administrator => &POLICIES[0],
    Role::Teacher => &POLICIES[1],
    Role::Psychologist => &POLICIES[2],
    Role::Parent => &POLICIES[3],
    Role::Student => &POLICIES[4],
  }
}
