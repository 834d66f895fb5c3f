//! Pure per-field validity rules.
//!
//! Each rule returns the first failing message, or `None`. Required-ness is
//! not decided here; the validation engine only calls rules for populated
//! fields.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::{field::Field, person::Role, policy};

pub const MAX_TEXT_LEN: usize = 100;
pub const PHONE_DIGITS: usize = 8;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Letters (including Spanish diacritics) and spaces.
static NAME_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-zÁÉÍÓÚáéíóúÑñÜü\s]+$").unwrap());

static EMAIL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static UPPER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").unwrap());
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").unwrap());
static SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

/// What a rule may consult besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
  pub role:  Role,
  pub today: NaiveDate,
}

/// Check one populated field. Reference fields (`*_id`) have no format rule.
pub fn validate_field(field: Field, value: &str, ctx: &RuleContext) -> Option<String> {
  match field {
    Field::GivenNames | Field::PaternalSurname | Field::MaternalSurname => name(value),
    Field::Email => email(value),
    Field::Phone => phone(value),
    Field::Password => password(value),
    Field::BirthDate => birth_date(value, ctx),
    Field::AddressId
    | Field::SubjectId
    | Field::ScheduleId
    | Field::ParentId
    | Field::CourseId => None,
  }
}

pub fn name(value: &str) -> Option<String> {
  let value = value.trim();
  if value.is_empty() {
    return Some("This field is required.".into());
  }
  if value.chars().count() > MAX_TEXT_LEN {
    return Some(format!("Must be at most {MAX_TEXT_LEN} characters."));
  }
  if !NAME_RE.is_match(value) {
    return Some("Only letters and spaces are allowed.".into());
  }
  None
}

pub fn email(value: &str) -> Option<String> {
  let value = value.trim();
  if value.is_empty() {
    return Some("Email is required.".into());
  }
  if value.chars().count() > MAX_TEXT_LEN {
    return Some(format!("Must be at most {MAX_TEXT_LEN} characters."));
  }
  if !EMAIL_RE.is_match(value) {
    return Some("Enter a valid email address.".into());
  }
  None
}

/// Exactly eight digits once every non-digit has been stripped.
pub fn phone(value: &str) -> Option<String> {
  let digits = value.chars().filter(char::is_ascii_digit).count();
  (digits != PHONE_DIGITS).then(|| format!("Phone must have exactly {PHONE_DIGITS} digits."))
}

/// Keystroke normalisation for the phone input: keep digits, cap at eight.
pub fn normalize_phone_input(raw: &str) -> String {
  raw
    .chars()
    .filter(char::is_ascii_digit)
    .take(PHONE_DIGITS)
    .collect()
}

pub fn password(value: &str) -> Option<String> {
  if value.chars().count() < MIN_PASSWORD_LEN {
    return Some(format!("Password must be at least {MIN_PASSWORD_LEN} characters."));
  }
  if !UPPER_RE.is_match(value) {
    return Some("Password needs an uppercase letter.".into());
  }
  if !DIGIT_RE.is_match(value) {
    return Some("Password needs a digit.".into());
  }
  if !SPECIAL_RE.is_match(value) {
    return Some("Password needs a special character.".into());
  }
  None
}

/// Strict `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  if !DATE_RE.is_match(value) {
    return None;
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Format, then the role's birth-date window.
pub fn birth_date(value: &str, ctx: &RuleContext) -> Option<String> {
  let Some(date) = parse_date(value) else {
    return Some("Use the YYYY-MM-DD format.".into());
  };
  policy::limits_for(ctx.role, ctx.today).check(date).err()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ctx(role: Role) -> RuleContext {
    RuleContext {
      role,
      today: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
    }
  }

  #[test]
  fn phone_requires_exactly_eight_digits() {
    assert!(phone("12345678").is_none());
    assert!(phone("1234567").is_some());
    assert!(phone("123456789").is_some());
    assert!(phone("7-123 45 6").is_some());
    assert!(phone("7-123 45 67").is_none());
  }

  #[test]
  fn phone_input_is_truncated_while_typing() {
    assert_eq!(normalize_phone_input("7a12-34567890"), "71234567");
    assert_eq!(normalize_phone_input("71"), "71");
  }

  #[test]
  fn password_rules() {
    assert!(password("abc123").is_some());
    assert!(password("Abcdef1!").is_none());
    assert!(password("Ab1!").is_some());
    assert!(password("Abcdefg!").is_some());
    assert!(password("Abcdef12").is_some());
  }

  #[test]
  fn names_accept_diacritics_and_reject_digits() {
    assert!(name("José Ñúñez").is_none());
    assert!(name("R2D2").is_some());
    assert!(name("   ").is_some());
    assert!(name(&"a".repeat(101)).is_some());
    assert!(name(&"a".repeat(100)).is_none());
  }

  #[test]
  fn email_shape_and_length() {
    assert!(email("ana@example.com").is_none());
    assert!(email("ana@example").is_some());
    assert!(email("ana example@x.com").is_some());
    let long = format!("{}@example.com", "a".repeat(95));
    assert!(email(&long).is_some());
  }

  #[test]
  fn dates_must_be_iso_formatted() {
    assert!(parse_date("2010-01-01").is_some());
    assert!(parse_date("2010-1-1").is_none());
    assert!(parse_date("01/01/2010").is_none());
    assert!(parse_date("2010-02-30").is_none());
    assert_eq!(
      validate_field(Field::BirthDate, "2010/01/01", &ctx(Role::Student)).as_deref(),
      Some("Use the YYYY-MM-DD format.")
    );
  }

  #[test]
  fn reference_fields_have_no_format_rule() {
    assert!(validate_field(Field::CourseId, "anything", &ctx(Role::Student)).is_none());
  }
}
