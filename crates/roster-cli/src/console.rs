//! Terminal rendering and the [`Hooks`] implementation the binary uses.

use std::fmt::Write as _;

use roster_core::{
  Error,
  dispatch::{Dependent, PersonDetail},
  field::ErrorMap,
  hooks::{Hooks, Level, Notice},
  id::EntityId,
  person::{PersonRecord, Role, RoleDetails},
  reference::Labeled,
};
use tracing::{debug, error};

/// Prints notices to stderr so stdout stays machine-readable.
#[derive(Debug, Default)]
pub struct ConsoleHooks;

impl Hooks for ConsoleHooks {
  fn notify(&self, notice: Notice) { eprintln!("{}", format_notice(&notice)); }

  fn on_created(&self, record: &PersonRecord) {
    debug!(role = %record.role(), id = ?record.id, "created");
  }

  fn on_updated(&self, record: &PersonRecord) {
    debug!(role = %record.role(), id = ?record.id, "updated");
  }

  fn on_deleted(&self, role: Role, id: &EntityId) { debug!(%role, %id, "deleted"); }

  fn on_error(&self, role: Role, err: &Error) { error!(%role, "{err}"); }
}

pub fn format_notice(notice: &Notice) -> String {
  let tag = match notice.level {
    Level::Success => "ok",
    Level::Info => "info",
    Level::Warning => "warning",
    Level::Error => "error",
  };
  format!("[{tag}] {}", notice.message)
}

/// One line per record: `id  full name`.
pub fn format_row(record: &PersonRecord) -> String {
  let id = record.id.as_ref().map(EntityId::as_str).unwrap_or("-");
  format!("{id:>6}  {}", record.base.full_name())
}

pub fn format_detail(detail: &PersonDetail) -> String {
  let record = &detail.record;
  let mut out = String::new();
  let line = |out: &mut String, label: &str, value: &str| {
    if !value.is_empty() {
      let _ = writeln!(out, "{label:<14}{value}");
    }
  };

  line(&mut out, "Role", record.role().as_ref());
  line(&mut out, "Id", record.id.as_ref().map(EntityId::as_str).unwrap_or_default());
  line(&mut out, "Name", &record.base.full_name());
  let birth = record.base.birth_date.map(|d| d.to_string()).unwrap_or_default();
  line(&mut out, "Birth date", &birth);

  if let Some(contact) = record.details.contact() {
    line(&mut out, "Email", &contact.email);
    line(&mut out, "Phone", &contact.phone);
    line(
      &mut out,
      "Address",
      contact.address_id.as_ref().map(EntityId::as_str).unwrap_or_default(),
    );
  }
  match &record.details {
    RoleDetails::Teacher { subject_id, .. } => {
      line(&mut out, "Subject", subject_id.as_ref().map(EntityId::as_str).unwrap_or_default());
    }
    RoleDetails::Student { parent_id, .. } => {
      line(&mut out, "Parent", parent_id.as_ref().map(EntityId::as_str).unwrap_or_default());
    }
    _ => {}
  }

  line(&mut out, "Schedule", &dependent(&detail.schedule));
  line(&mut out, "Course", &dependent(&detail.course));
  out
}

fn dependent<T: Labeled>(value: &Dependent<T>) -> String {
  match value {
    Dependent::NotApplicable => String::new(),
    Dependent::Loaded(t) => t.label(),
    Dependent::Unavailable(_) => "(unavailable)".into(),
  }
}

pub fn format_errors(errors: &ErrorMap) -> String {
  errors
    .iter()
    .map(|(field, message)| format!("  {field}: {message}"))
    .collect::<Vec<_>>()
    .join("\n")
}
