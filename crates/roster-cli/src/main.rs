//! `roster`, the command-line front-end for the school administration backend.
//!
//! # Usage
//!
//! ```
//! roster list teacher
//! roster show student 14
//! roster create parent --set given_names="Rosa" --set birth_date=1980-01-02 ...
//! roster update teacher 7 --set phone=71234567
//! roster delete psychologist 3 --yes
//! roster address "Centro" "Av. X" 100
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use roster_cli::{
  HttpBackend, Settings,
  console::{ConsoleHooks, format_detail, format_errors, format_notice, format_row},
};
use roster_core::{
  Error,
  address::{CreateAddressOutcome, lookup_or_create},
  dispatch::{Confirmation, Orchestrator},
  field::Field,
  form::PersonForm,
  hooks::Notice,
  id::EntityId,
  person::Role,
  reference::NewAddress,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

type Console = Orchestrator<HttpBackend, ConsoleHooks>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "School administration console")]
struct Cli {
  /// Path to the TOML settings file.
  #[arg(short, long, default_value = "roster.toml")]
  config: PathBuf,

  /// Base URL of the backend (overrides the settings file).
  #[arg(long, env = "ROSTER_URL")]
  url: Option<String>,

  /// Bearer token for the backend.
  #[arg(long, env = "ROSTER_TOKEN")]
  token: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List every record of a role.
  List { role: Role },

  /// Show one record, following its schedule or course.
  Show { role: Role, id: EntityId },

  /// Create a record from `field=value` pairs.
  Create {
    role: Role,
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    values: Vec<(Field, String)>,
  },

  /// Edit a record. Unset fields keep their stored values; a blank
  /// password keeps the stored one.
  Update {
    role: Role,
    id: EntityId,
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    values: Vec<(Field, String)>,
  },

  /// Delete a record.
  Delete {
    role: Role,
    id: EntityId,
    /// Confirm the deletion.
    #[arg(long)]
    yes: bool,
  },

  /// Validate `field=value` pairs locally without contacting the backend.
  Validate {
    role: Role,
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    values: Vec<(Field, String)>,
  },

  /// Find or create an address and print its id.
  Address {
    zone: String,
    street: String,
    door_number: String,
  },
}

fn parse_assignment(raw: &str) -> Result<(Field, String), String> {
  let (field, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected FIELD=VALUE, got `{raw}`"))?;
  let field = field
    .trim()
    .parse::<Field>()
    .map_err(|_| format!("unknown field `{}`", field.trim()))?;
  Ok((field, value.to_owned()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)?.with_overrides(cli.url, cli.token);
  tracing::debug!(root = %settings.api_root(), "settings loaded");

  let backend = HttpBackend::new(&settings)?;
  let console: Console = Orchestrator::new(Arc::new(backend), Arc::new(ConsoleHooks));
  let today = chrono::Local::now().date_naive();

  match cli.command {
    Command::List { role } => {
      for record in console.dispatch(role).list().await? {
        println!("{}", format_row(&record));
      }
    }
    Command::Show { role, id } => {
      let detail = console.dispatch(role).fetch_detail(&id).await?;
      print!("{}", format_detail(&detail));
    }
    Command::Create { role, values } => {
      let mut form = PersonForm::new(role, today);
      form.mount(&console).await;
      apply(&mut form, values);
      let created = submit(&mut form, &console).await?;
      println!("{}", created.id.map(|id| id.to_string()).unwrap_or_default());
    }
    Command::Update { role, id, values } => {
      let mut form = PersonForm::editing(role, id, today);
      form.mount(&console).await;
      form
        .load_existing(&console)
        .await
        .context("failed to load the record")?;
      apply(&mut form, values);
      submit(&mut form, &console).await?;
    }
    Command::Delete { role, id, yes } => {
      if !yes {
        bail!("refusing to delete {role} {id} without --yes");
      }
      console
        .dispatch(role)
        .delete(&id, Confirmation::granted())
        .await?;
    }
    Command::Validate { role, values } => {
      let mut form = PersonForm::new(role, today);
      apply(&mut form, values);
      let errors = form.validate();
      if errors.is_empty() {
        println!("ok");
      } else {
        println!("{}", serde_json::to_string_pretty(errors)?);
        bail!("{} field(s) invalid", errors.len());
      }
    }
    Command::Address {
      zone,
      street,
      door_number,
    } => {
      let input = NewAddress {
        zone,
        street,
        door_number,
      };
      match lookup_or_create(console.backend(), &input).await {
        CreateAddressOutcome::Created(a) => {
          eprintln!("{}", format_notice(&Notice::success("Address created.")));
          println!("{}", a.id);
        }
        CreateAddressOutcome::AlreadyExists(a) => {
          eprintln!("{}", format_notice(&Notice::info("Address already existed.")));
          println!("{}", a.id);
        }
        CreateAddressOutcome::Failed(e) => return Err(e.into()),
      }
    }
  }

  Ok(())
}

fn apply(form: &mut PersonForm, values: Vec<(Field, String)>) {
  for (field, value) in values {
    form.set(field, value);
  }
}

async fn submit(
  form: &mut PersonForm,
  console: &Console,
) -> anyhow::Result<roster_core::person::PersonRecord> {
  match form.submit(console).await {
    Err(Error::InvalidRecord(errors)) => {
      eprintln!("{}", format_errors(&errors));
      bail!("{}", Error::InvalidRecord(errors).user_message());
    }
    other => Ok(other?),
  }
}
