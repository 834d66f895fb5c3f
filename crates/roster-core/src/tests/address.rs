use super::fake::{Call, FakeBackend, addresses, orchestrator, today};
use crate::{
  address::DialogState,
  backend::Resource,
  events::UiEvent,
  field::Field,
  form::{AddressChoice, PersonForm},
  hooks::Level,
  id::EntityId,
  person::Role,
  reference::NewAddress,
};

fn centro() -> NewAddress {
  NewAddress {
    zone:        "Centro".into(),
    street:      "Av. X".into(),
    door_number: "100".into(),
  }
}

async fn parent_form(backend: FakeBackend) -> (PersonForm, super::fake::TestOrchestrator) {
  let (orch, _, _) = orchestrator(backend);
  let mut form = PersonForm::new(Role::Parent, today());
  form.mount(&orch).await;
  (form, orch)
}

#[tokio::test]
async fn creating_the_same_address_twice_selects_one_entity() {
  let (orch, backend, hooks) = orchestrator(FakeBackend::new().with(Resource::Addresses, addresses()));
  let mut form = PersonForm::new(Role::Parent, today());
  form.mount(&orch).await;
  assert_eq!(form.references().addresses.len(), 1);

  form.choose_address(AddressChoice::CreateNew);
  form.address_dialog_mut().draft = centro();
  form.submit_address(&orch).await;
  let first = form.values().get(Field::AddressId).to_owned();
  assert!(!first.is_empty());
  assert!(!form.address_dialog().is_open());

  // Same triple again, with stray whitespace.
  form.choose_address(AddressChoice::CreateNew);
  form.address_dialog_mut().draft = NewAddress {
    zone: " Centro ".into(),
    ..centro()
  };
  form.submit_address(&orch).await;

  assert_eq!(form.values().get(Field::AddressId), first);
  assert!(!form.address_dialog().is_open());
  let matching = form
    .references()
    .addresses
    .iter()
    .filter(|a| a.id == EntityId::from(first.as_str()))
    .count();
  assert_eq!(matching, 1);
  assert_eq!(form.references().addresses.len(), 2);
  assert_eq!(form.references().addresses[0].zone, "Centro");

  assert_eq!(hooks.levels(), vec![Level::Success, Level::Info]);
  assert_eq!(backend.items(Resource::Addresses).len(), 2);
  let writes = backend.writes();
  let Call::Create(_, body) = &writes[1] else {
    panic!("expected an address create");
  };
  assert_eq!(body["zone"], "Centro");
}

#[tokio::test]
async fn failed_create_reopens_the_dialog_with_the_draft() {
  let backend = FakeBackend::new().failing_create(500, Some("database unavailable"));
  let (mut form, orch) = parent_form(backend).await;

  form.choose_address(AddressChoice::CreateNew);
  form.address_dialog_mut().draft = centro();
  form.submit_address(&orch).await;

  let DialogState::Open { error: Some(message) } = form.address_dialog().state() else {
    panic!("dialog should be open with an error: {:?}", form.address_dialog().state());
  };
  assert_eq!(message, "database unavailable");
  assert_eq!(form.address_dialog().draft.street, "Av. X");
  assert_eq!(form.values().get(Field::AddressId), "");
  assert!(form.references().addresses.is_empty());
}

#[tokio::test]
async fn blank_part_of_the_triple_makes_no_call() {
  let (orch, backend, _) = orchestrator(FakeBackend::new());
  let mut form = PersonForm::new(Role::Administrator, today());

  form.choose_address(AddressChoice::CreateNew);
  form.address_dialog_mut().draft = NewAddress {
    door_number: "  ".into(),
    ..centro()
  };
  form.submit_address(&orch).await;

  assert!(backend.writes().is_empty());
  assert!(matches!(
    form.address_dialog().state(),
    DialogState::Open { error: Some(_) }
  ));
}

#[tokio::test]
async fn create_new_clears_the_current_selection() {
  let (mut form, _) = parent_form(FakeBackend::new().with(Resource::Addresses, addresses())).await;
  form.choose_address(AddressChoice::Existing("5".into()));
  assert_eq!(form.values().get(Field::AddressId), "5");

  form.choose_address(AddressChoice::CreateNew);
  assert_eq!(form.values().get(Field::AddressId), "");
  assert!(form.address_dialog().is_open());
}

#[tokio::test]
async fn escape_and_overlay_dismiss_and_release_the_listener() {
  let (mut form, _) = parent_form(FakeBackend::new()).await;
  assert!(form.events().is_empty());

  form.choose_address(AddressChoice::CreateNew);
  form.address_dialog_mut().draft.zone = "Centro".into();
  assert_eq!(form.events().len(), 1);

  form.handle_ui_event(UiEvent::EscapeKey);
  assert!(!form.address_dialog().is_open());
  assert!(form.events().is_empty());

  form.choose_address(AddressChoice::CreateNew);
  assert_eq!(form.address_dialog().draft, NewAddress::default());
  form.handle_ui_event(UiEvent::OverlayClick);
  assert!(!form.address_dialog().is_open());
  assert!(form.events().is_empty());

  // Nothing is listening any more; further events are inert.
  form.handle_ui_event(UiEvent::EscapeKey);
  assert!(!form.address_dialog().is_open());
}

#[tokio::test]
async fn address_options_keep_the_selection_visible() {
  let (mut form, _) = parent_form(FakeBackend::new().with(Resource::Addresses, addresses())).await;
  assert_eq!(form.address_options("sopo").len(), 1);
  assert!(form.address_options("zzz").is_empty());

  form.choose_address(AddressChoice::Existing("5".into()));
  let shown: Vec<_> = form.address_options("zzz").iter().map(|a| a.id.clone()).collect();
  assert_eq!(shown, [EntityId::from("5")]);
}
