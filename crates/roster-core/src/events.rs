//! Scoped event subscriptions.
//!
//! A [`Listeners`] registry hands out [`Subscription`] guards. Dropping the
//! guard unregisters the handler, so a listener can never outlive the
//! component that installed it.

use std::sync::{Arc, Mutex, Weak};

type Handler<E> = Box<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
  next_id:  u64,
  handlers: Vec<(u64, Handler<E>)>,
}

/// A set of handlers for events of type `E`.
pub struct Listeners<E> {
  inner: Arc<Mutex<Registry<E>>>,
}

impl<E> Default for Listeners<E> {
  fn default() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Registry {
        next_id:  0,
        handlers: Vec::new(),
      })),
    }
  }
}

impl<E: 'static> Listeners<E> {
  pub fn new() -> Self { Self::default() }

  /// Register `handler`; it stays registered until the returned guard drops.
  #[must_use = "dropping the subscription unregisters the handler immediately"]
  pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
    let mut registry = self.inner.lock().unwrap_or_else(|p| p.into_inner());
    let id = registry.next_id;
    registry.next_id += 1;
    registry.handlers.push((id, Box::new(handler)));

    let weak: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.inner);
    Subscription {
      release: Some(Box::new(move || {
        if let Some(inner) = weak.upgrade() {
          let mut registry = inner.lock().unwrap_or_else(|p| p.into_inner());
          registry.handlers.retain(|(h, _)| *h != id);
        }
      })),
    }
  }

  /// Deliver `event` to every live handler, in subscription order.
  pub fn emit(&self, event: &E) {
    let registry = self.inner.lock().unwrap_or_else(|p| p.into_inner());
    for (_, handler) in &registry.handlers {
      handler(event);
    }
  }

  pub fn len(&self) -> usize {
    self
      .inner
      .lock()
      .unwrap_or_else(|p| p.into_inner())
      .handlers
      .len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl<E: 'static> std::fmt::Debug for Listeners<E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Listeners").field("len", &self.len()).finish()
  }
}

/// Guard for one registered handler.
pub struct Subscription {
  release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription").finish_non_exhaustive()
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(release) = self.release.take() {
      release();
    }
  }
}

/// Window-level UI events a dialog may care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
  EscapeKey,
  OverlayClick,
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[test]
  fn dropping_the_guard_unsubscribes() {
    let bus = Listeners::<UiEvent>::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let sub = bus.subscribe(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
    });
    bus.emit(&UiEvent::EscapeKey);
    assert_eq!(bus.len(), 1);

    drop(sub);
    bus.emit(&UiEvent::EscapeKey);
    assert!(bus.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn guard_outliving_the_registry_is_harmless() {
    let bus = Listeners::<UiEvent>::new();
    let sub = bus.subscribe(|_| {});
    drop(bus);
    drop(sub);
  }
}
