//! Typed publish/subscribe registry for inbound events.
//!
//! ## Design
//! - Handlers are `Rc<dyn Fn(&ServerEvent)>`; identity is the `Rc` pointer.
//!   Callers must keep the exact [`Handler`] they subscribed to remove it later.
//!   A closure rebuilt with the same body is a different handler.
//! - Fan-out is synchronous, in subscription order, over a snapshot of the
//!   list taken before the first call. Handlers may subscribe or unsubscribe
//!   during dispatch; the change applies from the next dispatch.
//! - The registry lives on one thread (the engine's event loop), so interior
//!   mutability is a `RefCell` rather than a lock.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::protocol::{EventKind, ServerEvent};

/// A subscriber callback. Clone it to keep a reference for [`Dispatcher::unsubscribe`].
pub type Handler = Rc<dyn Fn(&ServerEvent)>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&ServerEvent) + 'static,
{
    Rc::new(f)
}

#[derive(Default)]
pub struct Dispatcher {
    listeners: RefCell<HashMap<EventKind, Vec<Handler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `kind`. Duplicates are allowed and
    /// are each invoked.
    pub fn subscribe(&self, kind: EventKind, handler: &Handler) {
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(Rc::clone(handler));
    }

    /// Remove every registration of `handler` for `kind`.
    ///
    /// Returns `false` (and logs a warning) when nothing matched, which
    /// almost always means the caller passed a fresh closure instead of the
    /// one it subscribed.
    pub fn unsubscribe(&self, kind: EventKind, handler: &Handler) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let removed = match listeners.get_mut(&kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|h| !Rc::ptr_eq(h, handler));
                before - list.len()
            }
            None => 0,
        };
        if removed == 0 {
            warn!(event = %kind, "unsubscribe matched no registered handler");
        }
        removed > 0
    }

    /// Invoke every handler registered for the event's kind. Returns how many ran.
    pub fn dispatch(&self, event: &ServerEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Handler> = match self.listeners.borrow().get(&kind) {
            Some(list) => list.clone(),
            None => Vec::new(),
        };
        trace!(event = %kind, handlers = snapshot.len(), "dispatch");
        for h in &snapshot {
            h(event);
        }
        snapshot.len()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.listeners.borrow().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventKind, usize> = self
            .listeners
            .borrow()
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect();
        f.debug_struct("Dispatcher").field("listeners", &counts).finish()
    }
}
