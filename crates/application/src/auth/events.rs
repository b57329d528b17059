//! Auth event bus.
//!
//! Lets session observers react to login, logout and refresh without the
//! components that change the session knowing about them.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use docflow_domain::AuthEvent;
use parking_lot::Mutex;

type Listener = Arc<dyn Fn() + Send + Sync>;

struct Registration {
    id: u64,
    event: AuthEvent,
    listener: Listener,
}

type Registry = Mutex<Vec<Registration>>;

/// Publish/subscribe channel for [`AuthEvent`]s.
#[derive(Default)]
pub struct AuthEventBus {
    next_id: AtomicU64,
    listeners: Arc<Registry>,
}

impl AuthEventBus {
    /// Creates a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event`.
    ///
    /// The listener stays registered until [`Subscription::unsubscribe`] is
    /// called; dropping the handle does not remove it.
    pub fn on<F>(&self, event: AuthEvent, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(Registration {
            id,
            event,
            listener: Arc::new(listener),
        });
        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Calls every listener registered for `event`, in registration order.
    ///
    /// Listeners run outside the internal lock, so they may subscribe or
    /// unsubscribe. A panicking listener is logged and skipped.
    pub fn emit(&self, event: AuthEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|registration| registration.event == event)
            .map(|registration| Arc::clone(&registration.listener))
            .collect();

        tracing::debug!(%event, listeners = listeners.len(), "emitting auth event");

        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                tracing::error!(%event, "auth event listener panicked");
            }
        }
    }

    /// Number of listeners currently registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: AuthEvent) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|registration| registration.event == event)
            .count()
    }
}

impl fmt::Debug for AuthEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthEventBus")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

/// Handle returned by [`AuthEventBus::on`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Removes exactly the listener this handle was created for.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().retain(|registration| registration.id != self.id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    fn counter(bus: &AuthEventBus, event: AuthEvent) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let subscription = bus.on(event, move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, subscription)
    }

    #[test]
    fn test_emit_only_reaches_matching_listeners() {
        let bus = AuthEventBus::new();
        let (logins, _login) = counter(&bus, AuthEvent::Login);
        let (logouts, _logout) = counter(&bus, AuthEvent::Logout);

        bus.emit(AuthEvent::Login);

        assert_eq!(logins.load(Ordering::SeqCst), 1);
        assert_eq!(logouts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus = AuthEventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.on(AuthEvent::Refresh, move || order.lock().push(name));
        }

        bus.emit(AuthEvent::Refresh);

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_listener() {
        let bus = AuthEventBus::new();
        let (first, first_sub) = counter(&bus, AuthEvent::Logout);
        let (second, _second_sub) = counter(&bus, AuthEvent::Logout);

        first_sub.unsubscribe();
        bus.emit(AuthEvent::Logout);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(AuthEvent::Logout), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let bus = AuthEventBus::new();
        bus.on(AuthEvent::Login, || panic!("listener failure"));
        let (after, _sub) = counter(&bus, AuthEvent::Login);

        bus.emit(AuthEvent::Login);

        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_emit() {
        let bus = Arc::new(AuthEventBus::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner_slot = Arc::clone(&slot);
        let subscription = bus.on(AuthEvent::Refresh, move || {
            if let Some(subscription) = inner_slot.lock().take() {
                subscription.unsubscribe();
            }
        });
        *slot.lock() = Some(subscription);

        bus.emit(AuthEvent::Refresh);

        assert_eq!(bus.listener_count(AuthEvent::Refresh), 0);
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped_is_noop() {
        let bus = AuthEventBus::new();
        let (_count, subscription) = counter(&bus, AuthEvent::Login);
        drop(bus);
        subscription.unsubscribe();
    }
}
