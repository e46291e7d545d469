use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Interaction categories that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    PointerMove,
    PointerDown,
    Click,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivityKind {
    #[must_use]
    pub const fn all() -> &'static [ActivityKind] {
        &[
            ActivityKind::PointerMove,
            ActivityKind::PointerDown,
            ActivityKind::Click,
            ActivityKind::KeyPress,
            ActivityKind::Scroll,
            ActivityKind::TouchStart,
        ]
    }

    /// DOM event name the kind corresponds to
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ActivityKind::PointerMove => "mousemove",
            ActivityKind::PointerDown => "mousedown",
            ActivityKind::Click => "click",
            ActivityKind::KeyPress => "keypress",
            ActivityKind::Scroll => "scroll",
            ActivityKind::TouchStart => "touchstart",
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown activity kind '{s}'"))
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ActivityHandler = Arc<dyn Fn(ActivityKind) + Send + Sync>;

/// Global input surface activity listeners attach to.
///
/// Handlers are compared by `Arc` identity: adding the same handler twice for
/// one kind is a no-op, and removing a handler that was never added does nothing.
pub trait InputSurface: Send + Sync {
    fn add_listener(&self, kind: ActivityKind, handler: ActivityHandler);
    fn remove_listener(&self, kind: ActivityKind, handler: &ActivityHandler);
}

#[derive(Clone)]
pub struct ListenerRegistration {
    pub kind: ActivityKind,
    pub handler: ActivityHandler,
}

impl std::fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistration").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Bookkeeping for the registrations one monitor put on a surface.
#[derive(Debug, Default)]
pub struct ListenerSet {
    registrations: Vec<ListenerRegistration>,
    has_activity_listeners: bool,
}

impl ListenerSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registrations: Vec::new(),
            has_activity_listeners: false,
        }
    }

    /// Attaches `handler` for every [`ActivityKind`]. Returns `false` if this
    /// set already holds registrations.
    pub fn attach(&mut self, surface: &dyn InputSurface, handler: &ActivityHandler) -> bool {
        if self.has_activity_listeners {
            return false;
        }

        for &kind in ActivityKind::all() {
            surface.add_listener(kind, Arc::clone(handler));
            self.registrations.push(ListenerRegistration {
                kind,
                handler: Arc::clone(handler),
            });
        }
        self.has_activity_listeners = true;
        debug!("Attached {} activity listeners", self.registrations.len());
        true
    }

    /// Removes exactly the registrations added by [`ListenerSet::attach`].
    /// Returns how many were removed; zero on repeated calls.
    pub fn detach(&mut self, surface: &dyn InputSurface) -> usize {
        let removed = self.registrations.len();
        for registration in self.registrations.drain(..) {
            surface.remove_listener(registration.kind, &registration.handler);
        }
        if self.has_activity_listeners {
            debug!("Detached {removed} activity listeners");
        }
        self.has_activity_listeners = false;
        removed
    }

    #[must_use]
    pub const fn has_activity_listeners(&self) -> bool {
        self.has_activity_listeners
    }

    #[must_use]
    pub fn registrations(&self) -> &[ListenerRegistration] {
        &self.registrations
    }
}

/// In-process input surface, standing in for the browser window.
#[derive(Default)]
pub struct EventSurface {
    listeners: Mutex<Vec<ListenerRegistration>>,
}

impl EventSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers one event of `kind` to every listener registered for it.
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, kind: ActivityKind) -> usize {
        // Handlers run outside the lock so they may touch the surface themselves.
        let handlers: Vec<ActivityHandler> = match self.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .filter(|registration| registration.kind == kind)
                .map(|registration| Arc::clone(&registration.handler))
                .collect(),
            Err(_) => return 0,
        };

        trace!("Dispatching {kind} to {} listeners", handlers.len());
        for handler in &handlers {
            handler(kind);
        }
        handlers.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|listeners| listeners.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn listener_count_for(&self, kind: ActivityKind) -> usize {
        self.listeners
            .lock()
            .map(|listeners| listeners.iter().filter(|r| r.kind == kind).count())
            .unwrap_or(0)
    }
}

impl InputSurface for EventSurface {
    fn add_listener(&self, kind: ActivityKind, handler: ActivityHandler) {
        if let Ok(mut listeners) = self.listeners.lock() {
            let duplicate = listeners
                .iter()
                .any(|r| r.kind == kind && Arc::ptr_eq(&r.handler, &handler));
            if !duplicate {
                listeners.push(ListenerRegistration { kind, handler });
            }
        }
    }

    fn remove_listener(&self, kind: ActivityKind, handler: &ActivityHandler) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|r| !(r.kind == kind && Arc::ptr_eq(&r.handler, handler)));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler() -> (ActivityHandler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handler: ActivityHandler = Arc::new(move |_kind| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (handler, count)
    }

    #[test]
    fn test_kind_names_round_trip() {
        assert_eq!("mousemove".parse::<ActivityKind>().unwrap(), ActivityKind::PointerMove);
        assert_eq!("TouchStart".parse::<ActivityKind>().unwrap(), ActivityKind::TouchStart);
        assert!("wheel".parse::<ActivityKind>().is_err());
        assert_eq!(ActivityKind::all().len(), 6);
    }

    #[test]
    fn test_attach_covers_every_kind_once() {
        let surface = EventSurface::new();
        let (handler, count) = counting_handler();
        let mut set = ListenerSet::new();

        assert!(set.attach(&surface, &handler));
        assert!(!set.attach(&surface, &handler));
        assert!(set.has_activity_listeners());
        assert_eq!(surface.listener_count(), ActivityKind::all().len());

        for &kind in ActivityKind::all() {
            assert_eq!(surface.dispatch(kind), 1);
        }
        assert_eq!(count.load(Ordering::SeqCst), ActivityKind::all().len());
    }

    #[test]
    fn test_detach_is_idempotent() {
        let surface = EventSurface::new();
        let (handler, _count) = counting_handler();
        let mut set = ListenerSet::new();
        set.attach(&surface, &handler);

        assert_eq!(set.detach(&surface), ActivityKind::all().len());
        assert_eq!(set.detach(&surface), 0);
        assert!(!set.has_activity_listeners());
        assert_eq!(surface.listener_count(), 0);
    }

    #[test]
    fn test_detach_leaves_foreign_listeners_alone() {
        let surface = EventSurface::new();
        let (ours, _) = counting_handler();
        let (theirs, theirs_count) = counting_handler();
        surface.add_listener(ActivityKind::Click, Arc::clone(&theirs));

        let mut set = ListenerSet::new();
        set.attach(&surface, &ours);
        set.detach(&surface);

        assert_eq!(surface.listener_count(), 1);
        surface.dispatch(ActivityKind::Click);
        assert_eq!(theirs_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_surface_ignores_duplicate_and_unknown_handlers() {
        let surface = EventSurface::new();
        let (handler, _) = counting_handler();
        let (stranger, _) = counting_handler();

        surface.add_listener(ActivityKind::Scroll, Arc::clone(&handler));
        surface.add_listener(ActivityKind::Scroll, Arc::clone(&handler));
        assert_eq!(surface.listener_count_for(ActivityKind::Scroll), 1);

        surface.remove_listener(ActivityKind::Scroll, &stranger);
        assert_eq!(surface.listener_count_for(ActivityKind::Scroll), 1);
    }
}
