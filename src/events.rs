//! In-process publish/subscribe bus decoupling link mutations from rendering.
//!
//! Handlers run synchronously on the publishing task, durable handlers first
//! in subscription order, then the one-shot handlers registered for the topic.
//! A handler that fails or panics is logged and skipped; it never reaches the
//! publisher or the remaining handlers.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{error, warn};

use crate::error::ErrorKind;
use crate::models::Link;
use crate::ui::focus::FocusTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Added,
    Updated,
    Deleted,
    AllLoaded,
    FavoritesLoaded,
    LoadingStarted,
    LoadingEnded,
    Error,
    Success,
    LinkSelected,
    FormDirtyChanged,
    ModalOpened,
    ModalClosed,
}

/// The entity operation an event relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Update,
    Delete,
    ToggleFavorite,
    LoadAll,
    LoadFavorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadingScope {
    pub operation: Operation,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    pub operation: Operation,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessNotice {
    pub operation: Operation,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Added(Link),
    Updated(Link),
    Deleted { id: i64 },
    AllLoaded(Vec<Link>),
    FavoritesLoaded(Vec<Link>),
    LoadingStarted(LoadingScope),
    LoadingEnded(LoadingScope),
    Error(ErrorNotice),
    Success(SuccessNotice),
    LinkSelected {
        link_id: Option<i64>,
        previous_id: Option<i64>,
    },
    FormDirtyChanged { is_dirty: bool },
    ModalOpened { focus_element: FocusTarget },
    ModalClosed { previous_focused_element: FocusTarget },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Added(_) => Topic::Added,
            Event::Updated(_) => Topic::Updated,
            Event::Deleted { .. } => Topic::Deleted,
            Event::AllLoaded(_) => Topic::AllLoaded,
            Event::FavoritesLoaded(_) => Topic::FavoritesLoaded,
            Event::LoadingStarted(_) => Topic::LoadingStarted,
            Event::LoadingEnded(_) => Topic::LoadingEnded,
            Event::Error(_) => Topic::Error,
            Event::Success(_) => Topic::Success,
            Event::LinkSelected { .. } => Topic::LinkSelected,
            Event::FormDirtyChanged { .. } => Topic::FormDirtyChanged,
            Event::ModalOpened { .. } => Topic::ModalOpened,
            Event::ModalClosed { .. } => Topic::ModalClosed,
        }
    }
}

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Arc<dyn Fn(&Event) -> HandlerResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    handler: Handler,
}

#[derive(Default)]
struct Handlers {
    durable: Vec<Registration>,
    once: Vec<Registration>,
}

#[derive(Default)]
pub struct EventBus {
    topics: Mutex<HashMap<Topic, Handlers>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<Topic, Handlers>> {
        // Handlers never run under the lock, so poisoning carries no torn state.
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, topic: Topic, handler: Handler, once: bool) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut topics = self.topics();
        let handlers = topics.entry(topic).or_default();
        let registration = Registration { id, handler };
        if once {
            handlers.once.push(registration);
        } else {
            handlers.durable.push(registration);
        }
        id
    }

    /// Registers a handler invoked on every publish of `topic`.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(topic, Arc::new(handler), false)
    }

    /// Registers a handler invoked on the next publish of `topic` only.
    pub fn once<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(topic, Arc::new(handler), true)
    }

    /// Returns whether a handler was removed.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) -> bool {
        let mut topics = self.topics();
        let Some(handlers) = topics.get_mut(&topic) else {
            return false;
        };
        let before = handlers.durable.len() + handlers.once.len();
        handlers.durable.retain(|r| r.id != id);
        handlers.once.retain(|r| r.id != id);
        before != handlers.durable.len() + handlers.once.len()
    }

    /// Delivers `event` to the handlers of its topic and returns how many ran
    /// to completion.
    pub fn publish(&self, event: Event) -> usize {
        let topic = event.topic();
        let (durable, once): (Vec<Handler>, Vec<Handler>) = {
            let mut topics = self.topics();
            match topics.get_mut(&topic) {
                Some(handlers) => (
                    handlers.durable.iter().map(|r| r.handler.clone()).collect(),
                    std::mem::take(&mut handlers.once)
                        .into_iter()
                        .map(|r| r.handler)
                        .collect(),
                ),
                None => return 0,
            }
        };

        durable
            .iter()
            .chain(once.iter())
            .filter(|handler| invoke(topic, handler, &event))
            .count()
    }

    /// Removes every handler for `topic`, or for all topics when `None`.
    pub fn clear(&self, topic: Option<Topic>) {
        let mut topics = self.topics();
        match topic {
            Some(topic) => {
                topics.remove(&topic);
            }
            None => topics.clear(),
        }
    }

    pub fn handler_count(&self, topic: Topic) -> usize {
        self.topics()
            .get(&topic)
            .map(|h| h.durable.len() + h.once.len())
            .unwrap_or(0)
    }
}

fn invoke(topic: Topic, handler: &Handler, event: &Event) -> bool {
    match catch_unwind(AssertUnwindSafe(|| handler(event))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(?topic, "Event handler failed: {}", e);
            false
        }
        Err(_) => {
            error!(?topic, "Event handler panicked");
            false
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let topics = self.topics();
        f.debug_struct("EventBus")
            .field("topics", &topics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus, topic: Topic, label: &'static str, log: &Arc<Mutex<Vec<String>>>) {
        let log = log.clone();
        bus.subscribe(topic, move |_| {
            log.lock().unwrap().push(label.to_string());
            Ok(())
        });
    }

    fn dirty(is_dirty: bool) -> Event {
        Event::FormDirtyChanged { is_dirty }
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, Topic::FormDirtyChanged, "first", &log);
        recorder(&bus, Topic::FormDirtyChanged, "second", &log);
        recorder(&bus, Topic::FormDirtyChanged, "third", &log);

        assert_eq!(bus.publish(dirty(true)), 3);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_once_handlers_run_after_durable_and_only_once() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let once_log = log.clone();
        bus.once(Topic::FormDirtyChanged, move |_| {
            once_log.lock().unwrap().push("once".to_string());
            Ok(())
        });
        recorder(&bus, Topic::FormDirtyChanged, "durable", &log);

        bus.publish(dirty(true));
        bus.publish(dirty(false));

        assert_eq!(*log.lock().unwrap(), vec!["durable", "once", "durable"]);
        assert_eq!(bus.handler_count(Topic::FormDirtyChanged), 1);
    }

    #[test]
    fn test_failing_handlers_are_isolated() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(Topic::Success, |_| Err("boom".into()));
        bus.subscribe(Topic::Success, |_| panic!("handler panic"));
        recorder(&bus, Topic::Success, "survivor", &log);

        let ran = bus.publish(Event::Success(SuccessNotice {
            operation: Operation::Add,
            message: "ok",
        }));

        assert_eq!(ran, 1);
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handler_log = log.clone();
        let id = bus.subscribe(Topic::Deleted, move |event| {
            if let Event::Deleted { id } = event {
                handler_log.lock().unwrap().push(id.to_string());
            }
            Ok(())
        });

        bus.publish(Event::Deleted { id: 1 });
        assert!(bus.unsubscribe(Topic::Deleted, id));
        assert!(!bus.unsubscribe(Topic::Deleted, id));
        bus.publish(Event::Deleted { id: 2 });

        assert_eq!(*log.lock().unwrap(), vec!["1"]);
    }

    #[test]
    fn test_topics_are_independent() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, Topic::ModalOpened, "opened", &log);

        assert_eq!(bus.publish(dirty(true)), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new();
        bus.subscribe(Topic::Added, |_| Ok(()));
        bus.subscribe(Topic::Updated, |_| Ok(()));
        bus.once(Topic::Updated, |_| Ok(()));

        bus.clear(Some(Topic::Updated));
        assert_eq!(bus.handler_count(Topic::Updated), 0);
        assert_eq!(bus.handler_count(Topic::Added), 1);

        bus.clear(None);
        assert_eq!(bus.handler_count(Topic::Added), 0);
    }

    #[test]
    fn test_handler_may_publish_reentrantly() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, Topic::Success, "nested", &log);

        let inner = Arc::downgrade(&bus);
        bus.subscribe(Topic::FormDirtyChanged, move |_| {
            if let Some(bus) = inner.upgrade() {
                bus.publish(Event::Success(SuccessNotice {
                    operation: Operation::Update,
                    message: "nested",
                }));
            }
            Ok(())
        });

        bus.publish(dirty(true));
        assert_eq!(*log.lock().unwrap(), vec!["nested"]);
    }
}
