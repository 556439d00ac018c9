//! Subscriber registry: message-type tag (or wildcard) to callback set.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::warn;

use crate::message::{Message, MessageKind};

/// Tag that subscribes to every inbound message.
pub const WILDCARD: &str = "*";

type Callback = Arc<dyn Fn(&Message) + Send + Sync>;

/// What a subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every message, regardless of type.
    All,
    Kind(MessageKind),
}

impl From<&str> for Topic {
    fn from(tag: &str) -> Self {
        if tag == WILDCARD {
            Topic::All
        } else {
            Topic::Kind(MessageKind::from(tag))
        }
    }
}

impl From<String> for Topic {
    fn from(tag: String) -> Self {
        if tag == WILDCARD {
            Topic::All
        } else {
            Topic::Kind(MessageKind::from(tag))
        }
    }
}

impl From<MessageKind> for Topic {
    fn from(kind: MessageKind) -> Self {
        Topic::Kind(kind)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::All => f.write_str(WILDCARD),
            Topic::Kind(kind) => f.write_str(kind.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Mapping of topic to the callbacks registered for it.
///
/// Callbacks are never invoked while the internal lock is held, so a
/// callback may subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    topics: Mutex<HashMap<Topic, HashMap<SubscriptionId, Callback>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<Topic, HashMap<SubscriptionId, Callback>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add<F>(&self, topic: Topic, callback: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.topics()
            .entry(topic)
            .or_default()
            .insert(id, Arc::new(callback));
        id
    }

    /// Remove one registration. Returns `false` if it was already gone.
    pub fn remove(&self, topic: &Topic, id: SubscriptionId) -> bool {
        let mut topics = self.topics();
        let Some(callbacks) = topics.get_mut(topic) else {
            return false;
        };
        let removed = callbacks.remove(&id).is_some();
        if callbacks.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    pub fn clear(&self) {
        self.topics().clear();
    }

    /// Total number of registrations across all topics.
    pub fn len(&self) -> usize {
        self.topics().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Callbacks for `kind`: exact-type registrations first, then wildcard.
    fn callbacks_for(&self, kind: &MessageKind) -> Vec<Callback> {
        let topics = self.topics();
        let exact = topics.get(&Topic::Kind(kind.clone()));
        let wildcard = topics.get(&Topic::All);
        exact
            .into_iter()
            .chain(wildcard)
            .flat_map(|callbacks| callbacks.values().cloned())
            .collect()
    }

    /// Deliver `message` to every interested callback.
    ///
    /// A panicking callback is logged and skipped; the rest still run.
    /// Returns the number of callbacks that completed normally.
    pub fn dispatch(&self, message: &Message) -> usize {
        let mut delivered = 0;
        for callback in self.callbacks_for(message.kind()) {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(message))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    warn!(kind = %message.kind(), "Subscriber panicked while handling message");
                }
            }
        }
        delivered
    }
}

// ---------------------------------------------------------------------------
// Subscription handle
// ---------------------------------------------------------------------------

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the registration alive; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    registry: Weak<SubscriberRegistry>,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, topic: Topic, registry: &Arc<SubscriberRegistry>) -> Self {
        Self {
            id,
            topic,
            registry: Arc::downgrade(registry),
            active: AtomicBool::new(true),
        }
    }

    /// Remove exactly this registration. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.topic, self.id);
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("active", &self.active.load(Ordering::Acquire))
            .finish()
    }
}
