//! The listener table.
//!
//! Every registration (raw listeners, commands, ephemeral waiters) is a
//! [`ListenerEntry`] in one ordered table. Insertion order is match order.
//!
//! Ephemeral waiters carry a oneshot sender instead of a handler. The
//! dispatcher fires the sender on the first match; the waiting call site
//! owns a [`WaiterGuard`] that removes the entry when the wait completes
//! or is abandoned.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, info};
use wren_core::{CommandPattern, Criteria, Event, MatchGroups, Message};

use crate::handler::HandlerRef;

/// Identifies a listener for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an ephemeral waiter receives.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub event: Arc<Event>,
    pub message: Option<Message>,
}

/// Message-level checks applied after the field criteria match.
#[derive(Debug, Clone)]
pub enum Rule {
    /// A command: the normalized text must match `pattern`, and the message
    /// must be direct when `direct` is set.
    Command { pattern: CommandPattern, direct: bool },
    /// A conversation reply: same author, pattern found anywhere in the text.
    Reply {
        user: Option<String>,
        pattern: CommandPattern,
    },
}

impl Rule {
    /// Returns the captured groups when `message` satisfies the rule.
    pub fn check(&self, message: &Message) -> Option<MatchGroups> {
        match self {
            Self::Command { pattern, direct } => {
                if *direct && !message.is_direct {
                    return None;
                }
                pattern.matches(&message.text)
            }
            Self::Reply { user, pattern } => {
                if message.user != *user {
                    debug!(expected = ?user, got = ?message.user, "Heard reply from another user");
                    return None;
                }
                pattern.matches(&message.text)
            }
        }
    }
}

/// What happens when an entry matches.
pub enum Action {
    Handler(HandlerRef),
    Waiter(Mutex<Option<oneshot::Sender<Delivery>>>),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(h) => f.debug_tuple("Handler").field(&h.name()).finish(),
            Self::Waiter(slot) => f
                .debug_tuple("Waiter")
                .field(&if slot.lock().is_some() { "pending" } else { "fired" })
                .finish(),
        }
    }
}

/// One row of the listener table.
#[derive(Debug)]
pub struct ListenerEntry {
    pub id: ListenerId,
    pub criteria: Criteria,
    pub rule: Option<Rule>,
    pub action: Action,
}

impl ListenerEntry {
    /// Fires a waiter. Returns `false` if it had already fired.
    pub fn deliver(&self, delivery: Delivery) -> bool {
        let Action::Waiter(slot) = &self.action else {
            return false;
        };
        match slot.lock().take() {
            Some(tx) => tx.send(delivery).is_ok(),
            None => false,
        }
    }
}

// ============================================================================
// ListenerTable
// ============================================================================

/// Ordered, shared table of listeners.
#[derive(Debug, Default)]
pub struct ListenerTable {
    entries: RwLock<Vec<Arc<ListenerEntry>>>,
    next_id: AtomicU64,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns its id.
    pub fn register(&self, criteria: Criteria, rule: Option<Rule>, action: Action) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match &action {
            Action::Handler(h) => {
                info!(listener = %id, criteria = ?criteria, rule = ?rule, handler = h.name(), "New listener")
            }
            Action::Waiter(_) => debug!(listener = %id, criteria = ?criteria, "New ephemeral listener"),
        }
        self.entries.write().push(Arc::new(ListenerEntry {
            id,
            criteria,
            rule,
            action,
        }));
        id
    }

    /// Registers a one-shot waiter.
    pub fn waiter(
        self: &Arc<Self>,
        criteria: Criteria,
        rule: Option<Rule>,
    ) -> (WaiterGuard, oneshot::Receiver<Delivery>) {
        let (tx, rx) = oneshot::channel();
        let id = self.register(criteria, rule, Action::Waiter(Mutex::new(Some(tx))));
        (
            WaiterGuard {
                table: Arc::clone(self),
                id,
            },
            rx,
        )
    }

    /// Removes an entry. Unknown ids are ignored.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if removed {
            debug!(listener = %id, "Removed listener");
        }
        removed
    }

    /// A point-in-time copy of the table for scanning.
    pub fn snapshot(&self) -> Vec<Arc<ListenerEntry>> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every pending waiter so that its caller wakes with nothing.
    pub fn close_waiters(&self) {
        let mut entries = self.entries.write();
        for entry in entries.iter() {
            if let Action::Waiter(slot) = &entry.action {
                slot.lock().take();
            }
        }
        entries.retain(|e| !matches!(e.action, Action::Waiter(_)));
    }
}

/// Removes its waiter entry when dropped.
#[derive(Debug)]
pub struct WaiterGuard {
    table: Arc<ListenerTable>,
    id: ListenerId,
}

impl WaiterGuard {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use wren_core::Channel;

    async fn noop(_: crate::Context) {}

    fn message(text: &str, user: &str, is_direct: bool) -> Message {
        Message {
            text: text.into(),
            raw_text: text.into(),
            user: Some(user.into()),
            channel: Channel::from_id("C1"),
            is_direct,
            event: Arc::new(Event::new("message").with("text", text)),
            groups: MatchGroups::default(),
        }
    }

    #[test]
    fn test_register_then_remove_restores_table() {
        let table = ListenerTable::new();
        let keep = table.register(
            Criteria::new().field("type", "message"),
            None,
            Action::Handler(handler("keep", noop).build()),
        );
        let before: Vec<_> = table.snapshot().iter().map(|e| e.id).collect();

        let id = table.register(
            Criteria::new().field("type", "ack"),
            None,
            Action::Handler(handler("temp", noop).build()),
        );
        assert_eq!(table.len(), 2);

        assert!(table.remove(id));
        assert!(!table.remove(id));
        let after: Vec<_> = table.snapshot().iter().map(|e| e.id).collect();
        assert_eq!(before, after);
        assert_eq!(after, vec![keep]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_mutation() {
        let table = ListenerTable::new();
        table.register(Criteria::new(), None, Action::Handler(handler("a", noop).build()));
        let snapshot = table.snapshot();
        table.register(Criteria::new(), None, Action::Handler(handler("b", noop).build()));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_waiter_fires_once_and_guard_removes() {
        let table = Arc::new(ListenerTable::new());
        let (guard, rx) = table.waiter(Criteria::new().field("type", "ack"), None);
        let entry = table.snapshot().pop().unwrap();

        let event = Arc::new(Event::new("ack").with("id", 42));
        assert!(entry.deliver(Delivery {
            event: Arc::clone(&event),
            message: None,
        }));
        assert!(!entry.deliver(Delivery {
            event,
            message: None,
        }));

        let delivered = rx.await.unwrap();
        assert_eq!(delivered.event.get("id"), Some(&serde_json::json!(42)));

        drop(guard);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_close_waiters_wakes_with_error() {
        let table = Arc::new(ListenerTable::new());
        let (_guard, rx) = table.waiter(Criteria::new(), None);
        table.close_waiters();
        assert!(rx.await.is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_command_rule() {
        let rule = Rule::Command {
            pattern: CommandPattern::new("hi", true).unwrap(),
            direct: true,
        };
        assert!(rule.check(&message("hi", "U1", true)).is_some());
        assert!(rule.check(&message("hi", "U1", false)).is_none());
        assert!(rule.check(&message("hi there", "U1", true)).is_none());
    }

    #[test]
    fn test_reply_rule_filters_author() {
        let rule = Rule::Reply {
            user: Some("U1".into()),
            pattern: CommandPattern::new("(.*)", false).unwrap(),
        };
        let groups = rule.check(&message("fine thanks", "U1", false)).unwrap();
        assert_eq!(groups.get(1), Some("fine thanks"));
        assert!(rule.check(&message("fine thanks", "U2", false)).is_none());
    }
}
