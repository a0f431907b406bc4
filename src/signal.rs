//! Subscribe/emit plumbing between collaborators and the orchestrator.
//!
//! A [`Signal`] keeps one mailbox per subscriber. Emitting copies the payload
//! into every open mailbox; the subscriber drains its mailbox when it runs.
//! This keeps event sources free of callbacks into their owners, so there
//! are no reference cycles and no re-entrant borrows.
//!
//! ```ignore
//! let mut ticks = Signal::new();
//! let me = ticks.subscribe();
//! ticks.emit(Tick { elapsed_ms: 16.0, delta_ms: 16.0 });
//! for tick in ticks.drain(me) {
//!     // handle
//! }
//! ticks.unsubscribe(me);
//! ```

/// Handle returned by [`Signal::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A multi-subscriber event queue.
#[derive(Debug)]
pub struct Signal<T> {
    next_id: u64,
    mailboxes: Vec<(ListenerId, Vec<T>)>,
}

impl<T: Clone> Signal<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            mailboxes: Vec::new(),
        }
    }

    /// Open a mailbox. Only payloads emitted after this call are delivered.
    pub fn subscribe(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.mailboxes.push((id, Vec::new()));
        id
    }

    /// Close a mailbox, dropping anything still queued.
    ///
    /// Returns `false` if the listener was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.mailboxes.len();
        self.mailboxes.retain(|(listener, _)| *listener != id);
        self.mailboxes.len() != before
    }

    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.mailboxes.iter().any(|(listener, _)| *listener == id)
    }

    /// Number of open mailboxes.
    pub fn listener_count(&self) -> usize {
        self.mailboxes.len()
    }

    /// Deliver `payload` to every subscriber. Returns how many received it.
    pub fn emit(&mut self, payload: T) -> usize {
        for (_, queue) in &mut self.mailboxes {
            queue.push(payload.clone());
        }
        self.mailboxes.len()
    }

    /// Take everything queued for `id`, oldest first.
    ///
    /// Unknown or unsubscribed listeners get nothing.
    pub fn drain(&mut self, id: ListenerId) -> Vec<T> {
        self.mailboxes
            .iter_mut()
            .find(|(listener, _)| *listener == id)
            .map(|(_, queue)| std::mem::take(queue))
            .unwrap_or_default()
    }
}

impl<T: Clone> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_every_subscriber() {
        let mut signal = Signal::new();
        let a = signal.subscribe();
        let b = signal.subscribe();

        assert_eq!(signal.emit(7u32), 2);
        assert_eq!(signal.drain(a), vec![7]);
        assert_eq!(signal.drain(b), vec![7]);
        assert!(signal.drain(a).is_empty());
    }

    #[test]
    fn test_late_subscriber_misses_earlier_payloads() {
        let mut signal = Signal::new();
        signal.emit(1u32);
        let late = signal.subscribe();
        signal.emit(2);
        assert_eq!(signal.drain(late), vec![2]);
    }

    #[test]
    fn test_unsubscribe_drops_queue() {
        let mut signal = Signal::new();
        let id = signal.subscribe();
        signal.emit(());
        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        assert!(!signal.is_subscribed(id));
        assert!(signal.drain(id).is_empty());
        assert_eq!(signal.emit(()), 0);
    }
}
