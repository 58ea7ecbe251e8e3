use std::fmt;

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Synchronous "feats changed" listeners. Callbacks run in registration
/// order on the mutating thread and carry no payload.
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: u64,
    listeners: Vec<(ListenerId, Box<dyn FnMut()>)>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut() + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` when `id` was not (or no longer) registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::ChangeNotifier;

    #[test]
    fn notifies_until_unsubscribed() {
        let calls = Rc::new(Cell::new(0));
        let mut notifier = ChangeNotifier::new();
        let counter = Rc::clone(&calls);
        let id = notifier.subscribe(move || counter.set(counter.get() + 1));

        notifier.notify();
        notifier.notify();
        assert_eq!(calls.get(), 2);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify();
        assert_eq!(calls.get(), 2);
        assert!(notifier.is_empty());
    }

    #[test]
    fn ids_are_not_reused() {
        let mut notifier = ChangeNotifier::new();
        let first = notifier.subscribe(|| {});
        assert!(notifier.unsubscribe(first));
        let second = notifier.subscribe(|| {});
        assert_ne!(first, second);
        assert_eq!(notifier.len(), 1);
    }
}
