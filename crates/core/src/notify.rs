use crate::events::PropertyChanged;

/// Handle returned by [`ChangeNotifier::subscribe`]; pass it back to
/// [`ChangeNotifier::unsubscribe`] to stop receiving notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&PropertyChanged)>;

/// Synchronous property-changed fan-out for UI bindings.
///
/// Observers run in subscription order, on the caller's thread, before
/// [`notify`](ChangeNotifier::notify) returns.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: Vec<(ObserverId, Observer)>,
    next_id: u64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&PropertyChanged) + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns `false` if the observer was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn notify(&mut self, event: PropertyChanged) {
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_notify_and_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut notifier = ChangeNotifier::new();

        let sink = Rc::clone(&seen);
        let id = notifier.subscribe(move |e| sink.borrow_mut().push(e.property.clone()));
        notifier.notify(PropertyChanged::new(None, "period"));

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(PropertyChanged::new(None, "source"));

        assert_eq!(*seen.borrow(), vec!["period".to_string()]);
        assert_eq!(notifier.observer_count(), 0);
    }
}
