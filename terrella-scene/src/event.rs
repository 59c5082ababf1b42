use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler<E> = Box<dyn FnMut(&E) + Send + Sync>;

struct Subscription<E> {
    id: HandlerId,
    priority: i32,
    handler: Handler<E>,
}

/// Multi-subscriber notification channel. Higher priority handlers run first;
/// handlers of equal priority run in subscription order.
pub struct EventBus<E> {
    subscriptions: Vec<Subscription<E>>,
    next_id: u64,
}
impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 0,
        }
    }
}
impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.subscriptions.len())
            .finish()
    }
}
impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn on(&mut self, handler: impl FnMut(&E) + Send + Sync + 'static) -> HandlerId {
        self.on_with_priority(0, handler)
    }
    pub fn on_with_priority(
        &mut self,
        priority: i32,
        handler: impl FnMut(&E) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        let position = self
            .subscriptions
            .iter()
            .position(|s| s.priority < priority)
            .unwrap_or(self.subscriptions.len());
        self.subscriptions.insert(
            position,
            Subscription {
                id,
                priority,
                handler: Box::new(handler),
            },
        );
        id
    }
    /// Returns whether a handler was removed.
    pub fn off(&mut self, id: HandlerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        return self.subscriptions.len() != before;
    }
    pub fn dispatch(&mut self, event: &E) {
        for subscription in self.subscriptions.iter_mut() {
            (subscription.handler)(event);
        }
    }
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
