//! Single-threaded broadcast channel.
//!
//! Each subscriber owns its queue; the channel keeps only weak references,
//! so dropping a [`Subscription`] disconnects it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

type Queue<E> = RefCell<VecDeque<E>>;

pub struct Channel<E: Clone> {
    subscribers: RefCell<Vec<Weak<Queue<E>>>>,
}

impl<E: Clone> Default for Channel<E> {
    fn default() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }
}

impl<E: Clone> std::fmt::Debug for Channel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<E: Clone> Channel<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<E> {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.borrow_mut().push(Rc::downgrade(&queue));
        Subscription { queue }
    }

    /// Delivers a copy of `event` to every live subscriber and returns how
    /// many received it.
    pub fn publish(&self, event: E) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|w| w.strong_count() > 0);
        let mut delivered = 0;
        for queue in subscribers.iter().filter_map(Weak::upgrade) {
            queue.borrow_mut().push_back(event.clone());
            delivered += 1;
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

/// Receiving end of a [`Channel`]. Events queue up until drained.
#[derive(Debug)]
pub struct Subscription<E> {
    queue: Rc<Queue<E>>,
}

impl<E> Subscription<E> {
    pub fn drain(&self) -> Vec<E> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn try_recv(&self) -> Option<E> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}
