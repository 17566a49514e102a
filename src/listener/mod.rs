//! Listener bridge between backend-emitted events and compositor state
//!
//! Backend objects (outputs, damage trackers, surfaces) announce lifecycle and
//! state changes as events. Compositor components subscribe to an
//! `(emitter, signal)` pair and get a callback with mutable access to the
//! context that owns the table. Subscriptions never own the emitter: when the
//! emitter goes away its subscriptions are invalidated, and when the
//! subscriber goes away it deregisters everything it registered, once.
//!
//! Delivery is at most once per subscription per emitted event, in
//! registration order. A callback may remove subscriptions (including its own)
//! while it runs; removed subscriptions are never called again.

use log::trace;
use std::collections::BTreeMap;
use std::fmt;

/// An event that can be routed through a [`ListenerTable`].
pub trait Event {
    /// Identity of the object that emitted the event.
    type Emitter: Copy + Eq + fmt::Debug;
    /// Discriminant used to match subscriptions.
    type Signal: Copy + Eq + fmt::Debug;

    fn emitter(&self) -> Self::Emitter;
    fn signal(&self) -> Self::Signal;
}

/// Callback invoked with the owning context and the event being delivered.
pub type Callback<C, E> = Box<dyn FnMut(&mut C, &E)>;

/// Stable identifier of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

struct Subscription<C, E: Event, S> {
    emitter: E::Emitter,
    signal: E::Signal,
    subscriber: S,
    // `None` while the callback is running.
    callback: Option<Callback<C, E>>,
}

/// Owned table of `(emitter, signal) -> callback` subscriptions.
pub struct ListenerTable<C, E: Event, S> {
    next_id: u64,
    subscriptions: BTreeMap<ListenerId, Subscription<C, E, S>>,
}

impl<C, E: Event, S: Copy + Eq + fmt::Debug> Default for ListenerTable<C, E, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E: Event, S: Copy + Eq + fmt::Debug> ListenerTable<C, E, S> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            subscriptions: BTreeMap::new(),
        }
    }

    /// Register `callback` for `signal` events coming from `emitter`.
    pub fn subscribe<F>(
        &mut self,
        emitter: E::Emitter,
        signal: E::Signal,
        subscriber: S,
        callback: F,
    ) -> ListenerId
    where
        F: FnMut(&mut C, &E) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subscriptions.insert(
            id,
            Subscription {
                emitter,
                signal,
                subscriber,
                callback: Some(Box::new(callback)),
            },
        );
        trace!(
            "listener {:?}: {:?} subscribed to {:?} on {:?}",
            id,
            subscriber,
            signal,
            emitter
        );
        id
    }

    /// Remove a single subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Drop every subscription registered by `subscriber`.
    ///
    /// Returns how many were removed; a second call for the same subscriber
    /// returns 0.
    pub fn remove_subscriber(&mut self, subscriber: S) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|_, s| s.subscriber != subscriber);
        before - self.subscriptions.len()
    }

    /// Invalidate every subscription on `emitter`.
    pub fn remove_emitter(&mut self, emitter: E::Emitter) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|_, s| s.emitter != emitter);
        before - self.subscriptions.len()
    }

    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.subscriptions.contains_key(&id)
    }

    /// Number of live subscriptions held by `subscriber`.
    pub fn count_for(&self, subscriber: S) -> usize {
        self.subscriptions
            .values()
            .filter(|s| s.subscriber == subscriber)
            .count()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    fn matching(&self, emitter: E::Emitter, signal: E::Signal) -> Vec<ListenerId> {
        self.subscriptions
            .iter()
            .filter(|(_, s)| s.emitter == emitter && s.signal == signal)
            .map(|(id, _)| *id)
            .collect()
    }

    fn take(&mut self, id: ListenerId) -> Option<Callback<C, E>> {
        self.subscriptions.get_mut(&id).and_then(|s| s.callback.take())
    }

    fn restore(&mut self, id: ListenerId, callback: Callback<C, E>) {
        // The subscription may have been removed by its own callback.
        if let Some(s) = self.subscriptions.get_mut(&id) {
            s.callback = Some(callback);
        }
    }
}

/// Implemented by the context that owns a listener table.
pub trait HasListeners<E: Event>: Sized {
    type Subscriber: Copy + Eq + fmt::Debug;

    fn listeners(&mut self) -> &mut ListenerTable<Self, E, Self::Subscriber>;
}

/// Deliver `event` to every subscription matching its emitter and signal.
///
/// The set of recipients is fixed when emission starts: subscriptions added by
/// a callback are not called for this event, and subscriptions removed by a
/// callback are skipped. Returns the number of callbacks invoked.
pub fn emit<C, E>(ctx: &mut C, event: &E) -> usize
where
    C: HasListeners<E>,
    E: Event,
{
    let ids = ctx.listeners().matching(event.emitter(), event.signal());
    let mut delivered = 0;
    for id in ids {
        let Some(mut callback) = ctx.listeners().take(id) else {
            continue;
        };
        callback(ctx, event);
        delivered += 1;
        ctx.listeners().restore(id, callback);
    }
    delivered
}
