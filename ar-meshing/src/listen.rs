//! Mechanism for receiving notifications of mesh changes.
//!
//! Objects which wish to send notifications use [`Notifier`]s, which manage a collection
//! of [`Listener`]s. Each listener reports when it is no longer needed and may be
//! discarded.
//!
//! When [`Notifier::notify()`] is called to send a message, it is synchronously delivered
//! to all listeners; therefore, listeners are obligated to avoid making further
//! significant state changes. The typical pattern is for a listener to hold a [`Weak`]
//! reference to a queue of incoming messages, which will then be read and cleared by a
//! separate part of the frame loop. [`Sink`] is such a queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Ability to subscribe to a source of messages of type [`Self::Msg`].
pub trait Listen {
    /// The type of message which may be obtained from this source.
    type Msg;

    /// Subscribe the given [`Listener`] to this source of messages.
    ///
    /// Note that listeners are removed only via their returning false from
    /// [`Listener::receive()`]; there is no operation to remove a listener.
    fn listen<L: Listener<Self::Msg> + 'static>(&self, listener: L);
}

impl<T: Listen + ?Sized> Listen for &T {
    type Msg = T::Msg;

    fn listen<L: Listener<Self::Msg> + 'static>(&self, listener: L) {
        (**self).listen(listener)
    }
}

/// A receiver of messages (typically from something implementing [`Listen`]) which can
/// indicate when it is no longer interested in them (typically because the associated
/// recipient has been dropped).
///
/// Listeners must use interior mutability to store messages, and should limit it to
/// inserting into message queues or setting flags, not triggering any state changes of
/// more general interest.
pub trait Listener<M>: Send + Sync {
    /// Process and store the given series of messages.
    ///
    /// Returns `true` if the listener is still interested in further messages ("alive"),
    /// and `false` if it should be dropped because these and all future messages would
    /// have no observable effect. A call of the form `.receive(&[])` may be performed to
    /// query whether the listener is alive without delivering anything.
    fn receive(&self, messages: &[M]) -> bool;
}

impl<M, L: Listener<M> + ?Sized> Listener<M> for Box<L> {
    fn receive(&self, messages: &[M]) -> bool {
        (**self).receive(messages)
    }
}

impl<M, L: Listener<M> + ?Sized> Listener<M> for Arc<L> {
    fn receive(&self, messages: &[M]) -> bool {
        (**self).receive(messages)
    }
}

// -------------------------------------------------------------------------------------------------

/// Message broadcaster, used for change notifications.
///
/// A `Notifier<M>` delivers messages of type `M` to a dynamic set of [`Listener`]s, which
/// are added using the [`Listen`] implementation and removed when they report themselves
/// as dead.
pub struct Notifier<M> {
    listeners: Mutex<Vec<Box<dyn Listener<M>>>>,
}

impl<M> Notifier<M> {
    /// Constructs a new empty [`Notifier`].
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Deliver a message to all [`Listener`]s.
    pub fn notify(&self, message: &M) {
        self.notify_many(core::slice::from_ref(message))
    }

    /// Deliver multiple messages to all [`Listener`]s, in order.
    pub fn notify_many(&self, messages: &[M]) {
        if messages.is_empty() {
            return;
        }
        // Dead listeners are dropped as we go.
        self.lock().retain(|listener| listener.receive(messages));
    }

    /// Computes the exact count of listeners, including asking all current listeners
    /// if they are alive.
    ///
    /// This operation is intended for testing and diagnostic purposes.
    pub fn count(&self) -> usize {
        let mut listeners = self.lock();
        listeners.retain(|listener| listener.receive(&[]));
        listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<dyn Listener<M>>>> {
        // Listeners do not hold invariants across a panic, so poisoning can be ignored.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M> Listen for Notifier<M> {
    type Msg = M;

    fn listen<L: Listener<M> + 'static>(&self, listener: L) {
        if !listener.receive(&[]) {
            // skip adding it if it's already dead
            return;
        }
        let mut listeners = self.lock();
        listeners.retain(|listener| listener.receive(&[]));
        listeners.push(Box::new(listener));
    }
}

impl<M> Default for Notifier<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Notifier<M> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        // not using fmt.debug_tuple() so this is never printed on multiple lines
        if let Ok(listeners) = self.listeners.try_lock() {
            write!(fmt, "Notifier({})", listeners.len())
        } else {
            write!(fmt, "Notifier(?)")
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A [`Listener`] which discards all messages and is suitable for filling
/// listener parameters when no listener is needed.
#[allow(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NullListener;

impl<M> Listener<M> for NullListener {
    fn receive(&self, _messages: &[M]) -> bool {
        false
    }
}

// -------------------------------------------------------------------------------------------------

/// A [`Listener`] destination which stores all the messages it receives, in order,
/// until they are [drained](Self::drain).
///
/// The listeners it hands out die when the `Sink` is dropped.
pub struct Sink<M> {
    messages: Arc<Mutex<VecDeque<M>>>,
}

/// [`Sink::listener()`] implementation.
pub struct SinkListener<M> {
    weak_messages: Weak<Mutex<VecDeque<M>>>,
}

impl<M> Sink<M> {
    /// Constructs a new empty [`Sink`].
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Returns a [`Listener`] which records the messages it receives in this Sink.
    pub fn listener(&self) -> SinkListener<M> {
        SinkListener {
            weak_messages: Arc::downgrade(&self.messages),
        }
    }

    /// Remove and return all messages received so far.
    pub fn drain(&self) -> Vec<M> {
        lock_queue(&self.messages).drain(..).collect()
    }

    /// Returns whether no messages are waiting.
    pub fn is_empty(&self) -> bool {
        lock_queue(&self.messages).is_empty()
    }
}

impl<M: Clone + Send> Listener<M> for SinkListener<M> {
    fn receive(&self, messages: &[M]) -> bool {
        if let Some(cell) = self.weak_messages.upgrade() {
            lock_queue(&cell).extend(messages.iter().cloned());
            true
        } else {
            false
        }
    }
}

fn lock_queue<M>(queue: &Mutex<VecDeque<M>>) -> MutexGuard<'_, VecDeque<M>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<M> Default for Sink<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: fmt::Debug> fmt::Debug for Sink<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sink")
            .field(&*lock_queue(&self.messages))
            .finish()
    }
}

impl<M> fmt::Debug for SinkListener<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkListener")
            .field("alive(shallow)", &(self.weak_messages.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

impl<M> Clone for SinkListener<M> {
    fn clone(&self) -> Self {
        Self {
            weak_messages: self.weak_messages.clone(),
        }
    }
}
