//! Publish side of live updates.
//!
//! REST handlers write a record, then publish a [`crate::RealtimeMessage`]
//! describing it. The API's relay thread is the only long-lived subscriber;
//! it hands every message to the SSE hub. A message that is lost here only
//! costs clients freshness until their next REST load.

use std::sync::mpsc::{Receiver, RecvError, TryRecvError};

/// Receiving end handed out by [`EventBus::subscribe`]. Sees every message
/// published after it was created.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Blocks. `Err` once the bus has been dropped and drained.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Fan-out bus. Publish order is delivery order; nothing is persisted.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}
