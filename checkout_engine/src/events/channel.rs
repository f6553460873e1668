//! Simple stateless pub-sub event handler
//!
//! Checkout components publish events after their database transaction has committed. Subscribers (invoice
//! generation, customer notifications and so on) receive a copy of the event and nothing else: they have no access to
//! the engine's internal state and cannot affect the outcome of the operation that published the event.
//!
//! Handlers can be async. Each event is handled on its own task.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight handlers to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Without this, the channel would never close and the loop below would never exit.
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move {
                (handler)(ev).await;
                trace!("📬️ Event handled");
            });
            // Reap finished jobs so the set doesn't grow for the lifetime of the server
            while jobs.try_join_next().is_some() {}
        }
        debug!("📬️ All producers have gone away. Waiting for {} jobs to complete", jobs.len());
        while let Some(res) = jobs.join_next().await {
            if let Err(e) = res {
                warn!("📬️ An event handler task failed: {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Hands the event to the handler. A closed channel is logged and otherwise ignored: by the time an event is
    /// published, the state change it describes is already committed.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
