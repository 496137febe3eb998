//! Detached notification worker.
//!
//! # Responsibility
//! - Decouple notification delivery from the request path via a channel
//!   handoff consumed by one worker thread.
//!
//! # Invariants
//! - `notify` never blocks on rendering or transport work.
//! - A worker fault can never surface as a lifecycle operation fault.
//! - `shutdown` drains every event enqueued before it was called.

use crate::lifecycle::event::DomainEvent;
use crate::notify::dispatcher::NotificationDispatcher;
use log::warn;
use std::sync::mpsc;
use std::thread::{Builder, JoinHandle};

/// Handle for enqueueing events to the notification worker.
///
/// Dropping the handle closes the channel; the worker finishes whatever
/// is queued and exits on its own. Call [`Notifier::shutdown`] to wait
/// for that drain explicitly.
pub struct Notifier {
    tx: Option<mpsc::Sender<DomainEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl Notifier {
    /// Spawns the worker thread around a dispatcher.
    pub fn spawn(dispatcher: NotificationDispatcher) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<DomainEvent>();
        let worker = Builder::new()
            .name("riskdesk-notify".to_string())
            .spawn(move || {
                for event in rx {
                    dispatcher.dispatch(&event);
                }
            })?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Hands one event to the worker without waiting for delivery.
    ///
    /// Events without a resolved recipient are not forwarded; the
    /// emitting operation already logged the warning.
    pub fn notify(&self, event: DomainEvent) {
        if event.recipient.is_none() {
            return;
        }
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        if tx.send(event).is_err() {
            warn!("event=notify_enqueue module=notify status=error reason=worker_stopped");
        }
    }

    /// Closes the channel and waits for the worker to drain the queue.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("event=notify_shutdown module=notify status=error reason=worker_panicked");
            }
        }
    }
}
