//! Global transient notifications ("toasts").
//!
//! DESIGN
//! ======
//! System-level feedback fans out over a broadcast channel so any number of
//! surfaces (CLI printer, tests) can observe it. Business errors never come
//! through here; forms render those inline.

use tokio::sync::broadcast;
use tracing::{error, info, warn};

const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Cheap-to-clone handle for emitting notifications.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(Level::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Level::Error, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Level::Info, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(Level::Warning, message.into());
    }

    fn emit(&self, level: Level, message: String) {
        match level {
            Level::Error => error!(%message, "notification"),
            Level::Warning => warn!(%message, "notification"),
            Level::Success | Level::Info => info!(%message, "notification"),
        }
        // No subscribers is fine: nobody is rendering toasts right now.
        let _ = self.tx.send(Notification { level, message });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain every notification currently queued on a receiver.
#[must_use]
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(notification) => out.push(notification),
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
    out
}

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
