use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

/// A user-visible message, the console's toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Cloneable sending side shared by every view.
///
/// Sending never fails from the caller's point of view: if nobody listens the
/// message is only logged.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: UnboundedSender<Notification>,
}

impl Notifier {
    pub fn channel() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(%message, "notify");
        self.push(Level::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(%message, "notify");
        self.push(Level::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "notify");
        self.push(Level::Error, message);
    }

    fn push(&self, level: Level, message: String) {
        let _ = self.tx.send(Notification { level, message });
    }
}

/// Everything queued so far, without waiting.
pub fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}
