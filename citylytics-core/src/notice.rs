//! User-facing warnings raised by recoverable failures.
//!
//! Clients never fail a refresh because an upstream service misbehaved; they
//! hand a [`Notice`] to the [`Notifier`] instead and carry on.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Persistent notices stay visible until replaced.
    pub persistent: bool,
}

/// Cloneable sending half. A notifier without a channel just drops notices.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<UnboundedSender<Notice>>,
}

impl Notifier {
    pub fn channel() -> (Self, UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn send(&self, level: NoticeLevel, message: impl Into<String>, persistent: bool) {
        let notice = Notice { level, message: message.into(), persistent };
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is displaying notices any more.
            let _ = tx.send(notice);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Info, message, false);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Warning, message, false);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Error, message, false);
    }

    pub fn persistent_error(&self, message: impl Into<String>) {
        self.send(NoticeLevel::Error, message, true);
    }
}
