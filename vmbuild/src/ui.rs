//! User-facing reporting sink.
//!
//! Steps report progress and failures through a [`Ui`]; both calls are
//! fire-and-forget.

use parking_lot::Mutex;

pub trait Ui: Send + Sync {
    fn say(&self, message: &str);
    fn error(&self, message: &str);
}

/// Prints `==> <build>: message` lines to stdout/stderr.
///
/// Every message is mirrored to tracing so that the log file has the same
/// record as the terminal.
#[derive(Debug, Clone)]
pub struct ConsoleUi {
    build_name: String,
}

impl ConsoleUi {
    pub fn new(build_name: impl Into<String>) -> Self {
        Self {
            build_name: build_name.into(),
        }
    }

    fn line(&self, message: &str) -> String {
        format!("==> {}: {}", self.build_name, message)
    }
}

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        tracing::info!(build = %self.build_name, "{}", message);
        println!("{}", self.line(message));
    }

    fn error(&self, message: &str) {
        tracing::error!(build = %self.build_name, "{}", message);
        eprintln!("{}", self.line(message));
    }
}

/// A single captured UI message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    Say(String),
    Error(String),
}

/// Captures messages instead of printing them.
#[derive(Debug, Default)]
pub struct RecordingUi {
    messages: Mutex<Vec<UiMessage>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<UiMessage> {
        self.messages.lock().clone()
    }

    pub fn says(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                UiMessage::Say(s) => Some(s.clone()),
                UiMessage::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                UiMessage::Error(s) => Some(s.clone()),
                UiMessage::Say(_) => None,
            })
            .collect()
    }
}

impl Ui for RecordingUi {
    fn say(&self, message: &str) {
        self.messages.lock().push(UiMessage::Say(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages
            .lock()
            .push(UiMessage::Error(message.to_string()));
    }
}
