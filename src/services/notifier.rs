//! User-visible notifications

use tracing::info;

/// Fire-and-forget delivery of a user-visible message
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Delivers notifications as log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "timer_deck::alerts", "{}", message);
    }
}
