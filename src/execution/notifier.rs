use crate::execution::Notifier;

/// Writes trade notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!("📣 {}", message);
    }
}
