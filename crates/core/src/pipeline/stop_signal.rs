use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

static CTRL_HANDLER: Once = Once::new();

/// Cooperative cancellation flag shared between the loop and whoever wants
/// it to stop (Ctrl+C handler, tests).
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sets this signal on SIGINT/SIGTERM. Only the first call in a process
    /// installs the handler.
    pub fn install_ctrlc_handler(&self) {
        let flag = self.flag.clone();
        CTRL_HANDLER.call_once(move || {
            if let Err(err) = ctrlc::set_handler(move || {
                flag.store(true, Ordering::SeqCst);
            }) {
                log::warn!("Failed to install Ctrl+C handler: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_stop_requested());
        handle.request_stop();
        assert!(signal.is_stop_requested());
    }
}
