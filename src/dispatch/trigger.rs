//! Process-wide flags set from signal handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Externally raised request to record regardless of motion.
///
/// Setting it is idempotent. It is consumed by the next video frame the
/// classifier sees.
#[derive(Debug, Clone, Default)]
pub struct ManualTrigger {
    flag: Arc<AtomicBool>,
}

impl ManualTrigger {
    /// An unset trigger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a recording. Safe to call from a signal handler thread.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns whether the trigger was set, clearing it.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }

    /// Whether a trigger is pending.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sets the trigger whenever the process receives SIGUSR1.
    #[cfg(unix)]
    pub fn register_signal(&self) -> std::io::Result<()> {
        signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&self.flag))?;
        tracing::info!("Manual trigger armed on SIGUSR1");
        Ok(())
    }
}

/// Set once an interrupt or termination request arrives.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// A flag with no shutdown requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the loop to stop after the current frame.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown was requested.
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Requests shutdown on SIGINT and SIGTERM.
    ///
    /// Only one handler can be installed per process.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Shutdown requested");
            flag.request();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes() {
        let trigger = ManualTrigger::new();
        assert!(!trigger.take());

        trigger.set();
        trigger.set();
        assert!(trigger.is_set());
        assert!(trigger.take());
        assert!(!trigger.take());
    }

    #[test]
    fn test_clones_share_state() {
        let trigger = ManualTrigger::new();
        let remote = trigger.clone();
        remote.set();
        assert!(trigger.take());

        let shutdown = ShutdownFlag::new();
        let handle = shutdown.clone();
        assert!(!shutdown.is_requested());
        handle.request();
        assert!(shutdown.is_requested());
    }
}
