//! Flags shared between a session and whoever owns its connection.

use std::sync::atomic::{AtomicBool, Ordering};

/// Exit request observed by the session loop between commands.
#[derive(Debug, Default)]
pub struct SessionControl {
    exit: AtomicBool,
}

impl SessionControl {
    /// Asks the session to stop after the current command.
    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }

    /// Whether an exit was requested.
    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }
}
