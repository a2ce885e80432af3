//! Server lifecycle management.
//!
//! Shutdown is cooperative: the signal handler flips a flag and the accept
//! and ticker loops notice it on their next pass.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct ServerControl {
    shutdown_requested: AtomicBool,
}

impl ServerControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_flag() {
        let control = ServerControl::new();
        assert!(!control.should_shutdown());
        control.request_shutdown();
        assert!(control.should_shutdown());
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;

        let control = Arc::new(ServerControl::new());
        let clone = Arc::clone(&control);
        std::thread::spawn(move || clone.request_shutdown())
            .join()
            .unwrap();
        assert!(control.should_shutdown());
    }
}
