//! Production environment using system time.
//!
//! `SystemEnv` uses real monotonic time that advances naturally and tokio's
//! timer for sleeping, so behavior is wall-clock driven and not reproducible.
//! Tests use a virtual clock instead.

use std::time::Duration;

use huddle_core::Environment;

/// Production environment using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
