//! Cooperative cancellation shared between a signal handler and the batch.

use crate::error::{CoreError, CoreResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Flag raised when the user asks to stop.
///
/// Cloning shares the underlying flag, so a clone can be moved into a
/// Ctrl-C handler while the batch keeps polling the original.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(CoreError::Interrupted)` once the flag is raised.
    pub fn check(&self) -> CoreResult<()> {
        if self.is_raised() {
            Err(CoreError::Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = InterruptFlag::new();
        let handler_side = flag.clone();
        assert!(flag.check().is_ok());

        handler_side.raise();
        assert!(flag.is_raised());
        assert!(matches!(flag.check(), Err(CoreError::Interrupted)));
    }
}
