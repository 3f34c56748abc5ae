use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use crate::errors::{Result, WriterError};

/// Process-level single-writer lock.
///
/// Every mutating operation holds the guard for its whole transaction; a
/// second writer fails fast with `BusyWriter` instead of queueing, so callers
/// decide whether to retry.
pub struct WriterLock {
    inner: Mutex<()>,
}

impl WriterLock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    pub fn acquire(&self, op: &str) -> Result<WriterGuard<'_>> {
        match self.inner.try_lock() {
            Ok(guard) => Ok(WriterGuard { _guard: guard }),
            Err(TryLockError::WouldBlock) => Err(WriterError::Busy(op.to_string()).into()),
            // A previous writer panicked mid-operation; its transaction rolled
            // back, so the protected state is consistent and the lock is reusable.
            Err(TryLockError::Poisoned(poisoned)) => Ok(WriterGuard {
                _guard: poisoned.into_inner(),
            }),
        }
    }
}

impl Default for WriterLock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WriterGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Cooperative cancellation signal for long-running operations.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation + deadline budget for one mutating run.
///
/// `checkpoint` is called between units of work (never inside one), so an
/// abort can only be observed at a point where rolling back leaves no
/// partial state.
pub struct RunBudget {
    op: String,
    cancel: CancelFlag,
    deadline: Instant,
}

impl RunBudget {
    pub fn new(op: impl Into<String>, cancel: CancelFlag, timeout: Duration) -> Self {
        Self {
            op: op.into(),
            cancel,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(WriterError::Cancelled(self.op.clone()).into());
        }
        if Instant::now() >= self.deadline {
            return Err(WriterError::TimedOut(self.op.clone()).into());
        }
        Ok(())
    }
}
