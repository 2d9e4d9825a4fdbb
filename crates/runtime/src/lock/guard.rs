//! Scoped module-lock guards.

use super::ModuleLock;

/// Result of [`ModuleLock::lock`].
///
/// `Owned` releases the lock when dropped. `Borrowed` is handed out when a
/// module of the same group already holds the lock; it never acquired the
/// lock, so dropping it does nothing.
#[derive(Debug)]
#[must_use = "the module lock is released (or the borrow ends) when the guard is dropped"]
pub enum ModuleGuard {
    Owned(OwnedLease),
    Borrowed { module: String, holder: String },
}

impl ModuleGuard {
    pub fn module(&self) -> &str {
        match self {
            Self::Owned(lease) => &lease.module,
            Self::Borrowed { module, .. } => module,
        }
    }

    /// True if this scope reuses a lock held by a same-group module.
    pub fn is_reused(&self) -> bool {
        matches!(self, Self::Borrowed { .. })
    }
}

/// Ownership of one acquisition of the module lock; released on drop.
///
/// If the lock was force-released meanwhile, dropping the lease does nothing,
/// even when the same module has since acquired the lock again.
#[derive(Debug)]
pub struct OwnedLease {
    lock: ModuleLock,
    module: String,
    lease: u64,
}

impl OwnedLease {
    pub(super) fn new(lock: ModuleLock, module: String, lease: u64) -> Self {
        Self {
            lock,
            module,
            lease,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }
}

impl Drop for OwnedLease {
    fn drop(&mut self) {
        self.lock.release_lease(&self.module, self.lease);
    }
}
